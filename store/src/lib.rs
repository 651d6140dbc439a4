use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use codesearch_core::{ProjectStore, StoreError};
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(default)]
    project: Option<String>,
}

/// `<config dir>/codesearch/state.json`, or `./.codesearch/state.json` when
/// the platform has no config dir.
pub fn default_state_path() -> PathBuf {
    match dirs::config_dir() {
        Some(mut dir) => {
            dir.push("codesearch");
            dir.push("state.json");
            dir
        }
        None => PathBuf::from(".codesearch").join("state.json"),
    }
}

/// Keeps the last chosen project in a small JSON file.
///
/// Reads take a shared lock and writes an exclusive one, so two clients
/// sharing the file never see a half-written state.
#[derive(Debug, Clone)]
pub struct FileProjectStore {
    path: PathBuf,
}

impl FileProjectStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn at_default_location() -> Self {
        Self::new(default_state_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProjectStore for FileProjectStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no state file at {}", self.path.display());
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let lock = RwLock::new(file);
        let guard = lock.read()?;
        let mut reader: &File = &guard;
        let mut contents = String::new();
        reader.read_to_string(&mut contents)?;

        if contents.trim().is_empty() {
            return Ok(None);
        }
        let state: StateFile = serde_json::from_str(&contents)?;
        Ok(state.project.filter(|name| !name.is_empty()))
    }

    fn save(&self, project: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&self.path)?;
        let mut lock = RwLock::new(file);
        let mut guard = lock.write()?;

        // truncate only once the lock is held
        guard.set_len(0)?;
        guard.seek(SeekFrom::Start(0))?;
        let state = StateFile {
            project: Some(project.to_string()),
        };
        serde_json::to_writer_pretty(&mut *guard, &state)?;
        guard.write_all(b"\n")?;
        guard.flush()?;

        debug!("saved project {} to {}", project, self.path.display());
        Ok(())
    }
}
