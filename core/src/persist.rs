use std::sync::Mutex;

use crate::error::StoreError;

/// Where the last chosen project identifier survives restarts.
pub trait ProjectStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, StoreError>;

    fn save(&self, project: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryProjectStore {
    project: Mutex<Option<String>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(project: &str) -> Self {
        Self {
            project: Mutex::new(Some(project.to_string())),
        }
    }
}

impl ProjectStore for MemoryProjectStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .project
            .lock()
            .map(|project| project.clone())
            .unwrap_or_default())
    }

    fn save(&self, project: &str) -> Result<(), StoreError> {
        if let Ok(mut slot) = self.project.lock() {
            *slot = Some(project.to_string());
        }
        Ok(())
    }
}
