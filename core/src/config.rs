use serde::{Deserialize, Serialize};

/// Queries shorter than this (in characters) never hit the backend.
pub const DEFAULT_MIN_QUERY_CHARS: usize = 3;
pub const DEFAULT_CONTEXT_LINES: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub min_query_chars: usize,
    pub context_before: usize,
    pub context_after: usize,
    /// Re-issue the active query against the new project after a switch.
    pub rerun_query_on_project_change: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_query_chars: DEFAULT_MIN_QUERY_CHARS,
            context_before: DEFAULT_CONTEXT_LINES,
            context_after: DEFAULT_CONTEXT_LINES,
            rerun_query_on_project_change: true,
        }
    }
}

impl SessionConfig {
    pub fn accepts_query(&self, query: &str) -> bool {
        query.chars().count() >= self.min_query_chars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_queries_are_rejected_by_character_count() {
        let config = SessionConfig::default();
        assert!(!config.accepts_query(""));
        assert!(!config.accepts_query("ab"));
        assert!(config.accepts_query("abc"));
        // two multi-byte characters are still two characters
        assert!(!config.accepts_query("日本"));
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: SessionConfig = serde_json::from_str(r#"{"min_query_chars": 4}"#).unwrap();
        assert_eq!(config.min_query_chars, 4);
        assert_eq!(config.context_before, DEFAULT_CONTEXT_LINES);
        assert!(config.rerun_query_on_project_change);
    }
}
