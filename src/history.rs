//! Provenance records kept beside each map

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::raster::Session;

/// How and by whom a map was made
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub map: String,
    pub mapset: String,
    pub map_type: String,
    pub creator: String,
    pub created: DateTime<Utc>,
    pub title: String,
    #[serde(default)]
    pub data_source: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Command lines that produced the map, oldest first
    #[serde(default)]
    pub commands: Vec<String>,
}

impl History {
    /// Starts a record for `name` stamped with the current user and time
    pub fn short(session: &Session, name: &str, map_type: &str) -> Self {
        Self {
            map: name.to_string(),
            mapset: session.mapset_name(),
            map_type: map_type.to_string(),
            creator: creator(),
            created: Utc::now(),
            title: name.to_string(),
            data_source: Vec::new(),
            description: None,
            commands: Vec::new(),
        }
    }

    /// Records the command line that produced the map
    pub fn command(&mut self, command_line: &str) {
        self.commands.push(command_line.to_string());
    }

    pub fn add_data_source(&mut self, source: &str) {
        self.data_source.push(source.to_string());
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = Some(description.to_string());
    }
}

fn creator() -> String {
    ["USER", "USERNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_short_history() {
        let dir = tempdir().unwrap();
        let session = Session::open(dir.path()).unwrap();

        let mut history = History::short(&session, "doubled", "raster");
        history.command("raster-twice input=a output=doubled");
        history.add_data_source("raster map <a>");

        assert_eq!(history.map, "doubled");
        assert_eq!(history.title, "doubled");
        assert_eq!(history.map_type, "raster");
        assert!(!history.creator.is_empty());
        assert_eq!(history.commands, vec!["raster-twice input=a output=doubled"]);
        assert_eq!(
            history.mapset,
            dir.path().canonicalize().unwrap().file_name().unwrap().to_string_lossy()
        );
    }

    #[test]
    fn test_missing_optional_fields() {
        let json = r#"{
            "map": "m",
            "mapset": "PERMANENT",
            "map_type": "raster",
            "creator": "someone",
            "created": "2024-05-01T12:00:00Z",
            "title": "m"
        }"#;

        let history: History = serde_json::from_str(json).unwrap();
        assert!(history.commands.is_empty());
        assert!(history.data_source.is_empty());
        assert_eq!(history.description, None);
    }
}
