//! Project metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level project metadata (`project.json`).
///
/// The export engine only uses this for session context in logs and for
/// locating per-project media storage; editing state lives elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMeta {
    /// Schema version.
    pub version: String,

    /// Unique project identifier.
    pub id: String,

    /// Human-readable project name.
    pub name: String,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last modified timestamp.
    pub modified_at: DateTime<Utc>,
}

impl ProjectMeta {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            version: "1.0".to_string(),
            id: id.into(),
            name: name.into(),
            created_at: now,
            modified_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_meta_roundtrip() {
        let meta = ProjectMeta::new("p1", "Launch video");
        let json = serde_json::to_string(&meta).unwrap();
        let parsed: ProjectMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, "p1");
        assert_eq!(parsed.name, "Launch video");
        assert_eq!(parsed.created_at, meta.created_at);
    }
}
