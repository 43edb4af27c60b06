// models/src/medical/patient.rs

use serde::{Deserialize, Serialize};

use super::EntityId;
use crate::errors::{require_text, ValidationResult};

/// A globally registered patient. `unique_id` is the join key across
/// organizations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: EntityId,
    pub unique_id: String,
    pub name: String,
    pub dob: String,
    pub gender: String,
    pub contact: Option<String>,
    pub blood_group: Option<String>,
}

impl Patient {
    /// Exact match on the unique id, otherwise a case-insensitive substring
    /// of the unique id or the name.
    pub fn matches(&self, query: &str) -> bool {
        if self.unique_id == query {
            return true;
        }
        let needle = query.to_lowercase();
        self.unique_id.to_lowercase().contains(&needle) || self.name.to_lowercase().contains(&needle)
    }
}

/// Demographics supplied on registration and on full replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub name: String,
    pub dob: String,
    pub gender: String,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub blood_group: Option<String>,
}

impl NewPatient {
    pub fn validate(&self) -> ValidationResult<()> {
        require_text("name", &self.name)?;
        require_text("dob", &self.dob)?;
        require_text("gender", &self.gender)
    }
}
