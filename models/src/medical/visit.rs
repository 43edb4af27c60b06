// models/src/medical/visit.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{vocabulary, EntityId};
use crate::errors::{ValidationError, ValidationResult};

/// Free-form vital signs, e.g. `{"bp": "120/80", "pulse": 72}`.
pub type Vitals = Map<String, Value>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Normal,
    Emergency,
    Critical,
}

vocabulary!(Priority, "priority", {
    Normal => "normal",
    Emergency => "emergency",
    Critical => "critical",
});

impl Priority {
    pub fn is_urgent(&self) -> bool {
        matches!(self, Priority::Emergency | Priority::Critical)
    }
}

/// One patient attendance at one organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub id: EntityId,
    pub patient_id: EntityId,
    pub organization_id: EntityId,
    pub date: DateTime<Utc>,
    pub vitals: Option<Vitals>,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub priority: Priority,
    pub attended_by: Option<EntityId>,
}

impl Visit {
    /// Applies only the fields present in `patch`.
    pub fn apply_patch(&mut self, patch: &VisitPatch) {
        if let Some(diagnosis) = &patch.diagnosis {
            self.diagnosis = Some(diagnosis.clone());
        }
        if let Some(symptoms) = &patch.symptoms {
            self.symptoms = Some(symptoms.clone());
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVisit {
    pub patient_id: EntityId,
    pub organization_id: EntityId,
    #[serde(default)]
    pub vitals: Option<Vitals>,
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub attended_by: Option<EntityId>,
}

/// Partial update: an omitted field is left unchanged, never nulled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitPatch {
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

impl VisitPatch {
    pub fn is_empty(&self) -> bool {
        self.diagnosis.is_none() && self.symptoms.is_none() && self.priority.is_none()
    }

    pub fn ensure_not_empty(&self) -> ValidationResult<()> {
        if self.is_empty() {
            Err(ValidationError::NoFieldsProvided)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visit() -> Visit {
        Visit {
            id: 1,
            patient_id: 1,
            organization_id: 1,
            date: Utc::now(),
            vitals: None,
            symptoms: Some("cough".into()),
            diagnosis: None,
            priority: Priority::Normal,
            attended_by: None,
        }
    }

    #[test]
    fn should_leave_omitted_fields_unchanged() {
        let mut v = visit();
        v.apply_patch(&VisitPatch { diagnosis: Some("bronchitis".into()), ..Default::default() });
        assert_eq!(v.diagnosis.as_deref(), Some("bronchitis"));
        assert_eq!(v.symptoms.as_deref(), Some("cough"));
        assert_eq!(v.priority, Priority::Normal);
    }

    #[test]
    fn should_reject_empty_patch() {
        let patch: VisitPatch = serde_json::from_str("{}").unwrap();
        assert_eq!(patch.ensure_not_empty(), Err(ValidationError::NoFieldsProvided));
    }

    #[test]
    fn should_flag_urgent_priorities() {
        assert!(!Priority::Normal.is_urgent());
        assert!(Priority::Emergency.is_urgent());
        assert!(Priority::Critical.is_urgent());
    }
}
