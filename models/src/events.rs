// models/src/events.rs

use serde::{Deserialize, Serialize};

use crate::medical::{Action, Patient, Visit};

/// Push message sent to every connected dashboard session.
///
/// Serialized as `{"type": "NEW_ACTION", "action": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    NewPatient { patient: Patient },
    NewAction { action: Action },
    UpdateVisit { visit: Visit },
    UpdateAction { action: Action },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::NewPatient { .. } => "NEW_PATIENT",
            Event::NewAction { .. } => "NEW_ACTION",
            Event::UpdateVisit { .. } => "UPDATE_VISIT",
            Event::UpdateAction { .. } => "UPDATE_ACTION",
        }
    }
}
