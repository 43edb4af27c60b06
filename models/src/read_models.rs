// models/src/read_models.rs
//! Joined views for dashboards. These are assembled on read and never stored.

use serde::{Deserialize, Serialize};

use crate::medical::{Action, EntityId, Visit};

pub const UNKNOWN: &str = "Unknown";

/// An action as it appears in a department queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    #[serde(flatten)]
    pub action: Action,
    pub patient_name: String,
    pub unique_id: String,
    pub author_name: String,
    pub org_name: String,
}

/// An action on a patient's chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSummary {
    #[serde(flatten)]
    pub action: Action,
    pub author_name: String,
    pub org_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitSummary {
    pub visit: Visit,
    pub org_name: Option<String>,
    pub staff_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDetails {
    pub visits: Vec<VisitSummary>,
    pub actions: Vec<ActionSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRef {
    pub id: EntityId,
    pub name: String,
    pub unique_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyEntry {
    pub visit: Visit,
    pub patient: PatientRef,
    /// Name of the attending staff member, if one is assigned.
    pub attended_by: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_patients: u64,
    pub total_visits: u64,
    pub pending_actions: u64,
    pub completed_actions: u64,
}
