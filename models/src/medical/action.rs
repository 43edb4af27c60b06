// models/src/medical/action.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{vocabulary, EntityId};
use crate::errors::{require_text, ValidationError, ValidationResult};

pub const TRANSFER_DESCRIPTION: &str = "Patient Transfer Request";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Prescription,
    LabTest,
    Radiology,
    Procedure,
    Observation,
    Transfer,
}

vocabulary!(ActionType, "action type", {
    Prescription => "prescription",
    LabTest => "lab_test",
    Radiology => "radiology",
    Procedure => "procedure",
    Observation => "observation",
    Transfer => "transfer",
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

vocabulary!(ActionStatus, "status", {
    Pending => "pending",
    InProgress => "in_progress",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl ActionStatus {
    /// Edges of the lifecycle graph. Re-asserting a non-terminal status is
    /// allowed so notes can be edited in place.
    pub fn can_transition_to(&self, next: ActionStatus) -> bool {
        use ActionStatus::*;
        match (self, next) {
            (Pending, Pending) | (InProgress, InProgress) => true,
            (Pending, InProgress) | (Pending, Cancelled) => true,
            (InProgress, Completed) | (InProgress, Cancelled) => true,
            _ => false,
        }
    }
}

/// Whether the router checks status updates against the lifecycle graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    #[default]
    Strict,
    /// Accepts any target status, including leaving a terminal state.
    Permissive,
}

vocabulary!(TransitionPolicy, "transition policy", {
    Strict => "strict",
    Permissive => "permissive",
});

// Read through a plain string so YAML scalars like `strict` parse.
impl<'de> Deserialize<'de> for TransitionPolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl TransitionPolicy {
    pub fn permits(&self, from: ActionStatus, to: ActionStatus) -> bool {
        match self {
            TransitionPolicy::Strict => from.can_transition_to(to),
            TransitionPolicy::Permissive => true,
        }
    }
}

/// A clinical order or transfer request.
///
/// `completed_at`, `completed_by` and `completed_by_organization_id` are set
/// exactly when `status` is `Completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: EntityId,
    pub patient_id: EntityId,
    pub visit_id: Option<EntityId>,
    pub author_id: EntityId,
    pub from_organization_id: EntityId,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub status: ActionStatus,
    pub description: String,
    pub payload: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by: Option<EntityId>,
    pub completed_by_organization_id: Option<EntityId>,
    pub notes: Option<String>,
}

impl Action {
    /// Stamps a status change. Completion fields follow the status; omitted
    /// notes are kept.
    pub fn apply_update(&mut self, update: &ActionUpdate, now: DateTime<Utc>) {
        self.status = update.status;
        self.updated_at = now;
        if let Some(notes) = &update.notes {
            self.notes = Some(notes.clone());
        }
        if update.status == ActionStatus::Completed {
            self.completed_at = Some(now);
            self.completed_by = update.completed_by;
            self.completed_by_organization_id = update.completed_by_organization_id;
        } else {
            self.completed_at = None;
            self.completed_by = None;
            self.completed_by_organization_id = None;
        }
    }

    /// Destination organization of a transfer, read from the payload.
    pub fn target_org_id(&self) -> Option<EntityId> {
        if self.action_type != ActionType::Transfer {
            return None;
        }
        self.payload.as_ref()?.get("targetOrgId")?.as_u64()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAction {
    pub patient_id: EntityId,
    #[serde(default)]
    pub visit_id: Option<EntityId>,
    pub author_id: EntityId,
    pub from_organization_id: EntityId,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub description: String,
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewAction {
    pub fn validate(&self) -> ValidationResult<()> {
        require_text("description", &self.description)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionUpdate {
    pub status: ActionStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub completed_by: Option<EntityId>,
    #[serde(default)]
    pub completed_by_organization_id: Option<EntityId>,
}

impl ActionUpdate {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.status == ActionStatus::Completed && self.completed_by.is_none() {
            return Err(ValidationError::MissingCompleter);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransfer {
    pub patient_id: EntityId,
    pub target_org_id: EntityId,
    pub from_org_id: EntityId,
    pub author_id: EntityId,
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<NewTransfer> for NewAction {
    fn from(transfer: NewTransfer) -> Self {
        NewAction {
            patient_id: transfer.patient_id,
            visit_id: None,
            author_id: transfer.author_id,
            from_organization_id: transfer.from_org_id,
            action_type: ActionType::Transfer,
            description: TRANSFER_DESCRIPTION.to_string(),
            payload: Some(json!({ "targetOrgId": transfer.target_org_id })),
            notes: transfer.notes,
        }
    }
}
