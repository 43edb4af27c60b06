// models/src/errors.rs

pub use thiserror::Error;

use crate::medical::{ActionStatus, EntityId};

#[derive(Debug, Error)]
pub enum ClinicalError {
    #[error("{entity} with id {id} was not found")]
    NotFound { entity: &'static str, id: EntityId },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    // Both login failures stay deliberately vague.
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid organization code")]
    InvalidOrganization,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Action cannot move from {from} to {to}")]
    InvalidTransition { from: ActionStatus, to: ActionStatus },
    #[error("Operation failed: {0}")]
    OperationFailed(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Credential error: {0}")]
    Credential(String),
}

impl ClinicalError {
    pub fn not_found(entity: &'static str, id: EntityId) -> Self {
        ClinicalError::NotFound { entity, id }
    }

    /// True for failures that originate below the domain (storage, codecs).
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            ClinicalError::OperationFailed(_)
                | ClinicalError::Storage(_)
                | ClinicalError::Serialization(_)
                | ClinicalError::Credential(_)
        )
    }
}

impl From<serde_json::Error> for ClinicalError {
    fn from(err: serde_json::Error) -> Self {
        ClinicalError::Serialization(format!("JSON document error: {}", err))
    }
}

#[cfg(feature = "sled-errors")]
impl From<sled::Error> for ClinicalError {
    fn from(err: sled::Error) -> Self {
        ClinicalError::Storage(err.to_string())
    }
}

#[cfg(feature = "bincode-errors")]
impl From<bincode::error::EncodeError> for ClinicalError {
    fn from(err: bincode::error::EncodeError) -> Self {
        ClinicalError::Serialization(format!("Row encode error: {}", err))
    }
}

#[cfg(feature = "bincode-errors")]
impl From<bincode::error::DecodeError> for ClinicalError {
    fn from(err: bincode::error::DecodeError) -> Self {
        ClinicalError::Serialization(format!("Row decode error: {}", err))
    }
}

/// A validation error.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A partial update carried no fields at all.
    #[error("no fields provided for update")]
    NoFieldsProvided,
    /// A required text field was blank.
    #[error("field '{0}' must not be empty")]
    EmptyField(&'static str),
    /// A completed action must name who completed it.
    #[error("completedBy is required when completing an action")]
    MissingCompleter,
    /// A value outside a fixed vocabulary.
    #[error("unknown value '{value}' for {field}")]
    UnknownValue { field: &'static str, value: String },
    /// The referenced visit belongs to another patient.
    #[error("visit {visit_id} does not belong to patient {patient_id}")]
    VisitPatientMismatch { visit_id: EntityId, patient_id: EntityId },
}

/// A type alias for a `Result` that returns a `ClinicalError` on failure.
pub type ClinicalResult<T> = Result<T, ClinicalError>;

/// A type alias for a `Result` that returns a `ValidationError` on failure.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Rejects blank text fields.
pub fn require_text(field: &'static str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        Err(ValidationError::EmptyField(field))
    } else {
        Ok(())
    }
}
