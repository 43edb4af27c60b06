// models/src/lib.rs
//! Shared entity types for the MediConnect workspace.

pub mod errors;
pub mod events;
pub mod medical;
pub mod read_models;

pub use errors::{ClinicalError, ClinicalResult, ValidationError};
pub use events::Event;
pub use medical::*;
pub use read_models::*;
