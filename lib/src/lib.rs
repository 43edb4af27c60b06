// lib/src/lib.rs
//! Core of MediConnect: persistence, registries, the action router and the
//! realtime notifier.

pub mod encounters;
pub mod identity;
mod lookup;
pub mod notifier;
pub mod patients;
pub mod router;
pub mod seed;
pub mod service;
pub mod stats;
pub mod storage_engine;

pub use encounters::EncounterLedger;
pub use identity::IdentityRegistry;
pub use notifier::Notifier;
pub use patients::PatientRegistry;
pub use router::{routed_types, ActionRouter};
pub use service::MediConnect;
pub use stats::StatsAggregator;
pub use storage_engine::{ClinicalStorageEngine, SledClinicalStorage};
