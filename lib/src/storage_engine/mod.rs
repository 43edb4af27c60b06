// lib/src/storage_engine/mod.rs

pub mod rows;
pub mod sled_storage;
pub mod storage_engine;
pub mod storage_utils;

pub use sled_storage::SledClinicalStorage;
pub use storage_engine::{
    ActionChange, CascadeSummary, ClinicalStorageEngine, OrganizationDraft, StaffCredentials, StaffDraft,
    VisitChange,
};

use std::path::Path;
use std::sync::Arc;

use models::errors::ClinicalResult;

/// Opens the sled-backed store at `path` behind the storage trait.
pub fn open_storage<P: AsRef<Path>>(path: P) -> ClinicalResult<Arc<dyn ClinicalStorageEngine>> {
    Ok(Arc::new(SledClinicalStorage::open(path)?))
}
