// lib/src/lookup.rs
//! Memoized name resolution for read models.

use std::collections::HashMap;

use models::errors::ClinicalResult;
use models::medical::{EntityId, Patient};

use crate::storage_engine::ClinicalStorageEngine;

/// Resolves ids to display names, hitting storage at most once per id.
pub(crate) struct NameLookup<'a> {
    storage: &'a dyn ClinicalStorageEngine,
    organizations: HashMap<EntityId, Option<String>>,
    staff: HashMap<EntityId, Option<String>>,
    patients: HashMap<EntityId, Option<Patient>>,
}

impl<'a> NameLookup<'a> {
    pub(crate) fn new(storage: &'a dyn ClinicalStorageEngine) -> Self {
        NameLookup {
            storage,
            organizations: HashMap::new(),
            staff: HashMap::new(),
            patients: HashMap::new(),
        }
    }

    pub(crate) async fn organization_name(&mut self, id: EntityId) -> ClinicalResult<Option<String>> {
        if let Some(name) = self.organizations.get(&id) {
            return Ok(name.clone());
        }
        let name = self.storage.get_organization(id).await?.map(|org| org.name);
        self.organizations.insert(id, name.clone());
        Ok(name)
    }

    pub(crate) async fn staff_name(&mut self, id: EntityId) -> ClinicalResult<Option<String>> {
        if let Some(name) = self.staff.get(&id) {
            return Ok(name.clone());
        }
        let name = self.storage.get_staff(id).await?.map(|staff| staff.name);
        self.staff.insert(id, name.clone());
        Ok(name)
    }

    pub(crate) async fn patient(&mut self, id: EntityId) -> ClinicalResult<Option<Patient>> {
        if let Some(patient) = self.patients.get(&id) {
            return Ok(patient.clone());
        }
        let patient = self.storage.get_patient(id).await?;
        self.patients.insert(id, patient.clone());
        Ok(patient)
    }
}
