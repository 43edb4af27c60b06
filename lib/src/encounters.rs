// lib/src/encounters.rs

use std::sync::Arc;

use models::errors::{ClinicalError, ClinicalResult};
use models::events::Event;
use models::medical::{EntityId, NewVisit, Visit, VisitPatch};
use models::read_models::{EmergencyEntry, PatientRef};
use tracing::{debug, warn};

use crate::lookup::NameLookup;
use crate::notifier::Notifier;
use crate::storage_engine::ClinicalStorageEngine;

/// Clinical visits.
#[derive(Clone)]
pub struct EncounterLedger {
    storage: Arc<dyn ClinicalStorageEngine>,
    notifier: Notifier,
}

impl EncounterLedger {
    pub fn new(storage: Arc<dyn ClinicalStorageEngine>, notifier: Notifier) -> Self {
        EncounterLedger { storage, notifier }
    }

    pub async fn create_visit(&self, visit: NewVisit) -> ClinicalResult<Visit> {
        self.storage.insert_visit(visit).await
    }

    pub async fn get_visit(&self, id: EntityId) -> ClinicalResult<Visit> {
        self.storage.get_visit(id).await?.ok_or_else(|| ClinicalError::not_found("visit", id))
    }

    /// Applies the fields present in `patch`. An empty patch is rejected
    /// before storage is touched.
    pub async fn update_visit(&self, id: EntityId, patch: VisitPatch) -> ClinicalResult<Visit> {
        patch.ensure_not_empty()?;
        let visit = self
            .storage
            .modify_visit(id, &|mut visit: Visit| -> ClinicalResult<Visit> {
                visit.apply_patch(&patch);
                Ok(visit)
            })
            .await?;
        debug!(visit_id = id, "Visit updated");
        self.notifier.broadcast(Event::UpdateVisit { visit: visit.clone() }).await;
        Ok(visit)
    }

    pub async fn assign_attendant(&self, id: EntityId, staff_id: EntityId) -> ClinicalResult<Visit> {
        if self.storage.get_staff(staff_id).await?.is_none() {
            return Err(ClinicalError::not_found("staff", staff_id));
        }
        let visit = self
            .storage
            .modify_visit(id, &|mut visit: Visit| -> ClinicalResult<Visit> {
                visit.attended_by = Some(staff_id);
                Ok(visit)
            })
            .await?;
        self.notifier.broadcast(Event::UpdateVisit { visit: visit.clone() }).await;
        Ok(visit)
    }

    /// Emergency and critical visits, newest first, with patient identity and
    /// attending staff name.
    pub async fn list_active_emergencies(&self) -> ClinicalResult<Vec<EmergencyEntry>> {
        let mut names = NameLookup::new(self.storage.as_ref());
        let mut entries = Vec::new();
        for visit in self.storage.list_visits().await? {
            if !visit.priority.is_urgent() {
                continue;
            }
            let Some(patient) = names.patient(visit.patient_id).await? else {
                warn!(visit_id = visit.id, patient_id = visit.patient_id, "Emergency visit without patient");
                continue;
            };
            let attended_by = match visit.attended_by {
                Some(staff_id) => names.staff_name(staff_id).await?,
                None => None,
            };
            entries.push(EmergencyEntry {
                patient: PatientRef {
                    id: patient.id,
                    name: patient.name,
                    unique_id: patient.unique_id,
                },
                visit,
                attended_by,
            });
        }
        Ok(entries)
    }
}
