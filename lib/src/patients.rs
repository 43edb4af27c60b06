// lib/src/patients.rs

use std::sync::Arc;

use models::errors::{ClinicalError, ClinicalResult};
use models::events::Event;
use models::medical::{EntityId, NewPatient, Patient};
use models::read_models::{ActionSummary, PatientDetails, VisitSummary, UNKNOWN};
use tracing::info;

use crate::lookup::NameLookup;
use crate::notifier::Notifier;
use crate::storage_engine::{CascadeSummary, ClinicalStorageEngine};

/// Global patient records, shared by every organization.
#[derive(Clone)]
pub struct PatientRegistry {
    storage: Arc<dyn ClinicalStorageEngine>,
    notifier: Notifier,
}

impl PatientRegistry {
    pub fn new(storage: Arc<dyn ClinicalStorageEngine>, notifier: Notifier) -> Self {
        PatientRegistry { storage, notifier }
    }

    /// Registers a patient under a freshly generated unique id.
    pub async fn create(&self, patient: NewPatient) -> ClinicalResult<Patient> {
        patient.validate()?;
        let patient = self.storage.insert_patient(patient, None).await?;
        self.notifier.broadcast(Event::NewPatient { patient: patient.clone() }).await;
        Ok(patient)
    }

    pub async fn search(&self, query: &str) -> ClinicalResult<Vec<Patient>> {
        let mut patients = self.storage.list_patients().await?;
        patients.retain(|patient| patient.matches(query));
        Ok(patients)
    }

    pub async fn get(&self, id: EntityId) -> ClinicalResult<Patient> {
        self.storage.get_patient(id).await?.ok_or_else(|| ClinicalError::not_found("patient", id))
    }

    pub async fn list(&self) -> ClinicalResult<Vec<Patient>> {
        self.storage.list_patients().await
    }

    /// Replaces demographics. The unique id is kept.
    pub async fn update(&self, id: EntityId, patient: NewPatient) -> ClinicalResult<Patient> {
        patient.validate()?;
        self.storage.replace_patient(id, patient).await
    }

    /// Removes the patient together with all of their visits and actions.
    pub async fn delete(&self, id: EntityId) -> ClinicalResult<CascadeSummary> {
        let summary = self.storage.delete_patient(id).await?;
        info!(patient_id = id, "Patient record removed");
        Ok(summary)
    }

    /// The patient's chart: visits and actions across all organizations,
    /// newest first, with display names resolved.
    pub async fn details(&self, id: EntityId) -> ClinicalResult<PatientDetails> {
        self.get(id).await?;
        let mut names = NameLookup::new(self.storage.as_ref());

        let mut visits = Vec::new();
        for visit in self.storage.list_visits().await? {
            if visit.patient_id != id {
                continue;
            }
            let org_name = names.organization_name(visit.organization_id).await?;
            let staff_name = match visit.attended_by {
                Some(staff_id) => names.staff_name(staff_id).await?,
                None => None,
            };
            visits.push(VisitSummary { visit, org_name, staff_name });
        }

        let mut actions = Vec::new();
        for action in self.storage.list_actions().await? {
            if action.patient_id != id {
                continue;
            }
            let author_name = names.staff_name(action.author_id).await?.unwrap_or_else(|| UNKNOWN.to_string());
            let org_name = names
                .organization_name(action.from_organization_id)
                .await?
                .unwrap_or_else(|| UNKNOWN.to_string());
            actions.push(ActionSummary { action, author_name, org_name });
        }

        Ok(PatientDetails { visits, actions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_engine::{OrganizationDraft, SledClinicalStorage, StaffDraft};
    use models::errors::ValidationError;
    use models::medical::{ActionType, NewAction, NewVisit, OrganizationType, Priority, StaffRole};

    async fn fixture() -> (PatientRegistry, Arc<dyn ClinicalStorageEngine>, Notifier) {
        let storage: Arc<dyn ClinicalStorageEngine> = Arc::new(SledClinicalStorage::open_temporary().unwrap());
        storage
            .insert_organization(
                OrganizationDraft {
                    name: "City General Hospital".into(),
                    org_type: OrganizationType::Hospital,
                    code: "CITY".into(),
                    address: None,
                },
                Some(StaffDraft {
                    organization_id: 0,
                    employee_id: "DOC001".into(),
                    name: "Dr. Sarah Wilson".into(),
                    role: StaffRole::Doctor,
                    password_hash: "x".into(),
                }),
            )
            .await
            .unwrap();
        let notifier = Notifier::new(16);
        (PatientRegistry::new(storage.clone(), notifier.clone()), storage, notifier)
    }

    fn person(name: &str) -> NewPatient {
        NewPatient {
            name: name.into(),
            dob: "1992-11-20".into(),
            gender: "Female".into(),
            contact: Some("+1555987654".into()),
            blood_group: Some("A-".into()),
        }
    }

    #[tokio::test]
    async fn should_broadcast_new_patient() {
        let (patients, _, notifier) = fixture().await;
        let (_, mut events) = notifier.connect().await;
        let created = patients.create(person("Emily Davis")).await.unwrap();
        assert_eq!(events.recv().await, Some(Event::NewPatient { patient: created }));
    }

    #[tokio::test]
    async fn should_reject_blank_name() {
        let (patients, _, _) = fixture().await;
        let err = patients.create(person("  ")).await.unwrap_err();
        assert!(matches!(err, ClinicalError::Validation(ValidationError::EmptyField("name"))));
        assert!(patients.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_search_by_id_and_name() {
        let (patients, _, _) = fixture().await;
        let emily = patients.create(person("Emily Davis")).await.unwrap();
        patients.create(person("John Smith")).await.unwrap();

        assert_eq!(patients.search(&emily.unique_id).await.unwrap(), vec![emily.clone()]);
        assert_eq!(patients.search("davis").await.unwrap(), vec![emily]);
        assert_eq!(patients.search("PAT-").await.unwrap().len(), 2);
        assert!(patients.search("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_keep_unique_id_on_update() {
        let (patients, _, _) = fixture().await;
        let created = patients.create(person("Emily Davis")).await.unwrap();
        let updated = patients.update(created.id, person("Emily Davis-Moore")).await.unwrap();
        assert_eq!(updated.unique_id, created.unique_id);
        assert_eq!(patients.get(created.id).await.unwrap().name, "Emily Davis-Moore");
        let err = patients.update(999, person("X")).await.unwrap_err();
        assert!(matches!(err, ClinicalError::NotFound { entity: "patient", id: 999 }));
    }

    #[tokio::test]
    async fn should_assemble_chart_with_names() {
        let (patients, storage, _) = fixture().await;
        let emily = patients.create(person("Emily Davis")).await.unwrap();
        let other = patients.create(person("John Smith")).await.unwrap();
        let visit = storage
            .insert_visit(NewVisit {
                patient_id: emily.id,
                organization_id: 1,
                vitals: None,
                symptoms: Some("headache".into()),
                priority: Priority::Normal,
                attended_by: Some(1),
            })
            .await
            .unwrap();
        let order = |patient_id| NewAction {
            patient_id,
            visit_id: None,
            author_id: 1,
            from_organization_id: 1,
            action_type: ActionType::LabTest,
            description: "CBC".into(),
            payload: None,
            notes: None,
        };
        storage.insert_action(order(emily.id)).await.unwrap();
        storage.insert_action(order(other.id)).await.unwrap();
        let mut ghost = order(emily.id);
        ghost.author_id = 77;
        storage.insert_action(ghost).await.unwrap();

        let chart = patients.details(emily.id).await.unwrap();
        assert_eq!(chart.visits.len(), 1);
        assert_eq!(chart.visits[0].visit, visit);
        assert_eq!(chart.visits[0].org_name.as_deref(), Some("City General Hospital"));
        assert_eq!(chart.visits[0].staff_name.as_deref(), Some("Dr. Sarah Wilson"));
        assert_eq!(chart.actions.len(), 2);
        assert_eq!(chart.actions[0].author_name, UNKNOWN);
        assert_eq!(chart.actions[1].author_name, "Dr. Sarah Wilson");
        assert!(chart.actions.iter().all(|a| a.action.patient_id == emily.id));

        assert!(matches!(patients.details(999).await.unwrap_err(), ClinicalError::NotFound { .. }));
    }

    #[tokio::test]
    async fn should_cascade_delete() {
        let (patients, storage, _) = fixture().await;
        let emily = patients.create(person("Emily Davis")).await.unwrap();
        storage
            .insert_visit(NewVisit {
                patient_id: emily.id,
                organization_id: 1,
                vitals: None,
                symptoms: None,
                priority: Priority::Emergency,
                attended_by: None,
            })
            .await
            .unwrap();
        let summary = patients.delete(emily.id).await.unwrap();
        assert_eq!(summary.visits, 1);
        assert!(matches!(patients.get(emily.id).await.unwrap_err(), ClinicalError::NotFound { .. }));
    }
}
