// lib/src/router.rs
//! Clinical actions: creation, lifecycle, and department routing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use models::errors::{ClinicalError, ClinicalResult};
use models::events::Event;
use models::medical::{Action, ActionType, ActionUpdate, EntityId, NewAction, NewTransfer, TransitionPolicy};
use models::read_models::{QueueEntry, UNKNOWN};
use tracing::{debug, info};

use crate::lookup::NameLookup;
use crate::notifier::Notifier;
use crate::storage_engine::ClinicalStorageEngine;

/// Action types each receiving role is responsible for. Unknown roles own
/// nothing.
pub fn routed_types(role: &str) -> &'static [ActionType] {
    match role {
        "pharmacy" => &[ActionType::Prescription],
        "diagnostic" => &[ActionType::LabTest, ActionType::Radiology],
        "nurse" => &[ActionType::Observation, ActionType::Procedure, ActionType::Transfer],
        _ => &[],
    }
}

/// Transfers travel through the transfer flow (`incoming_transfers`), never
/// through a department queue, even where the table lists them.
fn is_queue_routed(action_type: ActionType) -> bool {
    action_type != ActionType::Transfer
}

#[derive(Clone)]
pub struct ActionRouter {
    storage: Arc<dyn ClinicalStorageEngine>,
    notifier: Notifier,
    policy: TransitionPolicy,
}

impl ActionRouter {
    pub fn new(storage: Arc<dyn ClinicalStorageEngine>, notifier: Notifier, policy: TransitionPolicy) -> Self {
        ActionRouter { storage, notifier, policy }
    }

    /// Creates a `pending` action and announces it.
    pub async fn create_action(&self, action: NewAction) -> ClinicalResult<Action> {
        action.validate()?;
        let action = self.storage.insert_action(action).await?;
        info!(
            action_id = action.id,
            patient_id = action.patient_id,
            action_type = %action.action_type,
            "Action created"
        );
        self.notifier.broadcast(Event::NewAction { action: action.clone() }).await;
        Ok(action)
    }

    pub async fn get_action(&self, id: EntityId) -> ClinicalResult<Action> {
        self.storage.get_action(id).await?.ok_or_else(|| ClinicalError::not_found("action", id))
    }

    /// Moves an action to `update.status`. The transition is checked against
    /// the current status inside the same storage transaction that writes it.
    pub async fn update_action(&self, id: EntityId, update: ActionUpdate) -> ClinicalResult<Action> {
        update.validate()?;
        let policy = self.policy;
        let action = self
            .storage
            .modify_action(id, &|mut action: Action, now: DateTime<Utc>| -> ClinicalResult<Action> {
                if !policy.permits(action.status, update.status) {
                    return Err(ClinicalError::InvalidTransition { from: action.status, to: update.status });
                }
                action.apply_update(&update, now);
                Ok(action)
            })
            .await?;
        info!(action_id = id, status = %action.status, "Action updated");
        self.notifier.broadcast(Event::UpdateAction { action: action.clone() }).await;
        Ok(action)
    }

    /// Actions routed to `role`, newest first, with patient, author and
    /// originating organization names.
    pub async fn department_queue(&self, role: &str) -> ClinicalResult<Vec<QueueEntry>> {
        let types = routed_types(role);
        if types.is_empty() {
            debug!(role, "No routing rule for role");
            return Ok(Vec::new());
        }
        let mut names = NameLookup::new(self.storage.as_ref());
        let mut queue = Vec::new();
        for action in self.storage.list_actions().await? {
            if !types.contains(&action.action_type) || !is_queue_routed(action.action_type) {
                continue;
            }
            let patient = names.patient(action.patient_id).await?;
            let (patient_name, unique_id) = match patient {
                Some(p) => (p.name, p.unique_id),
                None => (UNKNOWN.to_string(), "N/A".to_string()),
            };
            let author_name = names.staff_name(action.author_id).await?.unwrap_or_else(|| UNKNOWN.to_string());
            let org_name = names
                .organization_name(action.from_organization_id)
                .await?
                .unwrap_or_else(|| UNKNOWN.to_string());
            queue.push(QueueEntry { action, patient_name, unique_id, author_name, org_name });
        }
        Ok(queue)
    }

    /// Requests that another organization take over a patient's care.
    pub async fn create_transfer(&self, transfer: NewTransfer) -> ClinicalResult<Action> {
        if self.storage.get_organization(transfer.target_org_id).await?.is_none() {
            return Err(ClinicalError::not_found("organization", transfer.target_org_id));
        }
        self.create_action(transfer.into()).await
    }

    pub async fn actions_by_type(&self, action_type: ActionType) -> ClinicalResult<Vec<Action>> {
        let mut actions = self.storage.list_actions().await?;
        actions.retain(|action| action.action_type == action_type);
        Ok(actions)
    }

    /// Transfers addressed to one organization, newest first.
    pub async fn incoming_transfers(&self, target_org_id: EntityId) -> ClinicalResult<Vec<Action>> {
        let mut actions = self.actions_by_type(ActionType::Transfer).await?;
        actions.retain(|action| action.target_org_id() == Some(target_org_id));
        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_engine::{OrganizationDraft, SledClinicalStorage, StaffDraft};
    use models::errors::ValidationError;
    use models::medical::{ActionStatus, NewPatient, OrganizationType, StaffRole, TRANSFER_DESCRIPTION};
    use serde_json::json;

    async fn fixture(policy: TransitionPolicy) -> (ActionRouter, Notifier) {
        let storage: Arc<dyn ClinicalStorageEngine> = Arc::new(SledClinicalStorage::open_temporary().unwrap());
        for (name, code, org_type) in [
            ("City General Hospital", "CITY", OrganizationType::Hospital),
            ("Green Cross Pharmacy", "GREEN", OrganizationType::Pharmacy),
        ] {
            storage
                .insert_organization(
                    OrganizationDraft { name: name.into(), org_type, code: code.into(), address: None },
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
        }
        storage
            .insert_patient(
                NewPatient {
                    name: "John Smith".into(),
                    dob: "1980-05-15".into(),
                    gender: "Male".into(),
                    contact: None,
                    blood_group: Some("O+".into()),
                },
                Some("PAT-2026-001".into()),
            )
            .await
            .unwrap();
        let notifier = Notifier::new(256);
        (ActionRouter::new(storage, notifier.clone(), policy), notifier)
    }

    fn order(action_type: ActionType) -> NewAction {
        NewAction {
            patient_id: 1,
            visit_id: None,
            author_id: 1,
            from_organization_id: 1,
            action_type,
            description: format!("{} order", action_type),
            payload: None,
            notes: None,
        }
    }

    fn status(status: ActionStatus) -> ActionUpdate {
        ActionUpdate { status, notes: None, completed_by: None, completed_by_organization_id: None }
    }

    fn completion(by: EntityId) -> ActionUpdate {
        ActionUpdate {
            status: ActionStatus::Completed,
            notes: Some("dispensed".into()),
            completed_by: Some(by),
            completed_by_organization_id: Some(2),
        }
    }

    #[test]
    fn should_route_by_role() {
        assert_eq!(routed_types("pharmacy"), &[ActionType::Prescription]);
        assert_eq!(routed_types("diagnostic"), &[ActionType::LabTest, ActionType::Radiology]);
        assert!(routed_types("unknown_role").is_empty());
        assert!(routed_types("doctor").is_empty());
    }

    #[tokio::test]
    async fn should_start_pending_and_announce() {
        let (router, notifier) = fixture(TransitionPolicy::Strict).await;
        let (_, mut events) = notifier.connect().await;
        let action = router.create_action(order(ActionType::Prescription)).await.unwrap();
        assert_eq!(action.status, ActionStatus::Pending);
        assert_eq!(action.created_at, action.updated_at);
        assert!(action.completed_at.is_none());
        assert_eq!(events.recv().await, Some(Event::NewAction { action }));
    }

    #[tokio::test]
    async fn should_walk_lifecycle_and_keep_completion_consistent() {
        let (router, notifier) = fixture(TransitionPolicy::Strict).await;
        let created = router.create_action(order(ActionType::Prescription)).await.unwrap();
        let (_, mut events) = notifier.connect().await;

        let started = router.update_action(created.id, status(ActionStatus::InProgress)).await.unwrap();
        assert!(started.completed_at.is_none());
        assert!(started.updated_at >= created.updated_at);

        let done = router.update_action(created.id, completion(1)).await.unwrap();
        assert_eq!(done.status, ActionStatus::Completed);
        assert!(done.completed_at.is_some());
        assert_eq!(done.completed_by, Some(1));
        assert_eq!(done.completed_by_organization_id, Some(2));
        assert_eq!(done.notes.as_deref(), Some("dispensed"));
        assert_eq!(router.get_action(created.id).await.unwrap(), done);

        assert_eq!(events.recv().await, Some(Event::UpdateAction { action: started }));
        assert_eq!(events.recv().await, Some(Event::UpdateAction { action: done }));
    }

    #[tokio::test]
    async fn should_refuse_leaving_terminal_state_when_strict() {
        let (router, notifier) = fixture(TransitionPolicy::Strict).await;
        let created = router.create_action(order(ActionType::LabTest)).await.unwrap();
        router.update_action(created.id, status(ActionStatus::Cancelled)).await.unwrap();
        let (_, mut events) = notifier.connect().await;

        let err = router.update_action(created.id, status(ActionStatus::Pending)).await.unwrap_err();
        assert!(matches!(
            err,
            ClinicalError::InvalidTransition { from: ActionStatus::Cancelled, to: ActionStatus::Pending }
        ));
        assert_eq!(router.get_action(created.id).await.unwrap().status, ActionStatus::Cancelled);
        assert!(events.try_recv().is_err());

        let other = router.create_action(order(ActionType::LabTest)).await.unwrap();
        let err = router.update_action(other.id, completion(1)).await.unwrap_err();
        assert!(matches!(err, ClinicalError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn should_clear_completion_when_reopened_under_permissive_policy() {
        let (router, _) = fixture(TransitionPolicy::Permissive).await;
        let created = router.create_action(order(ActionType::Radiology)).await.unwrap();
        let done = router.update_action(created.id, completion(1)).await.unwrap();
        assert!(done.completed_at.is_some());

        let reopened = router.update_action(created.id, status(ActionStatus::Pending)).await.unwrap();
        assert_eq!(reopened.status, ActionStatus::Pending);
        assert!(reopened.completed_at.is_none());
        assert!(reopened.completed_by.is_none());
        assert_eq!(reopened.notes.as_deref(), Some("dispensed"));
    }

    #[tokio::test]
    async fn should_require_completer() {
        let (router, _) = fixture(TransitionPolicy::Permissive).await;
        let created = router.create_action(order(ActionType::Prescription)).await.unwrap();
        let mut update = completion(1);
        update.completed_by = None;
        let err = router.update_action(created.id, update).await.unwrap_err();
        assert!(matches!(err, ClinicalError::Validation(ValidationError::MissingCompleter)));
    }

    #[tokio::test]
    async fn should_report_missing_action() {
        let (router, _) = fixture(TransitionPolicy::Strict).await;
        let err = router.update_action(404, status(ActionStatus::InProgress)).await.unwrap_err();
        assert!(matches!(err, ClinicalError::NotFound { entity: "action", id: 404 }));
    }

    #[tokio::test]
    async fn should_fill_pharmacy_queue_with_prescriptions_only() {
        let (router, _) = fixture(TransitionPolicy::Strict).await;
        for action_type in ActionType::ALL {
            router.create_action(order(*action_type)).await.unwrap();
        }
        let second = router.create_action(order(ActionType::Prescription)).await.unwrap();

        let queue = router.department_queue("pharmacy").await.unwrap();
        assert_eq!(queue.len(), 2);
        assert!(queue.iter().all(|e| e.action.action_type == ActionType::Prescription));
        assert_eq!(queue[0].action.id, second.id);
        assert_eq!(queue[0].patient_name, "John Smith");
        assert_eq!(queue[0].unique_id, "PAT-2026-001");
        assert_eq!(queue[0].author_name, "Dr. Sarah Wilson");
        assert_eq!(queue[0].org_name, "City General Hospital");

        assert_eq!(router.department_queue("diagnostic").await.unwrap().len(), 2);
        assert!(router.department_queue("unknown_role").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_keep_transfers_out_of_queues() {
        let (router, _) = fixture(TransitionPolicy::Strict).await;
        let transfer = router
            .create_transfer(NewTransfer {
                patient_id: 1,
                target_org_id: 2,
                from_org_id: 1,
                author_id: 1,
                notes: Some("needs specialist".into()),
            })
            .await
            .unwrap();
        assert_eq!(transfer.action_type, ActionType::Transfer);
        assert_eq!(transfer.description, TRANSFER_DESCRIPTION);
        assert_eq!(transfer.payload, Some(json!({ "targetOrgId": 2 })));

        for role in ["pharmacy", "diagnostic", "nurse", "doctor", "admin"] {
            let queue = router.department_queue(role).await.unwrap();
            assert!(queue.iter().all(|e| e.action.id != transfer.id), "transfer leaked into {}", role);
        }
        assert_eq!(router.actions_by_type(ActionType::Transfer).await.unwrap(), vec![transfer.clone()]);
        assert_eq!(router.incoming_transfers(2).await.unwrap(), vec![transfer]);
        assert!(router.incoming_transfers(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_reject_transfer_to_unknown_organization() {
        let (router, _) = fixture(TransitionPolicy::Strict).await;
        let err = router
            .create_transfer(NewTransfer { patient_id: 1, target_org_id: 77, from_org_id: 1, author_id: 1, notes: None })
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicalError::NotFound { entity: "organization", id: 77 }));
        assert!(router.actions_by_type(ActionType::Transfer).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn should_keep_concurrent_creations_distinct_and_ordered() {
        let (router, _) = fixture(TransitionPolicy::Strict).await;
        let mut handles = Vec::new();
        for n in 0..100 {
            let router = router.clone();
            handles.push(tokio::spawn(async move {
                let mut action = order(ActionType::Observation);
                action.description = format!("observation #{}", n);
                router.create_action(action).await
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 100);

        let mut previous = None;
        for id in ids {
            let action = router.get_action(id).await.unwrap();
            if let Some(before) = previous {
                assert!(action.created_at >= before);
            }
            previous = Some(action.created_at);
        }
    }
}
