// lib/src/storage_engine/storage_engine.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use models::errors::ClinicalResult;
use models::medical::{
    Action, EntityId, NewAction, NewPatient, NewVisit, Organization, OrganizationType, Patient, Staff, StaffRole,
    Visit,
};

/// An organization ready to be written; the id is assigned by storage.
#[derive(Debug, Clone)]
pub struct OrganizationDraft {
    pub name: String,
    pub org_type: OrganizationType,
    pub code: String,
    pub address: Option<String>,
}

/// A staff member with an already-hashed password.
#[derive(Debug, Clone)]
pub struct StaffDraft {
    pub organization_id: EntityId,
    pub employee_id: String,
    pub name: String,
    pub role: StaffRole,
    pub password_hash: String,
}

/// A staff record together with its stored password hash. Only the
/// identity registry sees this.
#[derive(Debug, Clone)]
pub struct StaffCredentials {
    pub staff: Staff,
    pub password_hash: String,
}

/// What a cascading patient delete removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeSummary {
    pub visits: usize,
    pub actions: usize,
}

/// Read-modify-write step run inside a storage transaction. It may run more
/// than once if the transaction is retried, so it must not have side effects.
pub type VisitChange<'a> = dyn Fn(Visit) -> ClinicalResult<Visit> + Send + Sync + 'a;
/// Like [`VisitChange`]; also receives the write timestamp issued by storage.
pub type ActionChange<'a> = dyn Fn(Action, DateTime<Utc>) -> ClinicalResult<Action> + Send + Sync + 'a;

/// Persistence for organizations, staff, patients, visits and actions.
///
/// Every method that writes more than one record is atomic. Unique-key
/// violations surface as `Conflict`, missing parents as `NotFound`, and any
/// storage failure inside a transaction as `OperationFailed`.
/// Lists are returned newest first. Timestamps are issued by storage under its
/// write lock, at microsecond precision, and never run backwards.
#[async_trait]
pub trait ClinicalStorageEngine: Send + Sync + 'static {
    fn get_type(&self) -> &'static str;

    /// Creates an organization and, optionally, its first staff member in one transaction.
    async fn insert_organization(
        &self,
        organization: OrganizationDraft,
        admin: Option<StaffDraft>,
    ) -> ClinicalResult<(Organization, Option<Staff>)>;
    async fn get_organization(&self, id: EntityId) -> ClinicalResult<Option<Organization>>;
    async fn find_organization_by_code(&self, code: &str) -> ClinicalResult<Option<Organization>>;
    async fn list_organizations(&self) -> ClinicalResult<Vec<Organization>>;
    /// Removes the organization and all of its staff. Returns the number of staff removed.
    async fn delete_organization(&self, id: EntityId) -> ClinicalResult<usize>;

    async fn insert_staff(&self, staff: StaffDraft) -> ClinicalResult<Staff>;
    async fn get_staff(&self, id: EntityId) -> ClinicalResult<Option<Staff>>;
    async fn find_staff_credentials(
        &self,
        organization_id: EntityId,
        employee_id: &str,
    ) -> ClinicalResult<Option<StaffCredentials>>;
    async fn list_staff(&self, organization_id: EntityId) -> ClinicalResult<Vec<Staff>>;

    /// `unique_id` of `None` lets storage generate a fresh `PAT-<year>-<seq>` identifier.
    async fn insert_patient(&self, patient: NewPatient, unique_id: Option<String>) -> ClinicalResult<Patient>;
    async fn get_patient(&self, id: EntityId) -> ClinicalResult<Option<Patient>>;
    async fn list_patients(&self) -> ClinicalResult<Vec<Patient>>;
    /// Replaces demographics; the unique id never changes.
    async fn replace_patient(&self, id: EntityId, patient: NewPatient) -> ClinicalResult<Patient>;
    /// Removes the patient's actions, then visits, then the patient.
    async fn delete_patient(&self, id: EntityId) -> ClinicalResult<CascadeSummary>;

    async fn insert_visit(&self, visit: NewVisit) -> ClinicalResult<Visit>;
    async fn get_visit(&self, id: EntityId) -> ClinicalResult<Option<Visit>>;
    async fn list_visits(&self) -> ClinicalResult<Vec<Visit>>;
    async fn modify_visit(&self, id: EntityId, change: &VisitChange<'_>) -> ClinicalResult<Visit>;

    async fn insert_action(&self, action: NewAction) -> ClinicalResult<Action>;
    async fn get_action(&self, id: EntityId) -> ClinicalResult<Option<Action>>;
    async fn list_actions(&self) -> ClinicalResult<Vec<Action>>;
    async fn modify_action(&self, id: EntityId, change: &ActionChange<'_>) -> ClinicalResult<Action>;

    async fn count_patients(&self) -> ClinicalResult<u64>;
    async fn count_visits(&self) -> ClinicalResult<u64>;

    /// Forces pending writes to disk; returns the number of bytes written.
    async fn flush(&self) -> ClinicalResult<usize>;
}
