// lib/src/storage_engine/sled_storage.rs

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, SubsecRound, Utc};
use models::errors::{ClinicalError, ClinicalResult, ValidationError};
use models::medical::{
    Action, ActionStatus, EntityId, NewAction, NewPatient, NewVisit, Organization, Patient, Staff, Visit,
};
use serde::{de::DeserializeOwned, Serialize};
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError, TransactionResult,
    TransactionalTree,
};
use sled::{Db, Transactional, Tree};
use tokio::sync::Mutex as TokioMutex;
use tracing::{debug, error, info};

use crate::storage_engine::rows::{ActionRow, OrganizationRow, PatientRow, StaffRow, VisitRow};
use crate::storage_engine::storage_engine::{
    ActionChange, CascadeSummary, ClinicalStorageEngine, OrganizationDraft, StaffCredentials, StaffDraft,
    VisitChange,
};
use crate::storage_engine::storage_utils::{decode_id, decode_row, encode_row, id_key, staff_index_key};

const ORGANIZATION_SEQ: &str = "organizations";
const STAFF_SEQ: &str = "staff";
const PATIENT_SEQ: &str = "patients";
const VISIT_SEQ: &str = "visits";
const ACTION_SEQ: &str = "actions";

type TxResult<T> = ConflictableTransactionResult<T, ClinicalError>;

fn abort<T>(err: impl Into<ClinicalError>) -> TxResult<T> {
    Err(ConflictableTransactionError::Abort(err.into()))
}

trait OrAbort<T> {
    fn or_abort(self) -> TxResult<T>;
}

impl<T> OrAbort<T> for ClinicalResult<T> {
    fn or_abort(self) -> TxResult<T> {
        self.map_err(ConflictableTransactionError::Abort)
    }
}

/// Maps a finished transaction onto the domain result. Domain aborts pass
/// through; anything that went wrong underneath becomes `OperationFailed`.
fn settle<T>(result: TransactionResult<T, ClinicalError>, operation: &str) -> ClinicalResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(TransactionError::Abort(err)) if !err.is_internal() => Err(err),
        Err(TransactionError::Abort(err)) => {
            error!(operation, error = %err, "Transaction aborted, changes rolled back");
            Err(ClinicalError::OperationFailed(format!("{} failed", operation)))
        }
        Err(TransactionError::Storage(err)) => {
            error!(operation, error = %err, "Storage failure inside transaction, changes rolled back");
            Err(ClinicalError::OperationFailed(format!("{} failed", operation)))
        }
    }
}

fn next_id(counters: &TransactionalTree, sequence: &str) -> TxResult<EntityId> {
    let current = match counters.get(sequence)? {
        Some(bytes) => decode_id(&bytes).or_abort()?,
        None => 0,
    };
    let next = current + 1;
    counters.insert(sequence, id_key(next))?;
    Ok(next)
}

fn put<R: Serialize>(tree: &TransactionalTree, id: EntityId, row: &R) -> TxResult<()> {
    tree.insert(id_key(id), encode_row(row).or_abort()?)?;
    Ok(())
}

fn fetch<R: DeserializeOwned>(tree: &TransactionalTree, id: EntityId) -> TxResult<Option<R>> {
    match tree.get(id_key(id))? {
        Some(bytes) => Ok(Some(decode_row(&bytes).or_abort()?)),
        None => Ok(None),
    }
}

fn require<R: DeserializeOwned>(tree: &TransactionalTree, entity: &'static str, id: EntityId) -> TxResult<R> {
    match fetch(tree, id)? {
        Some(row) => Ok(row),
        None => abort(ClinicalError::not_found(entity, id)),
    }
}

fn insert_staff_row(
    staff: &TransactionalTree,
    staff_keys: &TransactionalTree,
    counters: &TransactionalTree,
    organization_id: EntityId,
    draft: &StaffDraft,
) -> TxResult<StaffRow> {
    let index_key = staff_index_key(organization_id, &draft.employee_id);
    if staff_keys.get(&index_key)?.is_some() {
        return abort(ClinicalError::Conflict(format!(
            "Employee id {} already exists in organization {}",
            draft.employee_id, organization_id
        )));
    }
    let id = next_id(counters, STAFF_SEQ)?;
    let row = StaffRow {
        id,
        organization_id,
        employee_id: draft.employee_id.clone(),
        name: draft.name.clone(),
        role: draft.role,
        password_hash: draft.password_hash.clone(),
    };
    put(staff, id, &row)?;
    staff_keys.insert(index_key, id_key(id))?;
    Ok(row)
}

/// Issues write timestamps. Lives inside the write lock, so every stamp is
/// at least as late as the one before it.
#[derive(Debug)]
struct WriteClock {
    last: DateTime<Utc>,
}

impl WriteClock {
    fn new() -> Self {
        WriteClock { last: DateTime::UNIX_EPOCH }
    }

    /// Microsecond precision so a stored row reads back identical.
    fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now().trunc_subsecs(6);
        if now > self.last {
            self.last = now;
        }
        self.last
    }
}

/// Clinical store over a single sled database.
///
/// All writes go through `write_guard`, which also owns the write clock.
/// Cascading deletes scan while holding it and then remove everything in one
/// multi-tree transaction, so no other writer can slip a child row in between.
pub struct SledClinicalStorage {
    db: Db,
    organizations: Tree,
    staff: Tree,
    patients: Tree,
    visits: Tree,
    actions: Tree,
    org_codes: Tree,
    staff_keys: Tree,
    patient_uids: Tree,
    counters: Tree,
    write_guard: TokioMutex<WriteClock>,
}

impl SledClinicalStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> ClinicalResult<Self> {
        let path = path.as_ref();
        info!("Opening clinical store at {:?}", path);
        let db = sled::Config::new().path(path).open().map_err(|e| {
            error!("Failed to open sled database at {:?}: {}", path, e);
            ClinicalError::Storage(format!("Failed to open sled database at {:?}: {}", path, e))
        })?;
        Self::with_db(db)
    }

    /// In-memory store that is discarded on drop.
    pub fn open_temporary() -> ClinicalResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::with_db(db)
    }

    fn with_db(db: Db) -> ClinicalResult<Self> {
        Ok(SledClinicalStorage {
            organizations: db.open_tree("organizations")?,
            staff: db.open_tree("staff")?,
            patients: db.open_tree("patients")?,
            visits: db.open_tree("visits")?,
            actions: db.open_tree("actions")?,
            org_codes: db.open_tree("org_codes")?,
            staff_keys: db.open_tree("staff_keys")?,
            patient_uids: db.open_tree("patient_uids")?,
            counters: db.open_tree("counters")?,
            write_guard: TokioMutex::new(WriteClock::new()),
            db,
        })
    }

    fn read<R: DeserializeOwned>(tree: &Tree, id: EntityId) -> ClinicalResult<Option<R>> {
        tree.get(id_key(id))?.map(|bytes| decode_row(&bytes)).transpose()
    }

    /// Every row of a tree, highest id first.
    fn scan<R: DeserializeOwned>(tree: &Tree) -> ClinicalResult<Vec<R>> {
        tree.iter()
            .rev()
            .map(|item| {
                let (_, bytes) = item?;
                decode_row(&bytes)
            })
            .collect()
    }
}

#[async_trait]
impl ClinicalStorageEngine for SledClinicalStorage {
    fn get_type(&self) -> &'static str {
        "sled"
    }

    async fn insert_organization(
        &self,
        organization: OrganizationDraft,
        admin: Option<StaffDraft>,
    ) -> ClinicalResult<(Organization, Option<Staff>)> {
        let _guard = self.write_guard.lock().await;
        let result = (&self.organizations, &self.org_codes, &self.staff, &self.staff_keys, &self.counters).transaction(
            |(organizations, org_codes, staff, staff_keys, counters)| {
                if org_codes.get(organization.code.as_bytes())?.is_some() {
                    return abort(ClinicalError::Conflict(format!(
                        "Organization code {} already exists",
                        organization.code
                    )));
                }
                let id = next_id(counters, ORGANIZATION_SEQ)?;
                let row = OrganizationRow {
                    id,
                    name: organization.name.clone(),
                    org_type: organization.org_type,
                    code: organization.code.clone(),
                    address: organization.address.clone(),
                };
                put(organizations, id, &row)?;
                org_codes.insert(organization.code.as_bytes(), id_key(id))?;
                let admin_row = match &admin {
                    Some(draft) => Some(insert_staff_row(staff, staff_keys, counters, id, draft)?),
                    None => None,
                };
                Ok((row, admin_row))
            },
        );
        let (row, admin_row) = settle(result, "register organization")?;
        let organization = row.into_entity()?;
        let admin = admin_row.map(StaffRow::into_entity).transpose()?;
        info!(organization_id = organization.id, code = %organization.code, "Organization created");
        Ok((organization, admin))
    }

    async fn get_organization(&self, id: EntityId) -> ClinicalResult<Option<Organization>> {
        Self::read::<OrganizationRow>(&self.organizations, id)?
            .map(OrganizationRow::into_entity)
            .transpose()
    }

    async fn find_organization_by_code(&self, code: &str) -> ClinicalResult<Option<Organization>> {
        match self.org_codes.get(code.as_bytes())? {
            Some(id) => self.get_organization(decode_id(&id)?).await,
            None => Ok(None),
        }
    }

    async fn list_organizations(&self) -> ClinicalResult<Vec<Organization>> {
        Self::scan::<OrganizationRow>(&self.organizations)?
            .into_iter()
            .map(OrganizationRow::into_entity)
            .collect()
    }

    async fn delete_organization(&self, id: EntityId) -> ClinicalResult<usize> {
        let _guard = self.write_guard.lock().await;
        let members: Vec<StaffRow> = Self::scan::<StaffRow>(&self.staff)?
            .into_iter()
            .filter(|row| row.organization_id == id)
            .collect();
        let result = (&self.organizations, &self.org_codes, &self.staff, &self.staff_keys).transaction(
            |(organizations, org_codes, staff, staff_keys)| {
                let org: OrganizationRow = require(organizations, "organization", id)?;
                for member in &members {
                    staff.remove(id_key(member.id))?;
                    staff_keys.remove(staff_index_key(id, &member.employee_id))?;
                }
                org_codes.remove(org.code.as_bytes())?;
                organizations.remove(id_key(id))?;
                Ok(members.len())
            },
        );
        let removed = settle(result, "delete organization")?;
        info!(organization_id = id, staff_removed = removed, "Organization deleted");
        Ok(removed)
    }

    async fn insert_staff(&self, draft: StaffDraft) -> ClinicalResult<Staff> {
        let _guard = self.write_guard.lock().await;
        let result = (&self.organizations, &self.staff, &self.staff_keys, &self.counters).transaction(
            |(organizations, staff, staff_keys, counters)| {
                let _: OrganizationRow = require(organizations, "organization", draft.organization_id)?;
                insert_staff_row(staff, staff_keys, counters, draft.organization_id, &draft)
            },
        );
        let staff = settle(result, "create staff")?.into_entity()?;
        info!(staff_id = staff.id, organization_id = staff.organization_id, "Staff created");
        Ok(staff)
    }

    async fn get_staff(&self, id: EntityId) -> ClinicalResult<Option<Staff>> {
        Self::read::<StaffRow>(&self.staff, id)?.map(StaffRow::into_entity).transpose()
    }

    async fn find_staff_credentials(
        &self,
        organization_id: EntityId,
        employee_id: &str,
    ) -> ClinicalResult<Option<StaffCredentials>> {
        let Some(id) = self.staff_keys.get(staff_index_key(organization_id, employee_id))? else {
            return Ok(None);
        };
        let row: Option<StaffRow> = Self::read(&self.staff, decode_id(&id)?)?;
        Ok(row.map(|row| {
            let (staff, password_hash) = row.split();
            StaffCredentials { staff, password_hash }
        }))
    }

    async fn list_staff(&self, organization_id: EntityId) -> ClinicalResult<Vec<Staff>> {
        Self::scan::<StaffRow>(&self.staff)?
            .into_iter()
            .filter(|row| row.organization_id == organization_id)
            .map(StaffRow::into_entity)
            .collect()
    }

    async fn insert_patient(&self, patient: NewPatient, unique_id: Option<String>) -> ClinicalResult<Patient> {
        let mut clock = self.write_guard.lock().await;
        let year = clock.stamp().year();
        let result = (&self.patients, &self.patient_uids, &self.counters).transaction(
            |(patients, patient_uids, counters)| {
                let id = next_id(counters, PATIENT_SEQ)?;
                let unique_id = match &unique_id {
                    Some(given) => {
                        if patient_uids.get(given.as_bytes())?.is_some() {
                            return abort(ClinicalError::Conflict(format!("Patient id {} already exists", given)));
                        }
                        given.clone()
                    }
                    None => {
                        let mut seq = id;
                        loop {
                            let candidate = format!("PAT-{}-{:06}", year, seq);
                            if patient_uids.get(candidate.as_bytes())?.is_none() {
                                break candidate;
                            }
                            seq += 1;
                        }
                    }
                };
                let row = PatientRow {
                    id,
                    unique_id: unique_id.clone(),
                    name: patient.name.clone(),
                    dob: patient.dob.clone(),
                    gender: patient.gender.clone(),
                    contact: patient.contact.clone(),
                    blood_group: patient.blood_group.clone(),
                };
                put(patients, id, &row)?;
                patient_uids.insert(unique_id.as_bytes(), id_key(id))?;
                Ok(row)
            },
        );
        let patient = settle(result, "create patient")?.into_entity()?;
        info!(patient_id = patient.id, unique_id = %patient.unique_id, "Patient registered");
        Ok(patient)
    }

    async fn get_patient(&self, id: EntityId) -> ClinicalResult<Option<Patient>> {
        Self::read::<PatientRow>(&self.patients, id)?.map(PatientRow::into_entity).transpose()
    }

    async fn list_patients(&self) -> ClinicalResult<Vec<Patient>> {
        Self::scan::<PatientRow>(&self.patients)?
            .into_iter()
            .map(PatientRow::into_entity)
            .collect()
    }

    async fn replace_patient(&self, id: EntityId, patient: NewPatient) -> ClinicalResult<Patient> {
        let _guard = self.write_guard.lock().await;
        let result = self.patients.transaction(|patients| {
            let mut row: PatientRow = require(patients, "patient", id)?;
            row.name = patient.name.clone();
            row.dob = patient.dob.clone();
            row.gender = patient.gender.clone();
            row.contact = patient.contact.clone();
            row.blood_group = patient.blood_group.clone();
            put(patients, id, &row)?;
            Ok(row)
        });
        settle(result, "update patient")?.into_entity()
    }

    async fn delete_patient(&self, id: EntityId) -> ClinicalResult<CascadeSummary> {
        let _guard = self.write_guard.lock().await;
        let action_ids: Vec<EntityId> = Self::scan::<ActionRow>(&self.actions)?
            .into_iter()
            .filter(|row| row.patient_id == id)
            .map(|row| row.id)
            .collect();
        let visit_ids: Vec<EntityId> = Self::scan::<VisitRow>(&self.visits)?
            .into_iter()
            .filter(|row| row.patient_id == id)
            .map(|row| row.id)
            .collect();
        let result = (&self.patients, &self.patient_uids, &self.visits, &self.actions).transaction(
            |(patients, patient_uids, visits, actions)| {
                let patient: PatientRow = require(patients, "patient", id)?;
                for action_id in &action_ids {
                    actions.remove(id_key(*action_id))?;
                }
                for visit_id in &visit_ids {
                    visits.remove(id_key(*visit_id))?;
                }
                patient_uids.remove(patient.unique_id.as_bytes())?;
                patients.remove(id_key(id))?;
                Ok(CascadeSummary { visits: visit_ids.len(), actions: action_ids.len() })
            },
        );
        let summary = settle(result, "delete patient")?;
        info!(
            patient_id = id,
            visits_removed = summary.visits,
            actions_removed = summary.actions,
            "Patient deleted"
        );
        Ok(summary)
    }

    async fn insert_visit(&self, visit: NewVisit) -> ClinicalResult<Visit> {
        let mut clock = self.write_guard.lock().await;
        let date = clock.stamp();
        let result = (&self.patients, &self.organizations, &self.visits, &self.counters).transaction(
            |(patients, organizations, visits, counters)| {
                let _: PatientRow = require(patients, "patient", visit.patient_id)?;
                let _: OrganizationRow = require(organizations, "organization", visit.organization_id)?;
                let id = next_id(counters, VISIT_SEQ)?;
                let entity = Visit {
                    id,
                    patient_id: visit.patient_id,
                    organization_id: visit.organization_id,
                    date,
                    vitals: visit.vitals.clone(),
                    symptoms: visit.symptoms.clone(),
                    diagnosis: None,
                    priority: visit.priority,
                    attended_by: visit.attended_by,
                };
                put(visits, id, &VisitRow::from_entity(&entity).or_abort()?)?;
                Ok(entity)
            },
        );
        let visit = settle(result, "create visit")?;
        debug!(visit_id = visit.id, patient_id = visit.patient_id, priority = %visit.priority, "Visit recorded");
        Ok(visit)
    }

    async fn get_visit(&self, id: EntityId) -> ClinicalResult<Option<Visit>> {
        Self::read::<VisitRow>(&self.visits, id)?.map(VisitRow::into_entity).transpose()
    }

    async fn list_visits(&self) -> ClinicalResult<Vec<Visit>> {
        Self::scan::<VisitRow>(&self.visits)?
            .into_iter()
            .map(VisitRow::into_entity)
            .collect()
    }

    async fn modify_visit(&self, id: EntityId, change: &VisitChange<'_>) -> ClinicalResult<Visit> {
        let _guard = self.write_guard.lock().await;
        let result = self.visits.transaction(|visits| {
            let row: VisitRow = require(visits, "visit", id)?;
            let updated = change(row.into_entity().or_abort()?).or_abort()?;
            put(visits, id, &VisitRow::from_entity(&updated).or_abort()?)?;
            Ok(updated)
        });
        settle(result, "update visit")
    }

    async fn insert_action(&self, action: NewAction) -> ClinicalResult<Action> {
        let mut clock = self.write_guard.lock().await;
        let now = clock.stamp();
        let result = (&self.patients, &self.visits, &self.actions, &self.counters).transaction(
            |(patients, visits, actions, counters)| {
                let _: PatientRow = require(patients, "patient", action.patient_id)?;
                if let Some(visit_id) = action.visit_id {
                    let visit: VisitRow = require(visits, "visit", visit_id)?;
                    if visit.patient_id != action.patient_id {
                        return abort(ValidationError::VisitPatientMismatch {
                            visit_id,
                            patient_id: action.patient_id,
                        });
                    }
                }
                let id = next_id(counters, ACTION_SEQ)?;
                let entity = Action {
                    id,
                    patient_id: action.patient_id,
                    visit_id: action.visit_id,
                    author_id: action.author_id,
                    from_organization_id: action.from_organization_id,
                    action_type: action.action_type,
                    status: ActionStatus::Pending,
                    description: action.description.clone(),
                    payload: action.payload.clone(),
                    created_at: now,
                    updated_at: now,
                    completed_at: None,
                    completed_by: None,
                    completed_by_organization_id: None,
                    notes: action.notes.clone(),
                };
                put(actions, id, &ActionRow::from_entity(&entity).or_abort()?)?;
                Ok(entity)
            },
        );
        settle(result, "create action")
    }

    async fn get_action(&self, id: EntityId) -> ClinicalResult<Option<Action>> {
        Self::read::<ActionRow>(&self.actions, id)?.map(ActionRow::into_entity).transpose()
    }

    async fn list_actions(&self) -> ClinicalResult<Vec<Action>> {
        Self::scan::<ActionRow>(&self.actions)?
            .into_iter()
            .map(ActionRow::into_entity)
            .collect()
    }

    async fn modify_action(&self, id: EntityId, change: &ActionChange<'_>) -> ClinicalResult<Action> {
        let mut clock = self.write_guard.lock().await;
        let now = clock.stamp();
        let result = self.actions.transaction(|actions| {
            let row: ActionRow = require(actions, "action", id)?;
            let updated = change(row.into_entity().or_abort()?, now).or_abort()?;
            put(actions, id, &ActionRow::from_entity(&updated).or_abort()?)?;
            Ok(updated)
        });
        settle(result, "update action")
    }

    async fn count_patients(&self) -> ClinicalResult<u64> {
        Ok(self.patients.len() as u64)
    }

    async fn count_visits(&self) -> ClinicalResult<u64> {
        Ok(self.visits.len() as u64)
    }

    async fn flush(&self) -> ClinicalResult<usize> {
        let bytes = self.db.flush_async().await?;
        debug!("Flushed {} bytes to disk", bytes);
        Ok(bytes)
    }
}
