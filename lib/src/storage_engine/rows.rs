// lib/src/storage_engine/rows.rs
//! On-disk shapes of the persisted entities.
//!
//! Rows are bincode-encoded; timestamps are kept as microseconds since the
//! epoch and structured sub-fields as JSON documents. Each row converts to its
//! entity in exactly one place.

use chrono::{DateTime, Utc};
use models::errors::{ClinicalError, ClinicalResult};
use models::medical::{
    Action, ActionStatus, ActionType, EntityId, Organization, OrganizationType, Patient, Priority, Staff, StaffRole,
    Visit, Vitals,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::storage_utils::{from_document, to_document};

fn to_micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

fn from_micros(micros: i64) -> ClinicalResult<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| ClinicalError::Serialization(format!("Timestamp out of range: {}", micros)))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationRow {
    pub id: EntityId,
    pub name: String,
    pub org_type: OrganizationType,
    pub code: String,
    pub address: Option<String>,
}

impl OrganizationRow {
    pub fn into_entity(self) -> ClinicalResult<Organization> {
        Ok(Organization {
            id: self.id,
            name: self.name,
            org_type: self.org_type,
            code: self.code,
            address: self.address,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffRow {
    pub id: EntityId,
    pub organization_id: EntityId,
    pub employee_id: String,
    pub name: String,
    pub role: StaffRole,
    pub password_hash: String,
}

impl StaffRow {
    pub fn into_entity(self) -> ClinicalResult<Staff> {
        Ok(self.split().0)
    }

    /// Separates the public record from the stored hash.
    pub fn split(self) -> (Staff, String) {
        let staff = Staff {
            id: self.id,
            organization_id: self.organization_id,
            employee_id: self.employee_id,
            name: self.name,
            role: self.role,
        };
        (staff, self.password_hash)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRow {
    pub id: EntityId,
    pub unique_id: String,
    pub name: String,
    pub dob: String,
    pub gender: String,
    pub contact: Option<String>,
    pub blood_group: Option<String>,
}

impl PatientRow {
    pub fn into_entity(self) -> ClinicalResult<Patient> {
        Ok(Patient {
            id: self.id,
            unique_id: self.unique_id,
            name: self.name,
            dob: self.dob,
            gender: self.gender,
            contact: self.contact,
            blood_group: self.blood_group,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitRow {
    pub id: EntityId,
    pub patient_id: EntityId,
    pub organization_id: EntityId,
    pub date: i64,
    pub vitals: Option<String>,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub priority: Priority,
    pub attended_by: Option<EntityId>,
}

impl VisitRow {
    pub fn from_entity(v: &Visit) -> ClinicalResult<Self> {
        Ok(VisitRow {
            id: v.id,
            patient_id: v.patient_id,
            organization_id: v.organization_id,
            date: to_micros(v.date),
            vitals: to_document(&v.vitals)?,
            symptoms: v.symptoms.clone(),
            diagnosis: v.diagnosis.clone(),
            priority: v.priority,
            attended_by: v.attended_by,
        })
    }

    pub fn into_entity(self) -> ClinicalResult<Visit> {
        let vitals: Option<Vitals> = from_document(&self.vitals)?;
        Ok(Visit {
            id: self.id,
            patient_id: self.patient_id,
            organization_id: self.organization_id,
            date: from_micros(self.date)?,
            vitals,
            symptoms: self.symptoms,
            diagnosis: self.diagnosis,
            priority: self.priority,
            attended_by: self.attended_by,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRow {
    pub id: EntityId,
    pub patient_id: EntityId,
    pub visit_id: Option<EntityId>,
    pub author_id: EntityId,
    pub from_organization_id: EntityId,
    pub action_type: ActionType,
    pub status: ActionStatus,
    pub description: String,
    pub payload: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub completed_at: Option<i64>,
    pub completed_by: Option<EntityId>,
    pub completed_by_organization_id: Option<EntityId>,
    pub notes: Option<String>,
}

impl ActionRow {
    pub fn from_entity(a: &Action) -> ClinicalResult<Self> {
        Ok(ActionRow {
            id: a.id,
            patient_id: a.patient_id,
            visit_id: a.visit_id,
            author_id: a.author_id,
            from_organization_id: a.from_organization_id,
            action_type: a.action_type,
            status: a.status,
            description: a.description.clone(),
            payload: to_document(&a.payload)?,
            created_at: to_micros(a.created_at),
            updated_at: to_micros(a.updated_at),
            completed_at: a.completed_at.map(to_micros),
            completed_by: a.completed_by,
            completed_by_organization_id: a.completed_by_organization_id,
            notes: a.notes.clone(),
        })
    }

    pub fn into_entity(self) -> ClinicalResult<Action> {
        let payload: Option<Value> = from_document(&self.payload)?;
        Ok(Action {
            id: self.id,
            patient_id: self.patient_id,
            visit_id: self.visit_id,
            author_id: self.author_id,
            from_organization_id: self.from_organization_id,
            action_type: self.action_type,
            status: self.status,
            description: self.description,
            payload,
            created_at: from_micros(self.created_at)?,
            updated_at: from_micros(self.updated_at)?,
            completed_at: self.completed_at.map(from_micros).transpose()?,
            completed_by: self.completed_by,
            completed_by_organization_id: self.completed_by_organization_id,
            notes: self.notes,
        })
    }
}
