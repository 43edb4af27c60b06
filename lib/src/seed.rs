// lib/src/seed.rs
//! Demo data for an empty store.

use std::sync::Arc;

use models::errors::{ClinicalError, ClinicalResult};
use models::medical::{NewPatient, OrganizationType, StaffRole};
use security::PasswordDigest;
use tracing::info;

use crate::storage_engine::{ClinicalStorageEngine, OrganizationDraft, StaffDraft};

pub const DEMO_PASSWORD: &str = "password";

struct SeedOrganization {
    name: &'static str,
    org_type: OrganizationType,
    code: &'static str,
    address: &'static str,
}

// Inserted first, so they receive the protected ids 1 through 4.
const ORGANIZATIONS: [SeedOrganization; 4] = [
    SeedOrganization {
        name: "City General Hospital",
        org_type: OrganizationType::Hospital,
        code: "CITY",
        address: "123 Health Ave",
    },
    SeedOrganization {
        name: "Green Health Pharmacy",
        org_type: OrganizationType::Pharmacy,
        code: "GREEN",
        address: "45 Med Street",
    },
    SeedOrganization {
        name: "City Diagnostics Lab",
        org_type: OrganizationType::Lab,
        code: "LAB",
        address: "88 Science Road",
    },
    SeedOrganization {
        name: "MediConnect HQ",
        org_type: OrganizationType::Platform,
        code: "HQ",
        address: "1 Admin Plaza",
    },
];

// (role, employee id, name, organization code)
const STAFF: [(StaffRole, &str, &str, &str); 6] = [
    (StaffRole::Admin, "ADM001", "Admin Raj Patel", "CITY"),
    (StaffRole::Doctor, "DOC001", "Dr. Sarah Chen", "CITY"),
    (StaffRole::Nurse, "NUR001", "Nurse Priya Sharma", "CITY"),
    (StaffRole::Pharmacy, "PH001", "Pharmacist John Doe", "GREEN"),
    (StaffRole::Diagnostic, "LAB001", "Lab Tech Mike Ross", "LAB"),
    (StaffRole::SuperAdmin, "SUPER001", "Super Admin", "HQ"),
];

// (unique id, name, dob, gender, contact, blood group)
const PATIENTS: [(&str, &str, &str, &str, &str, &str); 2] = [
    ("PAT-2026-001", "John Smith", "1980-05-15", "Male", "+1555123456", "O+"),
    ("PAT-2026-002", "Emily Davis", "1992-11-20", "Female", "+1555987654", "A-"),
];

/// Brings the store up to the demo organizations, staff and patients. Each
/// entity is checked on its own, so a seed interrupted halfway is completed
/// on the next run. Returns whether anything was written.
pub async fn seed_demo_data(
    storage: &dyn ClinicalStorageEngine,
    digest: Arc<dyn PasswordDigest>,
) -> ClinicalResult<bool> {
    let mut organizations = 0;
    let mut staff = 0;
    let mut patients = 0;

    let mut organization_ids = Vec::with_capacity(ORGANIZATIONS.len());
    for org in &ORGANIZATIONS {
        let id = match storage.find_organization_by_code(org.code).await? {
            Some(existing) => existing.id,
            None => {
                let (created, _) = storage
                    .insert_organization(
                        OrganizationDraft {
                            name: org.name.to_string(),
                            org_type: org.org_type,
                            code: org.code.to_string(),
                            address: Some(org.address.to_string()),
                        },
                        None,
                    )
                    .await?;
                organizations += 1;
                created.id
            }
        };
        organization_ids.push((org.code, id));
    }

    for (role, employee_id, name, org_code) in STAFF {
        let organization_id = organization_ids
            .iter()
            .find(|(code, _)| *code == org_code)
            .map(|(_, id)| *id)
            .ok_or_else(|| ClinicalError::OperationFailed(format!("Seed organization {} missing", org_code)))?;
        if storage.find_staff_credentials(organization_id, employee_id).await?.is_some() {
            continue;
        }
        let hasher = Arc::clone(&digest);
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(DEMO_PASSWORD))
            .await
            .map_err(|e| ClinicalError::OperationFailed(format!("Password hashing task failed: {}", e)))??;
        storage
            .insert_staff(StaffDraft {
                organization_id,
                employee_id: employee_id.to_string(),
                name: name.to_string(),
                role,
                password_hash,
            })
            .await?;
        staff += 1;
    }

    let existing_patients = storage.list_patients().await?;
    for (unique_id, name, dob, gender, contact, blood_group) in PATIENTS {
        if existing_patients.iter().any(|p| p.unique_id == unique_id) {
            continue;
        }
        storage
            .insert_patient(
                NewPatient {
                    name: name.to_string(),
                    dob: dob.to_string(),
                    gender: gender.to_string(),
                    contact: Some(contact.to_string()),
                    blood_group: Some(blood_group.to_string()),
                },
                Some(unique_id.to_string()),
            )
            .await?;
        patients += 1;
    }

    if organizations + staff + patients == 0 {
        info!("Demo data already present, nothing to seed");
        return Ok(false);
    }
    info!(organizations, staff, patients, "Demo data seeded");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_engine::SledClinicalStorage;
    use models::medical::organization::is_protected_id;
    use security::Argon2Digest;

    #[tokio::test]
    async fn should_seed_once() {
        let storage = SledClinicalStorage::open_temporary().unwrap();
        let digest: Arc<dyn PasswordDigest> = Arc::new(Argon2Digest::with_params(8, 1, 1).unwrap());
        assert!(seed_demo_data(&storage, digest.clone()).await.unwrap());
        assert!(!seed_demo_data(&storage, digest).await.unwrap());

        let organizations = storage.list_organizations().await.unwrap();
        assert_eq!(organizations.len(), 4);
        assert!(organizations.iter().all(|org| is_protected_id(org.id)));
        assert_eq!(storage.find_organization_by_code("HQ").await.unwrap().unwrap().id, 4);
        assert_eq!(storage.list_staff(1).await.unwrap().len(), 3);
        assert_eq!(storage.list_patients().await.unwrap().len(), 2);

        let pharmacist = storage.find_staff_credentials(2, "PH001").await.unwrap().unwrap();
        assert_eq!(pharmacist.staff.role, StaffRole::Pharmacy);
        assert!(Argon2Digest::with_params(8, 1, 1)
            .unwrap()
            .verify(DEMO_PASSWORD, &pharmacist.password_hash)
            .unwrap());
    }

    #[tokio::test]
    async fn should_complete_partial_seed() {
        let storage = SledClinicalStorage::open_temporary().unwrap();
        let digest: Arc<dyn PasswordDigest> = Arc::new(Argon2Digest::with_params(8, 1, 1).unwrap());
        let (city, _) = storage
            .insert_organization(
                OrganizationDraft {
                    name: "City General Hospital".into(),
                    org_type: OrganizationType::Hospital,
                    code: "CITY".into(),
                    address: None,
                },
                None,
            )
            .await
            .unwrap();
        storage
            .insert_staff(StaffDraft {
                organization_id: city.id,
                employee_id: "DOC001".into(),
                name: "Dr. Sarah Chen".into(),
                role: StaffRole::Doctor,
                password_hash: digest.hash(DEMO_PASSWORD).unwrap(),
            })
            .await
            .unwrap();

        assert!(seed_demo_data(&storage, digest.clone()).await.unwrap());
        assert!(!seed_demo_data(&storage, digest).await.unwrap());

        let organizations = storage.list_organizations().await.unwrap();
        assert_eq!(organizations.len(), 4);
        assert_eq!(organizations.iter().filter(|org| org.code == "CITY").count(), 1);
        assert_eq!(storage.list_staff(city.id).await.unwrap().len(), 3);
        assert!(storage.find_staff_credentials(4, "SUPER001").await.unwrap().is_some());
        assert_eq!(storage.list_patients().await.unwrap().len(), 2);
    }
}
