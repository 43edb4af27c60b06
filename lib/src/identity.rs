// lib/src/identity.rs

use std::sync::Arc;

use models::errors::{ClinicalError, ClinicalResult};
use models::medical::organization::is_protected_id;
use models::medical::{EntityId, NewOrganization, NewStaff, Organization, OrganizationType, Staff, StaffRole};
use security::PasswordDigest;
use tracing::{debug, info, warn};

use crate::storage_engine::{ClinicalStorageEngine, OrganizationDraft, StaffDraft};

/// Organizations, staff, and login.
#[derive(Clone)]
pub struct IdentityRegistry {
    storage: Arc<dyn ClinicalStorageEngine>,
    digest: Arc<dyn PasswordDigest>,
}

impl IdentityRegistry {
    pub fn new(storage: Arc<dyn ClinicalStorageEngine>, digest: Arc<dyn PasswordDigest>) -> Self {
        IdentityRegistry { storage, digest }
    }

    // Argon2 is deliberately slow; keep it off the async workers.
    async fn hash_password(&self, password: String) -> ClinicalResult<String> {
        let digest = Arc::clone(&self.digest);
        let hashed = tokio::task::spawn_blocking(move || digest.hash(&password))
            .await
            .map_err(|e| ClinicalError::OperationFailed(format!("Password hashing task failed: {}", e)))??;
        Ok(hashed)
    }

    async fn verify_password(&self, password: String, hash: String) -> ClinicalResult<bool> {
        let digest = Arc::clone(&self.digest);
        let matched = tokio::task::spawn_blocking(move || digest.verify(&password, &hash))
            .await
            .map_err(|e| ClinicalError::OperationFailed(format!("Password check task failed: {}", e)))??;
        Ok(matched)
    }

    /// Resolves `(orgCode, employeeId, password)` to a staff member and their
    /// organization. The code must match exactly after trimming.
    pub async fn authenticate(
        &self,
        org_code: &str,
        employee_id: &str,
        password: &str,
    ) -> ClinicalResult<(Staff, Organization)> {
        let org_code = org_code.trim();
        let employee_id = employee_id.trim();

        let Some(organization) = self.storage.find_organization_by_code(org_code).await? else {
            debug!(org_code, "Login rejected: unknown organization code");
            return Err(ClinicalError::InvalidOrganization);
        };
        let Some(credentials) = self.storage.find_staff_credentials(organization.id, employee_id).await? else {
            debug!(org_code, employee_id, "Login rejected: unknown employee");
            return Err(ClinicalError::InvalidCredentials);
        };
        if !self.verify_password(password.to_string(), credentials.password_hash).await? {
            warn!(org_code, employee_id, "Login rejected: wrong password");
            return Err(ClinicalError::InvalidCredentials);
        }
        info!(staff_id = credentials.staff.id, organization_id = organization.id, "Staff logged in");
        Ok((credentials.staff, organization))
    }

    /// Creates an organization and its first admin atomically. The admin is
    /// named after the organization.
    pub async fn register_organization(&self, request: NewOrganization) -> ClinicalResult<(Organization, Staff)> {
        let request = request.normalized()?;
        let password_hash = self.hash_password(request.admin_password.clone()).await?;
        let admin = StaffDraft {
            organization_id: 0, // assigned with the organization
            employee_id: request.admin_employee_id.clone(),
            name: request.admin_name(),
            role: StaffRole::Admin,
            password_hash,
        };
        let draft = OrganizationDraft {
            name: request.name,
            org_type: request.org_type,
            code: request.code,
            address: request.address,
        };
        let (organization, admin) = self.storage.insert_organization(draft, Some(admin)).await?;
        let admin = admin.ok_or_else(|| ClinicalError::OperationFailed("Admin account was not created".into()))?;
        Ok((organization, admin))
    }

    pub async fn create_staff(&self, request: NewStaff) -> ClinicalResult<Staff> {
        let request = request.normalized()?;
        let password_hash = self.hash_password(request.password).await?;
        self.storage
            .insert_staff(StaffDraft {
                organization_id: request.organization_id,
                employee_id: request.employee_id,
                name: request.name,
                role: request.role,
                password_hash,
            })
            .await
    }

    /// Seed organizations are protected; everything else is removed together
    /// with its staff.
    pub async fn delete_organization(&self, id: EntityId) -> ClinicalResult<()> {
        if is_protected_id(id) {
            warn!(organization_id = id, "Refused to delete protected organization");
            return Err(ClinicalError::Forbidden(format!("Organization {} is protected", id)));
        }
        self.storage.delete_organization(id).await?;
        Ok(())
    }

    pub async fn get_organization(&self, id: EntityId) -> ClinicalResult<Organization> {
        self.storage
            .get_organization(id)
            .await?
            .ok_or_else(|| ClinicalError::not_found("organization", id))
    }

    pub async fn list_organizations(&self) -> ClinicalResult<Vec<Organization>> {
        self.storage.list_organizations().await
    }

    pub async fn list_hospitals(&self) -> ClinicalResult<Vec<Organization>> {
        let mut organizations = self.storage.list_organizations().await?;
        organizations.retain(|org| org.org_type == OrganizationType::Hospital);
        Ok(organizations)
    }

    /// Staff of one organization, ordered by role name descending.
    pub async fn list_staff(&self, organization_id: EntityId) -> ClinicalResult<Vec<Staff>> {
        let mut staff = self.storage.list_staff(organization_id).await?;
        staff.sort_by(|a, b| b.role.as_str().cmp(a.role.as_str()));
        Ok(staff)
    }

    pub async fn get_staff(&self, id: EntityId) -> ClinicalResult<Staff> {
        self.storage.get_staff(id).await?.ok_or_else(|| ClinicalError::not_found("staff", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_engine::SledClinicalStorage;
    use models::errors::ValidationError;
    use security::Argon2Digest;

    fn registry() -> IdentityRegistry {
        let storage = Arc::new(SledClinicalStorage::open_temporary().unwrap());
        IdentityRegistry::new(storage, Arc::new(Argon2Digest::with_params(8, 1, 1).unwrap()))
    }

    fn registration(code: &str, admin: &str) -> NewOrganization {
        NewOrganization {
            name: "Riverside Clinic".into(),
            org_type: OrganizationType::Hospital,
            code: code.into(),
            address: Some("1 River Rd".into()),
            admin_employee_id: admin.into(),
            admin_password: "s3cret".into(),
        }
    }

    fn staff(organization_id: EntityId, employee_id: &str, role: StaffRole) -> NewStaff {
        NewStaff {
            organization_id,
            employee_id: employee_id.into(),
            name: format!("Staff {}", employee_id),
            role,
            password: "password".into(),
        }
    }

    #[tokio::test]
    async fn should_register_and_login_admin() {
        let identity = registry();
        let (org, admin) = identity.register_organization(registration(" rvs ", "ADM1")).await.unwrap();
        assert_eq!(org.code, "RVS");
        assert_eq!(admin.role, StaffRole::Admin);
        assert_eq!(admin.name, "Riverside Clinic Admin");

        let (who, at) = identity.authenticate(" RVS ", "ADM1 ", "s3cret").await.unwrap();
        assert_eq!(who.id, admin.id);
        assert_eq!(at.id, org.id);
    }

    #[tokio::test]
    async fn should_not_distinguish_unknown_employee_from_wrong_password() {
        let identity = registry();
        identity.register_organization(registration("RVS", "ADM1")).await.unwrap();
        let wrong_password = identity.authenticate("RVS", "ADM1", "nope").await.unwrap_err();
        let unknown_employee = identity.authenticate("RVS", "GHOST", "s3cret").await.unwrap_err();
        assert!(matches!(wrong_password, ClinicalError::InvalidCredentials));
        assert!(matches!(unknown_employee, ClinicalError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_employee.to_string());
    }

    #[tokio::test]
    async fn should_reject_unknown_organization_code() {
        let identity = registry();
        identity.register_organization(registration("RVS", "ADM1")).await.unwrap();
        let err = identity.authenticate("rvs", "ADM1", "s3cret").await.unwrap_err();
        assert!(matches!(err, ClinicalError::InvalidOrganization));
    }

    #[tokio::test]
    async fn should_reject_duplicate_code_and_employee() {
        let identity = registry();
        let (org, _) = identity.register_organization(registration("RVS", "ADM1")).await.unwrap();
        let err = identity.register_organization(registration("rvs", "ADM2")).await.unwrap_err();
        assert!(matches!(err, ClinicalError::Conflict(_)));

        identity.create_staff(staff(org.id, "DOC1", StaffRole::Doctor)).await.unwrap();
        let err = identity.create_staff(staff(org.id, "DOC1", StaffRole::Nurse)).await.unwrap_err();
        assert!(matches!(err, ClinicalError::Conflict(_)));
    }

    #[tokio::test]
    async fn should_reject_blank_staff_fields() {
        let identity = registry();
        let (org, _) = identity.register_organization(registration("RVS", "ADM1")).await.unwrap();
        let err = identity.create_staff(staff(org.id, "  ", StaffRole::Doctor)).await.unwrap_err();
        assert!(matches!(err, ClinicalError::Validation(ValidationError::EmptyField("employeeId"))));
    }

    #[tokio::test]
    async fn should_protect_seed_organizations() {
        let identity = registry();
        for code in ["A", "B", "C", "D", "E"] {
            identity.register_organization(registration(code, "ADM")).await.unwrap();
        }
        let err = identity.delete_organization(4).await.unwrap_err();
        assert!(matches!(err, ClinicalError::Forbidden(_)));
        assert_eq!(identity.list_organizations().await.unwrap().len(), 5);
        assert_eq!(identity.list_staff(4).await.unwrap().len(), 1);

        identity.delete_organization(5).await.unwrap();
        assert!(identity.list_staff(5).await.unwrap().is_empty());
        let err = identity.authenticate("E", "ADM", "s3cret").await.unwrap_err();
        assert!(matches!(err, ClinicalError::InvalidOrganization));
        let err = identity.delete_organization(5).await.unwrap_err();
        assert!(matches!(err, ClinicalError::NotFound { .. }));
    }

    #[tokio::test]
    async fn should_order_staff_by_role_descending() {
        let identity = registry();
        let (org, _) = identity.register_organization(registration("RVS", "ADM1")).await.unwrap();
        identity.create_staff(staff(org.id, "DOC1", StaffRole::Doctor)).await.unwrap();
        identity.create_staff(staff(org.id, "NUR1", StaffRole::Nurse)).await.unwrap();
        let roles: Vec<StaffRole> = identity.list_staff(org.id).await.unwrap().iter().map(|s| s.role).collect();
        assert_eq!(roles, vec![StaffRole::Nurse, StaffRole::Doctor, StaffRole::Admin]);
    }

    #[tokio::test]
    async fn should_list_only_hospitals() {
        let identity = registry();
        identity.register_organization(registration("H1", "ADM")).await.unwrap();
        let mut lab = registration("L1", "ADM");
        lab.org_type = OrganizationType::Lab;
        identity.register_organization(lab).await.unwrap();
        let hospitals = identity.list_hospitals().await.unwrap();
        assert_eq!(hospitals.len(), 1);
        assert_eq!(hospitals[0].code, "H1");
    }
}
