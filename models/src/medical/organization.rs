// models/src/medical/organization.rs

use serde::{Deserialize, Serialize};

use super::{vocabulary, EntityId};
use crate::errors::{require_text, ValidationResult};

/// Seed organizations (ids 1 through 4) can never be deleted.
pub const PROTECTED_ORGANIZATION_MAX_ID: EntityId = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationType {
    Hospital,
    Pharmacy,
    Lab,
    Platform,
}

vocabulary!(OrganizationType, "organization type", {
    Hospital => "hospital",
    Pharmacy => "pharmacy",
    Lab => "lab",
    Platform => "platform",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: EntityId,
    pub name: String,
    #[serde(rename = "type")]
    pub org_type: OrganizationType,
    /// Login key, unique across the registry.
    pub code: String,
    pub address: Option<String>,
}

pub fn is_protected_id(id: EntityId) -> bool {
    id <= PROTECTED_ORGANIZATION_MAX_ID
}

/// Registration request: an organization together with its first admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrganization {
    pub name: String,
    #[serde(rename = "type")]
    pub org_type: OrganizationType,
    pub code: String,
    #[serde(default)]
    pub address: Option<String>,
    pub admin_employee_id: String,
    pub admin_password: String,
}

impl NewOrganization {
    /// Trims the name, trims and upper-cases the code, trims the admin id.
    pub fn normalized(mut self) -> ValidationResult<Self> {
        self.name = self.name.trim().to_string();
        self.code = self.code.trim().to_uppercase();
        self.admin_employee_id = self.admin_employee_id.trim().to_string();
        require_text("name", &self.name)?;
        require_text("code", &self.code)?;
        require_text("adminEmployeeId", &self.admin_employee_id)?;
        require_text("adminPassword", &self.admin_password)?;
        Ok(self)
    }

    pub fn admin_name(&self) -> String {
        format!("{} Admin", self.name)
    }
}
