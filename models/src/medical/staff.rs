// models/src/medical/staff.rs

use serde::{Deserialize, Serialize};

use super::{vocabulary, EntityId};
use crate::errors::{require_text, ValidationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Doctor,
    Nurse,
    Pharmacy,
    Diagnostic,
    Admin,
    SuperAdmin,
}

vocabulary!(StaffRole, "role", {
    Doctor => "doctor",
    Nurse => "nurse",
    Pharmacy => "pharmacy",
    Diagnostic => "diagnostic",
    Admin => "admin",
    SuperAdmin => "super_admin",
});

/// A staff member as exposed outside the persistence layer. The password
/// hash never leaves storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: EntityId,
    pub organization_id: EntityId,
    /// Unique within the organization only.
    pub employee_id: String,
    pub name: String,
    pub role: StaffRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStaff {
    pub organization_id: EntityId,
    pub employee_id: String,
    pub name: String,
    pub role: StaffRole,
    pub password: String,
}

impl NewStaff {
    pub fn normalized(mut self) -> ValidationResult<Self> {
        self.employee_id = self.employee_id.trim().to_string();
        self.name = self.name.trim().to_string();
        require_text("employeeId", &self.employee_id)?;
        require_text("name", &self.name)?;
        require_text("password", &self.password)?;
        Ok(self)
    }
}
