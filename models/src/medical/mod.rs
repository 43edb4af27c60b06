// models/src/medical/mod.rs

pub mod action;
pub mod organization;
pub mod patient;
pub mod staff;
pub mod visit;

pub use action::{
    Action, ActionStatus, ActionType, ActionUpdate, NewAction, NewTransfer, TransitionPolicy, TRANSFER_DESCRIPTION,
};
pub use organization::{NewOrganization, Organization, OrganizationType, PROTECTED_ORGANIZATION_MAX_ID};
pub use patient::{NewPatient, Patient};
pub use staff::{NewStaff, Staff, StaffRole};
pub use visit::{NewVisit, Priority, Visit, VisitPatch, Vitals};

/// Row identifier shared by every entity. Ids start at 1 and only grow.
pub type EntityId = u64;

/// Generates `as_str`, `Display` and `FromStr` for a fixed string vocabulary.
/// The strings must match the serde names of the enum.
macro_rules! vocabulary {
    ($name:ident, $field:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::errors::ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(crate::errors::ValidationError::UnknownValue {
                        field: $field,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

pub(crate) use vocabulary;
