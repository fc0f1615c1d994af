use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "userrole", rename_all = "snake_case")]
pub(crate) enum UserRole {
    Student,
    Tutor,
    SuperTutor,
}

impl UserRole {
    /// Tutors and super tutors: may read every attempt and manage quiz content.
    pub(crate) fn is_staff(self) -> bool {
        matches!(self, Self::Tutor | Self::SuperTutor)
    }

    pub(crate) fn is_admin(self) -> bool {
        matches!(self, Self::SuperTutor)
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Tutor => "tutor",
            Self::SuperTutor => "super_tutor",
        }
    }
}
