//! Who is using the client, passed explicitly instead of held in globals.

use quiz_core::model::Identity;

use crate::error::QuizError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserRole {
    #[default]
    Student,
    Teacher,
}

/// A navigation destination offered to a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavItem {
    pub label: &'static str,
    pub path: &'static str,
}

const STUDENT_NAV: [NavItem; 4] = [
    NavItem { label: "Home", path: "/" },
    NavItem { label: "Quiz", path: "/quiz" },
    NavItem { label: "Leaderboard", path: "/leaderboard" },
    NavItem { label: "Settings", path: "/settings" },
];

const TEACHER_NAV: [NavItem; 3] = [
    NavItem { label: "Dashboard", path: "/teacher-dashboard" },
    NavItem { label: "Students", path: "/student-management" },
    NavItem { label: "Assignments", path: "/assignment-management" },
];

impl UserRole {
    #[must_use]
    pub fn nav_items(self) -> &'static [NavItem] {
        match self {
            Self::Student => &STUDENT_NAV,
            Self::Teacher => &TEACHER_NAV,
        }
    }
}

/// Signed-in identity (if any) and role, built at the composition root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    identity: Option<Identity>,
    role: UserRole,
}

impl SessionContext {
    #[must_use]
    pub fn signed_in(identity: Identity, role: UserRole) -> Self {
        Self {
            identity: Some(identity),
            role,
        }
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn role(&self) -> UserRole {
        self.role
    }

    /// # Errors
    ///
    /// Returns `QuizError::AuthRequired` when nobody is signed in.
    pub fn require_identity(&self) -> Result<&Identity, QuizError> {
        self.identity.as_ref().ok_or(QuizError::AuthRequired)
    }
}
