use serde::{Deserialize, Serialize};

use crate::model::ids::UserId;

/// The signed-in user as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
}

impl Identity {
    #[must_use]
    pub fn new(user_id: UserId, email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
            name: name.into(),
        }
    }

    /// Name to show on leaderboards, falling back to the email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_email() {
        let user = UserId::new("u1").unwrap();
        assert_eq!(Identity::new(user.clone(), "u1@example.com", "Uma").display_name(), "Uma");
        assert_eq!(
            Identity::new(user, "u1@example.com", "  ").display_name(),
            "u1@example.com"
        );
    }
}
