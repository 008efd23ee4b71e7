//! Identity provider consumed by the reservation workflow.
//!
//! The workflow only reads the current user's display name, for attributing
//! a reserved room and for the optional sign-in gate.

use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock};

/// The signed-in guest
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestIdentity {
    /// Opaque user id
    pub user_id: String,
    /// Name shown in the UI
    pub display_name: String,
}

impl GuestIdentity {
    /// Creates an identity
    #[must_use]
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Source of the current user
pub trait IdentityProvider: Send + Sync {
    /// The signed-in guest, if any
    fn current_user(&self) -> Option<GuestIdentity>;

    /// End the current session
    fn sign_out(&self);
}

/// In-memory identity provider
#[derive(Debug, Default)]
pub struct StaticIdentity {
    user: RwLock<Option<GuestIdentity>>,
}

impl StaticIdentity {
    /// Nobody signed in
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// `user` already signed in
    #[must_use]
    pub fn signed_in(user: GuestIdentity) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    /// Replace the current user
    pub fn sign_in(&self, user: GuestIdentity) {
        tracing::info!(user_id = %user.user_id, "Guest signed in");
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user);
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<GuestIdentity> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn sign_out(&self) {
        if let Some(user) = self.user.write().unwrap_or_else(PoisonError::into_inner).take() {
            tracing::info!(user_id = %user.user_id, "Guest signed out");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_and_out() {
        let identity = StaticIdentity::anonymous();
        assert_eq!(identity.current_user(), None);

        identity.sign_in(GuestIdentity::new("u-1", "Abebe"));
        assert_eq!(
            identity.current_user().map(|user| user.display_name),
            Some("Abebe".to_string())
        );

        identity.sign_out();
        identity.sign_out();
        assert_eq!(identity.current_user(), None);
    }
}
