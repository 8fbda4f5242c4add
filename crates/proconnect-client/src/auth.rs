use std::sync::RwLock;

use proconnect_shared::UserId;

use crate::error::{ClientError, Result};

pub trait AuthProvider: Send + Sync {
    /// The signed-in user, if any.
    fn current_user_id(&self) -> Option<UserId>;
}

/// An [`AuthProvider`] whose user is set by the embedder (or by tests).
#[derive(Debug, Default)]
pub struct StaticAuth {
    user: RwLock<Option<UserId>>,
}

impl StaticAuth {
    pub fn signed_in(user: impl Into<UserId>) -> Self {
        Self {
            user: RwLock::new(Some(user.into())),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, user: impl Into<UserId>) {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = Some(user.into());
    }

    pub fn sign_out(&self) {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl AuthProvider for StaticAuth {
    fn current_user_id(&self) -> Option<UserId> {
        self.user.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// The signed-in user, or [`ClientError::NotAuthenticated`].
pub fn require_user(auth: &dyn AuthProvider) -> Result<UserId> {
    auth.current_user_id()
        .filter(|id| !id.as_str().is_empty())
        .ok_or(ClientError::NotAuthenticated)
}
