//! Authenticated identity
//!
//! The engine never establishes sessions itself; it only asks who is signed in.

use std::sync::RwLock;

/// Exposes the current authenticated user, if any
pub trait AuthContext: Send + Sync {
    fn current_user_id(&self) -> Option<String>;
}

/// Identity that can be signed in and out at runtime
#[derive(Debug, Default)]
pub struct StaticIdentity {
    user_id: RwLock<Option<String>>,
}

impl StaticIdentity {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            user_id: RwLock::new(Some(user_id.into())),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, user_id: impl Into<String>) {
        *self.user_id.write().unwrap_or_else(|e| e.into_inner()) = Some(user_id.into());
    }

    pub fn sign_out(&self) {
        *self.user_id.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl AuthContext for StaticIdentity {
    fn current_user_id(&self) -> Option<String> {
        self.user_id
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .filter(|id| !id.trim().is_empty())
    }
}
