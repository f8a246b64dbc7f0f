//! In-process session provider.
//!
//! Login, logout, and session issuance live in the session service; this
//! provider simply reports whichever user the host application installed.

use async_trait::async_trait;
use tokio::sync::RwLock;

use notekeep_core::{Result, SessionProvider, User};

/// Session holding at most one signed-in user.
#[derive(Debug, Default)]
pub struct StaticSession {
    user: RwLock<Option<User>>,
}

impl StaticSession {
    pub fn signed_in(user: User) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub async fn sign_in(&self, user: User) {
        *self.user.write().await = Some(user);
    }

    pub async fn sign_out(&self) {
        *self.user.write().await = None;
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn current_user(&self) -> Result<Option<User>> {
        Ok(self.user.read().await.clone())
    }
}
