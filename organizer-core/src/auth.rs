//! Identity collaborator. The streaming core never needs it; history records
//! are stamped with whatever identity the application provides.

use async_trait::async_trait;

use crate::error::CoreResult;

#[async_trait]
pub trait Identity: Send + Sync {
    /// The current user's id, or `None` for an anonymous session.
    async fn current_user(&self) -> CoreResult<Option<String>>;
}

/// No signed-in user.
pub struct AnonymousIdentity;

#[async_trait]
impl Identity for AnonymousIdentity {
    async fn current_user(&self) -> CoreResult<Option<String>> {
        Ok(None)
    }
}

/// A fixed identity, handed in at construction. Useful for CLIs and tests.
pub struct StaticIdentity {
    user_id: String,
}

impl StaticIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

#[async_trait]
impl Identity for StaticIdentity {
    async fn current_user(&self) -> CoreResult<Option<String>> {
        Ok(Some(self.user_id.clone()))
    }
}
