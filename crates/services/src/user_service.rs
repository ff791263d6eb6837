use std::sync::Arc;

use storage::repository::UserRepository;
use vocab_core::model::UserId;

use crate::Clock;
use crate::error::UserError;

/// Create-if-absent user bookkeeping. Every user-scoped write needs an id
/// issued here.
#[derive(Clone)]
pub struct UserService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
}

impl UserService {
    #[must_use]
    pub fn new(clock: Clock, users: Arc<dyn UserRepository>) -> Self {
        Self { clock, users }
    }

    /// Returns the id for `display_name`, creating the user on first sight.
    ///
    /// # Errors
    ///
    /// Returns `UserError::EmptyName` for a blank name.
    /// Returns `UserError::Storage` if persistence fails.
    pub async fn ensure_user(&self, display_name: &str) -> Result<UserId, UserError> {
        let name = display_name.trim();
        if name.is_empty() {
            return Err(UserError::EmptyName);
        }
        Ok(self.users.ensure_user(name, self.clock.now()).await?)
    }

    /// Deletes the user with everything they own. False when the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns `UserError::Storage` if persistence fails.
    pub async fn delete_user(&self, user: UserId) -> Result<bool, UserError> {
        let removed = self.users.delete_user(user).await?;
        if removed {
            tracing::info!(%user, "user removed");
        }
        Ok(removed)
    }
}
