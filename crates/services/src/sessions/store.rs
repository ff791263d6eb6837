use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use vocab_core::model::UserId;

use crate::error::SessionError;
use super::quiz::QuizSession;

/// Holds at most one ephemeral quiz per user.
pub trait SessionStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `SessionError::Store` if the backend is unavailable.
    fn load(&self, user: UserId) -> Result<Option<QuizSession>, SessionError>;

    /// Stores `session`, replacing whatever the user had.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Store` if the backend is unavailable.
    fn save(&self, session: QuizSession) -> Result<(), SessionError>;

    /// # Errors
    ///
    /// Returns `SessionError::Store` if the backend is unavailable.
    fn take(&self, user: UserId) -> Result<Option<QuizSession>, SessionError>;
}

/// Process-local store; the last writer wins.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<UserId, QuizSession>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<UserId, QuizSession>>, SessionError> {
        self.sessions
            .lock()
            .map_err(|e| SessionError::Store(e.to_string()))
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, user: UserId) -> Result<Option<QuizSession>, SessionError> {
        Ok(self.lock()?.get(&user).cloned())
    }

    fn save(&self, session: QuizSession) -> Result<(), SessionError> {
        self.lock()?.insert(session.user(), session);
        Ok(())
    }

    fn take(&self, user: UserId) -> Result<Option<QuizSession>, SessionError> {
        Ok(self.lock()?.remove(&user))
    }
}
