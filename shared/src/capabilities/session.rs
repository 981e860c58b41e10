use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::AppKv;
use crate::event::Event;
use crate::model::{Session, UserId};
use crate::SESSION_KEY;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum SessionError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("corrupt session record: {0}")]
    Corrupt(String),
}

/// What survives an app restart.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub user_id: UserId,
    pub token: String,
}

impl std::fmt::Debug for PersistedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedSession")
            .field("user_id", &self.user_id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl From<&Session> for PersistedSession {
    fn from(session: &Session) -> Self {
        Self {
            user_id: session.user_id,
            token: session.token.expose_secret().clone(),
        }
    }
}

impl From<PersistedSession> for Session {
    fn from(persisted: PersistedSession) -> Self {
        Self {
            user_id: persisted.user_id,
            token: SecretString::new(persisted.token),
        }
    }
}

pub fn decode(bytes: Option<Vec<u8>>) -> Result<Option<PersistedSession>, SessionError> {
    bytes
        .map(|b| serde_json::from_slice(&b).map_err(|e| SessionError::Corrupt(e.to_string())))
        .transpose()
}

pub fn restore(kv: &AppKv) {
    debug!(key = SESSION_KEY, "restoring session");
    kv.get(SESSION_KEY.to_string(), |result| {
        Event::SessionRestored(
            result
                .map_err(|e| SessionError::Storage(e.to_string()))
                .and_then(decode),
        )
    });
}

pub fn persist(kv: &AppKv, session: &Session) -> Result<(), SessionError> {
    let bytes = serde_json::to_vec(&PersistedSession::from(session))
        .map_err(|e| SessionError::Corrupt(e.to_string()))?;
    kv.set(SESSION_KEY.to_string(), bytes, |result| {
        Event::SessionPersisted(result.map(|_| ()).map_err(|e| SessionError::Storage(e.to_string())))
    });
    Ok(())
}

pub fn forget(kv: &AppKv) {
    kv.delete(SESSION_KEY.to_string(), |result| {
        Event::SessionPersisted(result.map(|_| ()).map_err(|e| SessionError::Storage(e.to_string())))
    });
}
