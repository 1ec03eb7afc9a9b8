use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use shared::domain::UserProfile;
use storage::SessionStorage;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: UserProfile,
}

/// Durable home of the signed-in session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<Session>>;
    async fn save(&self, session: &Session) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

#[async_trait]
impl SessionStore for SessionStorage {
    async fn load(&self) -> Result<Option<Session>> {
        let Some(stored) = self.load_session().await? else {
            return Ok(None);
        };
        match serde_json::from_str::<UserProfile>(&stored.user_json) {
            Ok(user) => Ok(Some(Session {
                token: stored.token,
                user,
            })),
            Err(err) => {
                warn!("session: discarding unreadable stored user: {err}");
                self.clear_session().await?;
                Ok(None)
            }
        }
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let user_json = serde_json::to_string(&session.user)?;
        self.save_session(&session.token, &user_json).await
    }

    async fn clear(&self) -> Result<()> {
        self.clear_session().await
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            inner: Mutex::new(Some(session)),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<Session>> {
        Ok(self.inner.lock().await.clone())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        *self.inner.lock().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.inner.lock().await = None;
        Ok(())
    }
}

/// In-memory view of the current session, written through to its store.
pub struct SessionState {
    store: Arc<dyn SessionStore>,
    current: RwLock<Option<Session>>,
}

impl SessionState {
    pub fn new(store: Arc<dyn SessionStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            current: RwLock::new(None),
        })
    }

    /// Loads whatever the store kept from a previous run.
    pub async fn restore(&self) -> Result<Option<Session>> {
        let restored = self.store.load().await?;
        if let Some(session) = &restored {
            info!("session: restored signed-in user {}", session.user.email);
        }
        *self.current.write().await = restored.clone();
        Ok(restored)
    }

    pub async fn sign_in(&self, session: Session) -> Result<()> {
        self.store.save(&session).await?;
        *self.current.write().await = Some(session);
        Ok(())
    }

    /// Replaces the stored user, keeping the token.
    pub async fn update_user(&self, user: UserProfile) -> Result<()> {
        let mut guard = self.current.write().await;
        let Some(current) = guard.as_ref() else {
            return Ok(());
        };
        let updated = Session {
            token: current.token.clone(),
            user,
        };
        self.store.save(&updated).await?;
        *guard = Some(updated);
        Ok(())
    }

    pub async fn sign_out(&self) -> Result<()> {
        *self.current.write().await = None;
        self.store.clear().await
    }

    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|session| session.token.clone())
    }

    pub async fn is_logged_in(&self) -> bool {
        self.current.read().await.is_some()
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
