//! Requester sessions
//!
//! A [`Session`] is created by an external authentication layer. The engine
//! only reads it; lifecycle changes (`update_expiry`, `expire`) are made by
//! the session's owner and persisted through a [`SessionStore`].

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AccessError, Result};
use crate::types::Identifier;

/// One authenticated interaction context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier
    pub identifier: Identifier,

    /// Acting principal
    pub user: Identifier,

    /// Additional identifiers (groups) the user belongs to
    #[serde(default)]
    pub groups: BTreeSet<Identifier>,

    /// Principal who delegated access to `user`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegated_by: Option<Identifier>,

    /// Creation time
    pub created: DateTime<Utc>,

    /// Expiration time; `None` never expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,

    /// Set once `expire` has been called
    #[serde(default)]
    terminated: bool,
}

impl Session {
    /// Create a non-expiring session for `user`
    pub fn new(user: impl Into<Identifier>) -> Self {
        Self {
            identifier: Identifier::new(format!("urn:uuid:{}", Uuid::new_v4())),
            user: user.into(),
            groups: BTreeSet::new(),
            delegated_by: None,
            created: Utc::now(),
            expiry: None,
            terminated: false,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<Identifier>) -> Self {
        self.identifier = identifier.into();
        self
    }

    pub fn with_group(mut self, group: impl Into<Identifier>) -> Self {
        self.groups.insert(group.into());
        self
    }

    pub fn with_groups<I, T>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Identifier>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    pub fn delegated_by(mut self, delegator: impl Into<Identifier>) -> Self {
        self.delegated_by = Some(delegator.into());
        self
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Whether the session is expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        if self.terminated {
            return true;
        }
        match self.expiry {
            Some(expiry) => expiry <= now,
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Fail with [`AccessError::SessionExpired`] if expired at `now`
    pub fn ensure_active_at(&self, now: DateTime<Utc>) -> Result<()> {
        if self.is_expired_at(now) {
            return Err(AccessError::SessionExpired {
                session: self.identifier.clone(),
                expired_at: self.expiry.unwrap_or(now),
            });
        }
        Ok(())
    }

    /// Extend the expiry by `amount` and return the new expiry
    ///
    /// A non-expiring session gets an expiry of `now + amount`. Expired
    /// sessions cannot be revived. An `amount` that overflows the calendar
    /// fails with [`AccessError::InvalidExpiry`] and leaves the expiry as is.
    pub fn update_expiry(&mut self, amount: Duration) -> Result<DateTime<Utc>> {
        let now = Utc::now();
        self.ensure_active_at(now)?;

        let base = self.expiry.unwrap_or(now);
        let expiry = base.checked_add_signed(amount).ok_or_else(|| {
            AccessError::InvalidExpiry(format!("extending {} by {} overflows", base, amount))
        })?;
        self.expiry = Some(expiry);

        debug!("Session {} expiry extended to {}", self.identifier, expiry);
        Ok(expiry)
    }

    /// Expire the session immediately; terminal
    pub fn expire(&mut self) {
        let now = Utc::now();
        self.expiry = Some(match self.expiry {
            Some(expiry) if expiry < now => expiry,
            _ => now,
        });
        self.terminated = true;

        debug!("Session {} expired", self.identifier);
    }

    /// Persist accumulated changes through `store`
    pub async fn commit(&self, store: &dyn SessionStore) -> Result<()> {
        store.commit(self).await
    }
}

/// Durable session persistence (external collaborator)
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist the session's current state
    async fn commit(&self, session: &Session) -> Result<()>;

    /// Load a previously committed session
    async fn get(&self, identifier: &Identifier) -> Result<Option<Session>>;
}

/// In-memory session store
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<Identifier, Session>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn commit(&self, session: &Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.identifier.clone(), session.clone());
        Ok(())
    }

    async fn get(&self, identifier: &Identifier) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(identifier).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_expiring_session() {
        let session = Session::new("https://example.com/alice");
        assert!(session.expiry.is_none());
        assert!(!session.is_expired());
        assert!(session.ensure_active_at(Utc::now()).is_ok());
    }

    #[test]
    fn test_update_expiry_from_none() {
        let mut session = Session::new("https://example.com/alice");
        let before = Utc::now();
        let expiry = session.update_expiry(Duration::minutes(10)).unwrap();

        assert!(expiry >= before + Duration::minutes(10));
        assert_eq!(session.expiry, Some(expiry));
    }

    #[test]
    fn test_update_expiry_extends_existing() {
        let start = Utc::now() + Duration::hours(1);
        let mut session = Session::new("https://example.com/alice").with_expiry(start);

        let expiry = session.update_expiry(Duration::minutes(30)).unwrap();
        assert_eq!(expiry, start + Duration::minutes(30));
    }

    #[test]
    fn test_update_expiry_overflow() {
        let start = Utc::now() + Duration::hours(1);
        let mut session = Session::new("https://example.com/alice").with_expiry(start);

        assert!(matches!(
            session.update_expiry(Duration::MAX),
            Err(AccessError::InvalidExpiry(_))
        ));
        assert_eq!(session.expiry, Some(start));

        let mut open = Session::new("https://example.com/bob");
        assert!(open.update_expiry(Duration::MAX).is_err());
        assert!(open.expiry.is_none());
    }

    #[test]
    fn test_expire_is_terminal() {
        let mut session = Session::new("https://example.com/alice");
        session.expire();

        assert!(session.is_expired());
        assert!(matches!(
            session.update_expiry(Duration::hours(1)),
            Err(AccessError::SessionExpired { .. })
        ));
        // Terminated regardless of the check time
        assert!(session.is_expired_at(Utc::now() - Duration::days(1)));
    }

    #[test]
    fn test_past_expiry() {
        let session = Session::new("https://example.com/alice")
            .with_expiry(Utc::now() - Duration::seconds(1));
        assert!(session.is_expired());
        assert!(session.ensure_active_at(Utc::now()).is_err());
    }

    #[tokio::test]
    async fn test_commit_to_store() {
        let store = InMemorySessionStore::new();
        let mut session = Session::new("https://example.com/alice")
            .with_identifier("urn:session:1");
        session.update_expiry(Duration::minutes(5)).unwrap();
        session.commit(&store).await.unwrap();

        let stored = store.get(&Identifier::new("urn:session:1")).await.unwrap().unwrap();
        assert_eq!(stored, session);
        assert_eq!(store.len().await, 1);
    }
}
