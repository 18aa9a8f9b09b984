//! Resource storage collaborators
//!
//! The engine reads resources, ACLs and group memberships through the
//! [`ResourceLocator`] and [`GroupDirectory`] traits. Durable backends live
//! outside this crate; the in-memory stores here back tests and demos.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{AccessError, Result};
use crate::types::{Authorization, Identifier};

/// Read-only view of a stored resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource identifier
    pub identifier: Identifier,

    /// Parent container; `None` at the root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Identifier>,

    /// ACL declared directly on this resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<Identifier>,
}

impl Resource {
    /// Create a root resource with no ACL
    pub fn new(identifier: impl Into<Identifier>) -> Self {
        Self {
            identifier: identifier.into(),
            parent: None,
            acl: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<Identifier>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_acl(mut self, acl: impl Into<Identifier>) -> Self {
        self.acl = Some(acl.into());
        self
    }

    /// Whether this resource declares its own ACL
    pub fn has_acl(&self) -> bool {
        self.acl.is_some()
    }
}

/// Resource lookup (external collaborator)
///
/// Failures are repository faults and are propagated unchanged by the engine.
#[async_trait]
pub trait ResourceLocator: Send + Sync {
    /// Fetch a resource; `None` if it does not exist
    async fn get(&self, identifier: &Identifier) -> Result<Option<Resource>>;

    /// Fetch the Authorizations of an ACL
    async fn authorizations_of(&self, acl: &Identifier) -> Result<Vec<Authorization>>;

    async fn exists(&self, identifier: &Identifier) -> Result<bool> {
        Ok(self.get(identifier).await?.is_some())
    }

    async fn has_acl(&self, identifier: &Identifier) -> Result<bool> {
        Ok(self.get(identifier).await?.is_some_and(|r| r.has_acl()))
    }

    async fn parent_of(&self, identifier: &Identifier) -> Result<Option<Identifier>> {
        Ok(self.get(identifier).await?.and_then(|r| r.parent))
    }
}

/// Group membership lookup (external collaborator)
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    /// Groups `user` belongs to
    async fn groups_of(&self, user: &Identifier) -> Result<BTreeSet<Identifier>>;
}

/// In-memory resource store
pub struct InMemoryResourceStore {
    resources: Arc<RwLock<HashMap<Identifier, Resource>>>,
    acls: Arc<RwLock<HashMap<Identifier, Vec<Authorization>>>>,
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        Self {
            resources: Arc::new(RwLock::new(HashMap::new())),
            acls: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store a resource, replacing any previous version
    pub async fn put(&self, resource: Resource) {
        let mut resources = self.resources.write().await;
        resources.insert(resource.identifier.clone(), resource);
    }

    /// Store the Authorizations of an ACL
    pub async fn put_acl(
        &self,
        acl: impl Into<Identifier>,
        authorizations: Vec<Authorization>,
    ) -> Result<()> {
        for authorization in &authorizations {
            authorization.validate()?;
        }
        let mut acls = self.acls.write().await;
        acls.insert(acl.into(), authorizations);
        Ok(())
    }

    /// Remove a resource; its ACL, if any, is left in place
    pub async fn delete(&self, identifier: &Identifier) {
        let mut resources = self.resources.write().await;
        resources.remove(identifier);
    }

    pub async fn len(&self) -> usize {
        self.resources.read().await.len()
    }
}

impl Default for InMemoryResourceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceLocator for InMemoryResourceStore {
    async fn get(&self, identifier: &Identifier) -> Result<Option<Resource>> {
        let resources = self.resources.read().await;
        Ok(resources.get(identifier).cloned())
    }

    async fn authorizations_of(&self, acl: &Identifier) -> Result<Vec<Authorization>> {
        let acls = self.acls.read().await;
        acls.get(acl)
            .cloned()
            .ok_or_else(|| AccessError::NotFound(format!("ACL {}", acl)))
    }
}

/// In-memory group directory
pub struct InMemoryGroupDirectory {
    members: Arc<RwLock<HashMap<Identifier, BTreeSet<Identifier>>>>,
}

impl InMemoryGroupDirectory {
    pub fn new() -> Self {
        Self {
            members: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Record `user` as a member of `group`
    pub async fn add_member(&self, group: impl Into<Identifier>, user: impl Into<Identifier>) {
        let mut members = self.members.write().await;
        members.entry(user.into()).or_default().insert(group.into());
    }

    pub async fn remove_member(&self, group: &Identifier, user: &Identifier) {
        let mut members = self.members.write().await;
        if let Some(groups) = members.get_mut(user) {
            groups.remove(group);
        }
    }
}

impl Default for InMemoryGroupDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GroupDirectory for InMemoryGroupDirectory {
    async fn groups_of(&self, user: &Identifier) -> Result<BTreeSet<Identifier>> {
        let members = self.members.read().await;
        Ok(members.get(user).cloned().unwrap_or_default())
    }
}
