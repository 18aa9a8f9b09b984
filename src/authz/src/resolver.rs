//! ACL resolution over the resource hierarchy
//!
//! Walks from a resource towards the root until it finds a resource that
//! declares an ACL. The walk is an explicit loop bounded by a maximum depth
//! and guarded by a visited set; cyclic or over-deep hierarchies are errors.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{AccessError, Result};
use crate::store::{Resource, ResourceLocator};
use crate::types::Identifier;

/// Default walk bound
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Result of one ancestor walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Resource that declares the effective ACL, if any
    pub resource: Option<Resource>,
    /// Identifiers visited, starting resource first
    pub visited: Vec<Identifier>,
}

impl Resolution {
    /// The effective ACL identifier
    pub fn acl(&self) -> Option<&Identifier> {
        self.resource.as_ref().and_then(|r| r.acl.as_ref())
    }
}

/// Finds the effective ACL for a resource
///
/// Holds no state besides its collaborator and bound; safe to share across
/// tasks.
#[derive(Clone)]
pub struct AclResolver {
    locator: Arc<dyn ResourceLocator>,
    max_depth: usize,
}

impl AclResolver {
    pub fn new(locator: Arc<dyn ResourceLocator>) -> Self {
        Self::with_max_depth(locator, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(locator: Arc<dyn ResourceLocator>, max_depth: usize) -> Self {
        Self { locator, max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Identifier of the ACL governing `identifier`
    ///
    /// `None` when no resource from `identifier` up to the root declares an
    /// ACL, or when `identifier` does not exist.
    pub async fn find_acl_for(&self, identifier: &Identifier) -> Result<Option<Identifier>> {
        let resolution = self.resolve(identifier).await?;
        Ok(resolution.acl().cloned())
    }

    /// The nearest resource, starting at `identifier` itself, that declares an ACL
    pub async fn find_ancestor_with_access_control(
        &self,
        identifier: &Identifier,
    ) -> Result<Option<Resource>> {
        Ok(self.resolve(identifier).await?.resource)
    }

    /// Identifiers walked from `identifier` to the declaring resource or root
    pub async fn ancestry(&self, identifier: &Identifier) -> Result<Vec<Identifier>> {
        Ok(self.resolve(identifier).await?.visited)
    }

    /// Run the bounded ancestor walk
    pub async fn resolve(&self, identifier: &Identifier) -> Result<Resolution> {
        let mut visited = Vec::new();
        let mut seen = HashSet::new();
        let mut current = identifier.clone();

        while visited.len() < self.max_depth {
            if !seen.insert(current.clone()) {
                warn!("Cycle in resource hierarchy at {} (from {})", current, identifier);
                return Err(AccessError::HierarchyCycle(current));
            }
            visited.push(current.clone());

            let Some(resource) = self.locator.get(&current).await? else {
                debug!("{} does not exist, no ACL for {}", current, identifier);
                return Ok(Resolution { resource: None, visited });
            };

            if resource.has_acl() {
                debug!(
                    "ACL for {} declared on {} ({} levels)",
                    identifier,
                    resource.identifier,
                    visited.len()
                );
                return Ok(Resolution { resource: Some(resource), visited });
            }

            match resource.parent {
                Some(parent) => current = parent,
                None => {
                    debug!("Reached root {} without an ACL for {}", current, identifier);
                    return Ok(Resolution { resource: None, visited });
                }
            }
        }

        warn!(
            "Resource hierarchy above {} exceeds {} levels",
            identifier, self.max_depth
        );
        Err(AccessError::HierarchyTooDeep {
            identifier: identifier.clone(),
            max_depth: self.max_depth,
        })
    }
}
