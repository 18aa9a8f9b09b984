//! Access control service
//!
//! Orchestrates ACL resolution and Authorization matching to answer mode
//! checks, with optional audit recording.

pub mod audit;
pub mod decision;

pub use audit::{AuditEntry, AuditSink, AuditStats, InMemoryAuditLog, TracingAuditSink};
pub use decision::{AccessDecision, DecisionReason};

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::AccessConfig;
use crate::error::Result;
use crate::matcher::{AuthorizationMatcher, IdentitySet};
use crate::resolver::{AclResolver, Resolution};
use crate::session::Session;
use crate::store::{GroupDirectory, Resource, ResourceLocator};
use crate::types::{AccessMode, Authorization, Identifier, ModeSet};

/// Everything one decision needs, gathered in a single traversal
struct Evaluation {
    resolution: Resolution,
    authorizations: Vec<Authorization>,
    identities: IdentitySet,
}

/// WebAC decision engine
///
/// # Architecture
///
/// ```text
/// Session check → AclResolver → authorizations_of → AuthorizationMatcher → Decision
///                      ↓                                                       ↓
///               [bounded walk]                                            [Audit sink]
/// ```
///
/// The service holds no mutable state; share it across tasks with `Arc`.
pub struct AccessControlService {
    locator: Arc<dyn ResourceLocator>,
    resolver: AclResolver,
    matcher: AuthorizationMatcher,
    audit: Option<Arc<dyn AuditSink>>,
    config: AccessConfig,
}

impl AccessControlService {
    /// Create a service that trusts session group claims
    pub fn new(config: AccessConfig, locator: Arc<dyn ResourceLocator>) -> Result<Self> {
        Self::build(config, locator, None)
    }

    /// Create a service that resolves group membership through `directory`
    pub fn with_directory(
        config: AccessConfig,
        locator: Arc<dyn ResourceLocator>,
        directory: Arc<dyn GroupDirectory>,
    ) -> Result<Self> {
        Self::build(config, locator, Some(directory))
    }

    fn build(
        config: AccessConfig,
        locator: Arc<dyn ResourceLocator>,
        directory: Option<Arc<dyn GroupDirectory>>,
    ) -> Result<Self> {
        config.validate()?;

        let resolver = AclResolver::with_max_depth(Arc::clone(&locator), config.max_depth);
        let matcher = AuthorizationMatcher::with_directory(&config, directory)?;

        info!(
            "AccessControlService initialized with max_depth={}, group_membership={:?}, audit={}",
            config.max_depth, config.group_membership, config.audit
        );

        Ok(Self {
            locator,
            resolver,
            matcher,
            audit: None,
            config,
        })
    }

    /// Attach an audit sink; used only when `config.audit` is set
    pub fn with_audit(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    pub async fn can_read(&self, session: &Session, identifier: &Identifier) -> Result<bool> {
        self.check(session, identifier, AccessMode::Read).await
    }

    pub async fn can_write(&self, session: &Session, identifier: &Identifier) -> Result<bool> {
        self.check(session, identifier, AccessMode::Write).await
    }

    pub async fn can_append(&self, session: &Session, identifier: &Identifier) -> Result<bool> {
        self.check(session, identifier, AccessMode::Append).await
    }

    /// Whether the session may modify the ACL governing `identifier`
    pub async fn can_control(&self, session: &Session, identifier: &Identifier) -> Result<bool> {
        self.check(session, identifier, AccessMode::Control).await
    }

    /// Whether `mode` is granted to the session on `identifier`
    pub async fn check(
        &self,
        session: &Session,
        identifier: &Identifier,
        mode: AccessMode,
    ) -> Result<bool> {
        Ok(self.decide(session, identifier, mode).await?.allowed)
    }

    /// Whether any granted mode satisfies `predicate`
    ///
    /// Missing ACLs and missing resources yield `false`. Expired sessions
    /// are rejected before any lookup.
    pub async fn any_match<P>(
        &self,
        session: &Session,
        identifier: &Identifier,
        predicate: P,
    ) -> Result<bool>
    where
        P: Fn(AccessMode) -> bool + Send,
    {
        let evaluation = self.evaluate(session, identifier).await?;
        Ok(self.matcher.any_match(
            &evaluation.authorizations,
            &evaluation.identities,
            predicate,
        ))
    }

    /// Decide one mode, recording the outcome to the audit sink
    pub async fn decide(
        &self,
        session: &Session,
        identifier: &Identifier,
        mode: AccessMode,
    ) -> Result<AccessDecision> {
        let start = Instant::now();
        let evaluation = self.evaluate(session, identifier).await?;

        let reason = match evaluation.resolution.acl() {
            None => DecisionReason::NoAcl,
            Some(_) => match self.matcher.find_grant(
                &evaluation.authorizations,
                &evaluation.identities,
                |m| m == mode,
            ) {
                Some(authorization) => DecisionReason::Granted {
                    authorization: authorization.identifier.clone(),
                },
                None => DecisionReason::NoMatchingAuthorization,
            },
        };

        let decision = AccessDecision::new(
            mode,
            identifier.clone(),
            session.identifier.clone(),
            session.user.clone(),
            evaluation.resolution.acl().cloned(),
            reason,
        );

        info!(
            "Decision: {} {} on {} for {} ({})",
            if decision.allowed { "ALLOW" } else { "DENY" },
            mode,
            identifier,
            session.user,
            decision.reason.describe()
        );

        if self.config.audit {
            if let Some(sink) = &self.audit {
                let entry = AuditEntry::from_decision(
                    &decision,
                    evaluation.resolution.visited,
                    start.elapsed(),
                );
                sink.record(&entry).await?;
            }
        }

        Ok(decision)
    }

    /// All four modes from one resolution and one Authorization fetch
    pub async fn modes_for(&self, session: &Session, identifier: &Identifier) -> Result<ModeSet> {
        let evaluation = self.evaluate(session, identifier).await?;
        let modes = ModeSet::from_fn(|mode| {
            self.matcher.any_match(
                &evaluation.authorizations,
                &evaluation.identities,
                |m| m == mode,
            )
        });

        debug!("Modes for {} on {}: {:?}", session.user, identifier, modes);
        Ok(modes)
    }

    /// Identifier of the ACL governing `identifier`
    pub async fn find_acl_for(&self, identifier: &Identifier) -> Result<Option<Identifier>> {
        self.resolver.find_acl_for(identifier).await
    }

    /// Nearest resource, starting at `identifier`, that declares an ACL
    pub async fn find_ancestor_with_access_control(
        &self,
        identifier: &Identifier,
    ) -> Result<Option<Resource>> {
        self.resolver.find_ancestor_with_access_control(identifier).await
    }

    /// Authorizations of the ACL governing `identifier`; empty without one
    pub async fn authorizations_for(&self, identifier: &Identifier) -> Result<Vec<Authorization>> {
        match self.resolver.find_acl_for(identifier).await? {
            Some(acl) => self.locator.authorizations_of(&acl).await,
            None => Ok(Vec::new()),
        }
    }

    async fn evaluate(&self, session: &Session, identifier: &Identifier) -> Result<Evaluation> {
        if let Err(e) = session.ensure_active_at(Utc::now()) {
            warn!("Rejected expired session {} for {}", session.identifier, identifier);
            return Err(e);
        }

        let resolution = self.resolver.resolve(identifier).await?;
        let authorizations = match resolution.acl() {
            Some(acl) => self.locator.authorizations_of(acl).await?,
            None => {
                debug!("No ACL governs {}", identifier);
                Vec::new()
            }
        };
        let identities = self.matcher.identities(session).await?;

        Ok(Evaluation {
            resolution,
            authorizations,
            identities,
        })
    }
}
