//! Authorization matching
//!
//! Tests ACL rules against a session's identity set. Matching is a pure
//! disjunction: any single granting rule suffices, and there are no deny
//! rules.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::config::{AccessConfig, GroupMembership};
use crate::error::{AccessError, Result};
use crate::session::Session;
use crate::store::GroupDirectory;
use crate::types::{AccessMode, Authorization, Identifier};

/// Effective identities of a session: `{user} ∪ groups ∪ {delegated_by}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentitySet {
    pub user: Identifier,
    pub groups: BTreeSet<Identifier>,
    pub delegated_by: Option<Identifier>,
    /// Whether the user is someone other than the anonymous agent
    pub authenticated: bool,
}

impl IdentitySet {
    pub fn contains(&self, identifier: &Identifier) -> bool {
        &self.user == identifier
            || self.groups.contains(identifier)
            || self.delegated_by.as_ref() == Some(identifier)
    }
}

/// Matches Authorizations against identity sets
#[derive(Clone)]
pub struct AuthorizationMatcher {
    any_agent: Identifier,
    authenticated_agent: Identifier,
    anonymous_agent: Identifier,
    membership: GroupMembership,
    directory: Option<Arc<dyn GroupDirectory>>,
}

impl AuthorizationMatcher {
    /// Create a matcher that trusts session group claims
    pub fn new(config: &AccessConfig) -> Result<Self> {
        Self::with_directory(config, None)
    }

    /// Create a matcher, failing if the membership policy needs a directory
    /// and none is supplied
    pub fn with_directory(
        config: &AccessConfig,
        directory: Option<Arc<dyn GroupDirectory>>,
    ) -> Result<Self> {
        if config.group_membership.uses_directory() && directory.is_none() {
            return Err(AccessError::Config(format!(
                "group_membership = {:?} requires a group directory",
                config.group_membership
            )));
        }

        Ok(Self {
            any_agent: config.any_agent.clone(),
            authenticated_agent: config.authenticated_agent.clone(),
            anonymous_agent: config.anonymous_agent.clone(),
            membership: config.group_membership,
            directory,
        })
    }

    /// Build the identity set for `session` under the membership policy
    pub async fn identities(&self, session: &Session) -> Result<IdentitySet> {
        let mut groups = BTreeSet::new();

        if self.membership.uses_session() {
            groups.extend(session.groups.iter().cloned());
        }

        if self.membership.uses_directory() {
            if let Some(directory) = &self.directory {
                groups.extend(directory.groups_of(&session.user).await?);
            }
        }

        Ok(IdentitySet {
            user: session.user.clone(),
            groups,
            delegated_by: session.delegated_by.clone(),
            authenticated: session.user != self.anonymous_agent,
        })
    }

    /// Whether `authorization` names any of the identities
    ///
    /// Empty agent, group and class sets grant to no one.
    pub fn applies_to(&self, authorization: &Authorization, identities: &IdentitySet) -> bool {
        if authorization.agents.contains(&self.any_agent)
            || authorization.agents.iter().any(|agent| identities.contains(agent))
        {
            return true;
        }

        if authorization
            .agent_groups
            .iter()
            .any(|group| identities.groups.contains(group))
        {
            return true;
        }

        authorization.agent_classes.contains(&self.any_agent)
            || (identities.authenticated
                && authorization.agent_classes.contains(&self.authenticated_agent))
    }

    /// Whether `authorization` grants a mode satisfying `predicate` to the identities
    pub fn matches<P>(
        &self,
        authorization: &Authorization,
        identities: &IdentitySet,
        predicate: P,
    ) -> bool
    where
        P: Fn(AccessMode) -> bool,
    {
        authorization.grants(predicate) && self.applies_to(authorization, identities)
    }

    /// First Authorization granting a mode satisfying `predicate`
    pub fn find_grant<'a, P>(
        &self,
        authorizations: &'a [Authorization],
        identities: &IdentitySet,
        predicate: P,
    ) -> Option<&'a Authorization>
    where
        P: Fn(AccessMode) -> bool,
    {
        let grant = authorizations
            .iter()
            .find(|authorization| self.matches(authorization, identities, &predicate));

        match grant {
            Some(authorization) => debug!(
                "{} granted to {} by {}",
                authorization
                    .modes
                    .iter()
                    .map(|mode| mode.name())
                    .collect::<Vec<_>>()
                    .join(","),
                identities.user,
                authorization.identifier
            ),
            None => debug!(
                "No authorization among {} matches {}",
                authorizations.len(),
                identities.user
            ),
        }

        grant
    }

    pub fn any_match<P>(
        &self,
        authorizations: &[Authorization],
        identities: &IdentitySet,
        predicate: P,
    ) -> bool
    where
        P: Fn(AccessMode) -> bool,
    {
        self.find_grant(authorizations, identities, predicate).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryGroupDirectory;

    const ALICE: &str = "https://example.com/alice";
    const BOB: &str = "https://example.com/bob";
    const STAFF: &str = "https://example.com/groups/staff";

    fn matcher() -> AuthorizationMatcher {
        AuthorizationMatcher::new(&AccessConfig::default()).unwrap()
    }

    fn is(mode: AccessMode) -> impl Fn(AccessMode) -> bool {
        move |m| m == mode
    }

    #[tokio::test]
    async fn test_direct_agent_match() {
        let matcher = matcher();
        let ids = matcher.identities(&Session::new(ALICE)).await.unwrap();
        let rule = Authorization::new("#r").with_agent(ALICE).with_mode(AccessMode::Read);

        assert!(matcher.matches(&rule, &ids, is(AccessMode::Read)));
        assert!(!matcher.matches(&rule, &ids, is(AccessMode::Write)));
    }

    #[tokio::test]
    async fn test_group_match_ignores_user() {
        let matcher = matcher();
        let ids = matcher
            .identities(&Session::new(BOB).with_group(STAFF))
            .await
            .unwrap();
        let rule = Authorization::new("#r").with_group(STAFF).with_mode(AccessMode::Write);

        assert!(matcher.matches(&rule, &ids, is(AccessMode::Write)));
    }

    #[tokio::test]
    async fn test_group_listed_as_agent() {
        let matcher = matcher();
        let ids = matcher
            .identities(&Session::new(BOB).with_group(STAFF))
            .await
            .unwrap();
        let rule = Authorization::new("#r").with_agent(STAFF).with_mode(AccessMode::Read);

        assert!(matcher.matches(&rule, &ids, is(AccessMode::Read)));
    }

    #[tokio::test]
    async fn test_delegator_match() {
        let matcher = matcher();
        let ids = matcher
            .identities(&Session::new(BOB).delegated_by(ALICE))
            .await
            .unwrap();
        let rule = Authorization::new("#r").with_agent(ALICE).with_mode(AccessMode::Append);

        assert!(matcher.matches(&rule, &ids, is(AccessMode::Append)));
    }

    #[tokio::test]
    async fn test_wildcard_agent_and_class() {
        let matcher = matcher();
        let any = AccessConfig::default().any_agent;
        let ids = matcher.identities(&Session::new(BOB)).await.unwrap();

        let as_agent = Authorization::new("#a").with_agent(any.clone()).with_mode(AccessMode::Read);
        let as_class = Authorization::new("#c").with_agent_class(any).with_mode(AccessMode::Read);

        assert!(matcher.matches(&as_agent, &ids, is(AccessMode::Read)));
        assert!(matcher.matches(&as_class, &ids, is(AccessMode::Read)));
    }

    #[tokio::test]
    async fn test_authenticated_class_excludes_anonymous() {
        let config = AccessConfig::default();
        let matcher = matcher();
        let rule = Authorization::new("#r")
            .with_agent_class(config.authenticated_agent.clone())
            .with_mode(AccessMode::Read);

        let alice = matcher.identities(&Session::new(ALICE)).await.unwrap();
        let anon = matcher
            .identities(&Session::new(config.anonymous_agent.clone()))
            .await
            .unwrap();

        assert!(matcher.matches(&rule, &alice, is(AccessMode::Read)));
        assert!(!matcher.matches(&rule, &anon, is(AccessMode::Read)));
    }

    #[tokio::test]
    async fn test_empty_sets_grant_nothing() {
        let matcher = matcher();
        let ids = matcher.identities(&Session::new(ALICE)).await.unwrap();
        let rule = Authorization::new("#r").with_modes(AccessMode::ALL);

        assert!(!matcher.applies_to(&rule, &ids));
        assert!(!matcher.any_match(&[rule], &ids, |_| true));
    }

    #[tokio::test]
    async fn test_find_grant_returns_first_match() {
        let matcher = matcher();
        let ids = matcher.identities(&Session::new(ALICE)).await.unwrap();
        let rules = vec![
            Authorization::new("#other").with_agent(BOB).with_mode(AccessMode::Read),
            Authorization::new("#mine").with_agent(ALICE).with_mode(AccessMode::Read),
            Authorization::new("#also").with_agent(ALICE).with_mode(AccessMode::Read),
        ];

        let grant = matcher.find_grant(&rules, &ids, is(AccessMode::Read)).unwrap();
        assert_eq!(grant.identifier.as_str(), "#mine");
    }

    #[tokio::test]
    async fn test_directory_membership() {
        let mut config = AccessConfig::default();
        config.group_membership = GroupMembership::Directory;

        assert!(AuthorizationMatcher::new(&config).is_err());

        let directory = Arc::new(InMemoryGroupDirectory::new());
        directory.add_member(STAFF, ALICE).await;
        let directory: Arc<dyn GroupDirectory> = directory;
        let matcher = AuthorizationMatcher::with_directory(&config, Some(directory)).unwrap();

        // Session claims are ignored under a directory-only policy
        let claimed = matcher
            .identities(&Session::new(BOB).with_group(STAFF))
            .await
            .unwrap();
        assert!(claimed.groups.is_empty());

        let looked_up = matcher.identities(&Session::new(ALICE)).await.unwrap();
        assert!(looked_up.groups.contains(&Identifier::new(STAFF)));
    }

    #[tokio::test]
    async fn test_union_membership() {
        let mut config = AccessConfig::default();
        config.group_membership = GroupMembership::Union;

        let directory = Arc::new(InMemoryGroupDirectory::new());
        directory.add_member("https://example.com/groups/admins", ALICE).await;
        let directory: Arc<dyn GroupDirectory> = directory;
        let matcher = AuthorizationMatcher::with_directory(&config, Some(directory)).unwrap();

        let ids = matcher
            .identities(&Session::new(ALICE).with_group(STAFF))
            .await
            .unwrap();
        assert_eq!(ids.groups.len(), 2);
        assert!(ids.contains(&Identifier::new(STAFF)));
        assert!(ids.contains(&Identifier::new("https://example.com/groups/admins")));
    }
}
