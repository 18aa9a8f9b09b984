//! Core access-control types

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use crate::error::{AccessError, Result};

/// WebAC vocabulary namespace
pub const ACL_NS: &str = "http://www.w3.org/ns/auth/acl#";

/// Opaque, immutable resource name (IRI-equivalent)
///
/// Used as the key for resources, ACLs, users, groups, sessions and
/// agent classes alike.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Create an identifier without validation
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Parse and validate an identifier
    ///
    /// Identifiers must be non-empty and contain no whitespace.
    pub fn parse(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(AccessError::InvalidIdentifier("identifier cannot be empty".into()));
        }
        if value.chars().any(char::is_whitespace) {
            return Err(AccessError::InvalidIdentifier(format!(
                "identifier contains whitespace: '{}'",
                value
            )));
        }
        Ok(Self(value.to_string()))
    }

    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for Identifier {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    /// Deserialized identifiers are validated
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Access mode granted by an Authorization
///
/// Closed set; the four WebAC modes only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccessMode {
    Read,
    Write,
    Append,
    Control,
}

impl AccessMode {
    /// Every mode, in table order
    pub const ALL: [AccessMode; 4] = [
        AccessMode::Read,
        AccessMode::Write,
        AccessMode::Append,
        AccessMode::Control,
    ];

    /// Position of this mode in a [`ModeSet`]
    pub const fn index(self) -> usize {
        match self {
            AccessMode::Read => 0,
            AccessMode::Write => 1,
            AccessMode::Append => 2,
            AccessMode::Control => 3,
        }
    }

    /// Short name (`Read`, `Write`, ...)
    pub const fn name(self) -> &'static str {
        match self {
            AccessMode::Read => "Read",
            AccessMode::Write => "Write",
            AccessMode::Append => "Append",
            AccessMode::Control => "Control",
        }
    }

    /// Full WebAC IRI of this mode
    pub fn iri(self) -> String {
        format!("{}{}", ACL_NS, self.name())
    }
}

impl FromStr for AccessMode {
    type Err = AccessError;

    /// Accepts the full WebAC IRI or the case-insensitive short name
    fn from_str(s: &str) -> Result<Self> {
        let name = s.strip_prefix(ACL_NS).unwrap_or(s);
        AccessMode::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                AccessError::InvalidAuthorization(format!("unknown access mode '{}'", s))
            })
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Enum-indexed table of granted modes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeSet([bool; 4]);

impl ModeSet {
    /// Table with nothing granted
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table by evaluating `f` once per mode
    pub fn from_fn(mut f: impl FnMut(AccessMode) -> bool) -> Self {
        let mut set = Self::empty();
        for mode in AccessMode::ALL {
            set.0[mode.index()] = f(mode);
        }
        set
    }

    pub fn insert(&mut self, mode: AccessMode) {
        self.0[mode.index()] = true;
    }

    pub fn contains(&self, mode: AccessMode) -> bool {
        self.0[mode.index()]
    }

    pub fn is_empty(&self) -> bool {
        !self.0.iter().any(|granted| *granted)
    }

    /// Iterate over the granted modes
    pub fn iter(&self) -> impl Iterator<Item = AccessMode> + '_ {
        AccessMode::ALL.into_iter().filter(|mode| self.contains(*mode))
    }
}

impl Index<AccessMode> for ModeSet {
    type Output = bool;

    fn index(&self, mode: AccessMode) -> &bool {
        &self.0[mode.index()]
    }
}

impl FromIterator<AccessMode> for ModeSet {
    fn from_iter<I: IntoIterator<Item = AccessMode>>(iter: I) -> Self {
        let mut set = Self::empty();
        for mode in iter {
            set.insert(mode);
        }
        set
    }
}

/// One ACL rule granting a set of modes to agents, groups or agent classes
///
/// Authorizations are immutable once fetched from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    /// Authorization identifier
    pub identifier: Identifier,

    /// Agents granted access (`acl:agent`)
    #[serde(default)]
    pub agents: BTreeSet<Identifier>,

    /// Groups granted access (`acl:agentGroup`)
    #[serde(default)]
    pub agent_groups: BTreeSet<Identifier>,

    /// Agent classes granted access (`acl:agentClass`)
    #[serde(default)]
    pub agent_classes: BTreeSet<Identifier>,

    /// Granted modes (`acl:mode`)
    #[serde(default)]
    pub modes: BTreeSet<AccessMode>,

    /// Resources this rule governs directly (`acl:accessTo`)
    #[serde(default)]
    pub access_to: BTreeSet<Identifier>,

    /// Containers whose descendants inherit this rule (`acl:default`)
    #[serde(default)]
    pub default_for: BTreeSet<Identifier>,
}

impl Authorization {
    /// Create an Authorization that grants nothing to no one
    pub fn new(identifier: impl Into<Identifier>) -> Self {
        Self {
            identifier: identifier.into(),
            agents: BTreeSet::new(),
            agent_groups: BTreeSet::new(),
            agent_classes: BTreeSet::new(),
            modes: BTreeSet::new(),
            access_to: BTreeSet::new(),
            default_for: BTreeSet::new(),
        }
    }

    pub fn with_agent(mut self, agent: impl Into<Identifier>) -> Self {
        self.agents.insert(agent.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<Identifier>) -> Self {
        self.agent_groups.insert(group.into());
        self
    }

    pub fn with_agent_class(mut self, class: impl Into<Identifier>) -> Self {
        self.agent_classes.insert(class.into());
        self
    }

    pub fn with_mode(mut self, mode: AccessMode) -> Self {
        self.modes.insert(mode);
        self
    }

    pub fn with_modes(mut self, modes: impl IntoIterator<Item = AccessMode>) -> Self {
        self.modes.extend(modes);
        self
    }

    pub fn accessing(mut self, resource: impl Into<Identifier>) -> Self {
        self.access_to.insert(resource.into());
        self
    }

    pub fn default_for(mut self, container: impl Into<Identifier>) -> Self {
        self.default_for.insert(container.into());
        self
    }

    /// Whether any granted mode satisfies `predicate`
    pub fn grants(&self, predicate: impl Fn(AccessMode) -> bool) -> bool {
        self.modes.iter().any(|mode| predicate(*mode))
    }

    /// Reject Authorizations carrying empty identifiers
    pub fn validate(&self) -> Result<()> {
        if self.identifier.is_empty() {
            return Err(AccessError::InvalidAuthorization(
                "authorization identifier cannot be empty".into(),
            ));
        }

        let members = self
            .agents
            .iter()
            .chain(&self.agent_groups)
            .chain(&self.agent_classes)
            .chain(&self.access_to)
            .chain(&self.default_for);
        for member in members {
            if member.is_empty() {
                return Err(AccessError::InvalidAuthorization(format!(
                    "authorization {} contains an empty identifier",
                    self.identifier
                )));
            }
        }

        Ok(())
    }
}
