//! Engine configuration loading and validation

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AccessError, Result};
use crate::types::Identifier;

/// Where a user's group memberships come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupMembership {
    /// Trust `Session::groups`
    #[default]
    Session,
    /// Look groups up in a `GroupDirectory`
    Directory,
    /// Both of the above
    Union,
}

impl GroupMembership {
    pub fn uses_session(self) -> bool {
        matches!(self, Self::Session | Self::Union)
    }

    pub fn uses_directory(self) -> bool {
        matches!(self, Self::Directory | Self::Union)
    }
}

/// Access-control engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Maximum number of ancestors visited while resolving an ACL
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Marker granting access to every agent
    #[serde(default = "default_any_agent")]
    pub any_agent: Identifier,

    /// Marker granting access to every non-anonymous agent
    #[serde(default = "default_authenticated_agent")]
    pub authenticated_agent: Identifier,

    /// User identifier carried by unauthenticated sessions
    #[serde(default = "default_anonymous_agent")]
    pub anonymous_agent: Identifier,

    #[serde(default)]
    pub group_membership: GroupMembership,

    /// Record decisions to the configured audit sink
    #[serde(default = "default_true")]
    pub audit: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            any_agent: default_any_agent(),
            authenticated_agent: default_authenticated_agent(),
            anonymous_agent: default_anonymous_agent(),
            group_membership: GroupMembership::default(),
            audit: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_depth() -> usize {
    64
}

fn default_any_agent() -> Identifier {
    Identifier::new("http://xmlns.com/foaf/0.1/Agent")
}

fn default_authenticated_agent() -> Identifier {
    Identifier::new("http://www.w3.org/ns/auth/acl#AuthenticatedAgent")
}

fn default_anonymous_agent() -> Identifier {
    Identifier::new("http://www.trellisldp.org/ns/trellis#AnonymousAgent")
}

impl AccessConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AccessConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(AccessError::Config("max_depth must be at least 1".into()));
        }

        if self.any_agent == self.authenticated_agent {
            return Err(AccessError::Config(
                "any_agent and authenticated_agent must differ".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AccessConfig::default();
        assert_eq!(config.max_depth, 64);
        assert_eq!(config.any_agent.as_str(), "http://xmlns.com/foaf/0.1/Agent");
        assert_eq!(config.group_membership, GroupMembership::Session);
        assert!(config.audit);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AccessConfig::from_toml(
            r#"
            max_depth = 8
            group_membership = "union"
            "#,
        )
        .unwrap();

        assert_eq!(config.max_depth, 8);
        assert_eq!(config.group_membership, GroupMembership::Union);
        assert!(config.group_membership.uses_session());
        assert!(config.group_membership.uses_directory());
        assert_eq!(config.anonymous_agent, default_anonymous_agent());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            AccessConfig::from_toml("max_depth = 0"),
            Err(AccessError::Config(_))
        ));
        assert!(matches!(
            AccessConfig::from_toml("group_membership = \"ldap\""),
            Err(AccessError::Toml(_))
        ));
        assert!(AccessConfig::from_toml("any_agent = \"\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "any_agent = \"urn:example:everyone\"").unwrap();
        writeln!(file, "audit = false").unwrap();

        let config = AccessConfig::load(file.path()).unwrap();
        assert_eq!(config.any_agent.as_str(), "urn:example:everyone");
        assert!(!config.audit);
    }

    #[test]
    fn test_load_missing_file() {
        let result = AccessConfig::load("/nonexistent/webac.toml");
        assert!(matches!(result, Err(AccessError::Io(_))));
    }
}
