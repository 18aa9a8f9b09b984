//! Access decision types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{AccessMode, Identifier};

/// Outcome of one mode check, with enough context to replay it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    /// Unique decision ID
    pub id: String,

    /// Whether the mode is granted
    pub allowed: bool,

    /// Mode that was checked
    pub mode: AccessMode,

    /// Target resource
    pub resource: Identifier,

    /// Session that asked
    pub session: Identifier,

    /// Acting user
    pub user: Identifier,

    /// Effective ACL, if one was found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<Identifier>,

    /// Why the decision came out the way it did
    pub reason: DecisionReason,

    /// Decision time
    pub timestamp: DateTime<Utc>,
}

impl AccessDecision {
    pub(crate) fn new(
        mode: AccessMode,
        resource: Identifier,
        session: Identifier,
        user: Identifier,
        acl: Option<Identifier>,
        reason: DecisionReason,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            allowed: matches!(reason, DecisionReason::Granted { .. }),
            mode,
            resource,
            session,
            user,
            acl,
            reason,
            timestamp: Utc::now(),
        }
    }

    /// Authorization that granted access, if any
    pub fn authorization(&self) -> Option<&Identifier> {
        match &self.reason {
            DecisionReason::Granted { authorization } => Some(authorization),
            _ => None,
        }
    }
}

/// Reason for an access decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DecisionReason {
    /// An Authorization in the effective ACL granted the mode
    Granted { authorization: Identifier },

    /// No resource from the target up to the root declares an ACL
    NoAcl,

    /// The effective ACL has no Authorization granting the mode
    NoMatchingAuthorization,
}

impl DecisionReason {
    pub fn describe(&self) -> String {
        match self {
            Self::Granted { authorization } => format!("granted by {}", authorization),
            Self::NoAcl => "no ACL governs the resource, default deny".to_string(),
            Self::NoMatchingAuthorization => "no matching authorization, default deny".to_string(),
        }
    }
}
