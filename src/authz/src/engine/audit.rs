//! Audit recording for access decisions
//!
//! Every decision the service makes can be handed to an [`AuditSink`]. The
//! decision itself is computed before the sink sees it; sinks only observe.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;

use super::decision::AccessDecision;
use crate::error::{AccessError, Result};
use crate::types::{AccessMode, Identifier};

/// Maximum entries kept by [`InMemoryAuditLog`]
const MAX_ENTRIES: usize = 10_000;

/// Audit log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Decision ID
    pub id: String,

    pub session: Identifier,

    pub user: Identifier,

    pub resource: Identifier,

    pub mode: AccessMode,

    /// Decision result (allow/deny)
    pub allowed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<Identifier>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<Identifier>,

    /// Decision reason
    pub reason: String,

    /// Identifiers walked while resolving the ACL
    #[serde(default)]
    pub ancestry: Vec<Identifier>,

    /// Decision latency in microseconds
    pub latency_us: u64,

    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn from_decision(
        decision: &AccessDecision,
        ancestry: Vec<Identifier>,
        latency: Duration,
    ) -> Self {
        Self {
            id: decision.id.clone(),
            session: decision.session.clone(),
            user: decision.user.clone(),
            resource: decision.resource.clone(),
            mode: decision.mode,
            allowed: decision.allowed,
            acl: decision.acl.clone(),
            authorization: decision.authorization().cloned(),
            reason: decision.reason.describe(),
            ancestry,
            latency_us: latency.as_micros() as u64,
            timestamp: decision.timestamp,
        }
    }
}

/// Audit statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditStats {
    pub total_decisions: usize,
    pub allowed: usize,
    pub denied: usize,
}

impl AuditStats {
    pub fn allow_rate(&self) -> f64 {
        if self.total_decisions == 0 {
            0.0
        } else {
            self.allowed as f64 / self.total_decisions as f64
        }
    }
}

/// Destination for audit entries
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: &AuditEntry) -> Result<()>;
}

/// Bounded in-memory audit log
pub struct InMemoryAuditLog {
    buffer: Arc<RwLock<Vec<AuditEntry>>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self {
            buffer: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// All retained entries, oldest first
    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.buffer.read().await.clone()
    }

    /// Most recent entries for `user`, newest first
    pub async fn query_by_user(&self, user: &Identifier, limit: usize) -> Vec<AuditEntry> {
        let buffer = self.buffer.read().await;
        buffer
            .iter()
            .rev()
            .filter(|e| &e.user == user)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Most recent entries for `resource`, newest first
    pub async fn query_by_resource(&self, resource: &Identifier, limit: usize) -> Vec<AuditEntry> {
        let buffer = self.buffer.read().await;
        buffer
            .iter()
            .rev()
            .filter(|e| &e.resource == resource)
            .take(limit)
            .cloned()
            .collect()
    }

    pub async fn stats(&self) -> AuditStats {
        let buffer = self.buffer.read().await;
        let allowed = buffer.iter().filter(|e| e.allowed).count();
        AuditStats {
            total_decisions: buffer.len(),
            allowed,
            denied: buffer.len() - allowed,
        }
    }

    pub async fn clear(&self) {
        self.buffer.write().await.clear();
    }
}

impl Default for InMemoryAuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditLog {
    async fn record(&self, entry: &AuditEntry) -> Result<()> {
        let mut buffer = self.buffer.write().await;
        buffer.push(entry.clone());

        // Keep only the most recent entries
        if buffer.len() > MAX_ENTRIES {
            let excess = buffer.len() - MAX_ENTRIES;
            buffer.drain(0..excess);
        }

        Ok(())
    }
}

/// Writes audit entries as JSON through `tracing`
#[derive(Debug, Clone, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, entry: &AuditEntry) -> Result<()> {
        let json = serde_json::to_string(entry)
            .map_err(|e| AccessError::Storage(format!("audit serialization failed: {}", e)))?;
        info!(target: "webac::audit", "{}", json);
        Ok(())
    }
}
