//! # WebAC Authorization Engine
//!
//! Access-control decisions for hierarchical resource repositories, following
//! the W3C WebAccessControl and Solid WebAC model.
//!
//! ## Features
//!
//! - **ACL inheritance** from the nearest ancestor that declares an ACL, with
//!   a bounded, cycle-checked walk
//! - **Identity matching** on agents, groups, delegators and agent classes
//! - **Default deny**: no governing ACL or no matching rule means no access
//! - **Async collaborators** for storage, group directories and audit sinks
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use webac_authz::{
//!     AccessConfig, AccessControlService, AccessMode, Authorization, Identifier,
//!     InMemoryResourceStore, Resource, Session,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryResourceStore::new());
//! store.put(Resource::new("/docs").with_acl("/docs?ext=acl")).await;
//! store.put(Resource::new("/docs/report.pdf").with_parent("/docs")).await;
//! store
//!     .put_acl(
//!         "/docs?ext=acl",
//!         vec![Authorization::new("/docs?ext=acl#staff")
//!             .with_group("https://example.com/groups/staff")
//!             .with_mode(AccessMode::Read)],
//!     )
//!     .await?;
//!
//! let service = AccessControlService::new(AccessConfig::default(), store)?;
//! let session = Session::new("https://example.com/alice")
//!     .with_group("https://example.com/groups/staff");
//!
//! let report = Identifier::new("/docs/report.pdf");
//! assert!(service.can_read(&session, &report).await?);
//! assert!(!service.can_write(&session, &report).await?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod resolver;
pub mod session;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::{AccessConfig, GroupMembership};
pub use engine::{
    AccessControlService, AccessDecision, AuditEntry, AuditSink, AuditStats, DecisionReason,
    InMemoryAuditLog, TracingAuditSink,
};
pub use error::{AccessError, Result};
pub use matcher::{AuthorizationMatcher, IdentitySet};
pub use resolver::{AclResolver, Resolution};
pub use session::{InMemorySessionStore, Session, SessionStore};
pub use store::{
    GroupDirectory, InMemoryGroupDirectory, InMemoryResourceStore, Resource, ResourceLocator,
};
pub use types::{AccessMode, Authorization, Identifier, ModeSet, ACL_NS};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
