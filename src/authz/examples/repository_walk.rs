//! Walks a small repository tree and prints access decisions
//!
//! Run with `RUST_LOG=webac_authz=debug cargo run --example repository_walk`
//! to see the resolver and matcher trace.

use std::sync::Arc;

use anyhow::Result;
use chrono::Duration;
use tracing_subscriber::EnvFilter;
use webac_authz::{
    AccessConfig, AccessControlService, AccessMode, Authorization, Identifier,
    InMemoryAuditLog, InMemoryResourceStore, InMemorySessionStore, Resource, Session,
    SessionStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let store = Arc::new(InMemoryResourceStore::new());

    // /            public read
    // /docs/       staff read/write, alice controls
    // /docs/report.pdf
    // /inbox/      anyone may append
    store.put(Resource::new("/").with_acl("/?ext=acl")).await;
    store
        .put(Resource::new("/docs/").with_parent("/").with_acl("/docs/?ext=acl"))
        .await;
    store
        .put(Resource::new("/docs/report.pdf").with_parent("/docs/"))
        .await;
    store
        .put(Resource::new("/inbox/").with_parent("/").with_acl("/inbox/?ext=acl"))
        .await;

    let config = AccessConfig::default();

    store
        .put_acl(
            "/?ext=acl",
            vec![Authorization::new("/?ext=acl#public")
                .with_agent_class(config.any_agent.clone())
                .with_mode(AccessMode::Read)
                .default_for("/")],
        )
        .await?;
    store
        .put_acl(
            "/docs/?ext=acl",
            vec![
                Authorization::new("/docs/?ext=acl#staff")
                    .with_group("https://example.com/groups/staff")
                    .with_modes([AccessMode::Read, AccessMode::Write])
                    .default_for("/docs/"),
                Authorization::new("/docs/?ext=acl#owner")
                    .with_agent("https://example.com/alice")
                    .with_modes(AccessMode::ALL)
                    .accessing("/docs/"),
            ],
        )
        .await?;
    store
        .put_acl(
            "/inbox/?ext=acl",
            vec![Authorization::new("/inbox/?ext=acl#drop")
                .with_agent_class(config.authenticated_agent.clone())
                .with_mode(AccessMode::Append)],
        )
        .await?;

    let audit = Arc::new(InMemoryAuditLog::new());
    let service = AccessControlService::new(config.clone(), store)?.with_audit(audit.clone());

    let sessions = [
        Session::new("https://example.com/alice").with_group("https://example.com/groups/staff"),
        Session::new("https://example.com/bob").with_group("https://example.com/groups/staff"),
        Session::new("https://example.com/carol").delegated_by("https://example.com/alice"),
        Session::new(config.anonymous_agent.clone()),
    ];
    let targets = ["/", "/docs/", "/docs/report.pdf", "/inbox/"].map(Identifier::new);

    for session in &sessions {
        println!("{}", session.user);
        for target in &targets {
            let modes = service.modes_for(session, target).await?;
            let granted: Vec<_> = modes.iter().map(|mode| mode.name()).collect();
            let acl = service
                .find_acl_for(target)
                .await?
                .map(|acl| acl.to_string())
                .unwrap_or_else(|| "-".into());
            println!("  {:<20} acl={:<18} {:?}", target, acl, granted);
        }
    }

    // Audited single-mode decisions
    let report = Identifier::new("/docs/report.pdf");
    for session in &sessions {
        service.can_write(session, &report).await?;
    }
    let stats = audit.stats().await;
    println!(
        "audit: {} decisions, {} allowed, {} denied ({:.0}% allowed)",
        stats.total_decisions,
        stats.allowed,
        stats.denied,
        stats.allow_rate() * 100.0
    );

    // Session lifecycle
    let session_store = InMemorySessionStore::new();
    let mut session = Session::new("https://example.com/bob");
    let expiry = session.update_expiry(Duration::minutes(30))?;
    session.commit(&session_store).await?;
    println!("session {} expires at {}", session.identifier, expiry);

    session.expire();
    session.commit(&session_store).await?;
    match service.can_read(&session, &report).await {
        Ok(allowed) => println!("expired session allowed={}", allowed),
        Err(e) => println!("expired session rejected: {}", e),
    }

    let stored = session_store.get(&session.identifier).await?;
    println!(
        "stored session expired: {}",
        stored.map(|s| s.is_expired()).unwrap_or(false)
    );

    Ok(())
}
