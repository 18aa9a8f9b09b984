//! Property tests for the decision engine

use std::sync::Arc;

use proptest::prelude::*;
use webac_authz::{
    AccessConfig, AccessControlService, AccessMode, Authorization, Identifier,
    InMemoryResourceStore, Resource, Session,
};

/// Build `/n0/n1/.../nk`, optionally declaring an ACL on the root
async fn chain(
    depth: usize,
    root_acl: Option<Vec<Authorization>>,
) -> (Arc<InMemoryResourceStore>, Identifier) {
    let store = Arc::new(InMemoryResourceStore::new());
    let mut path = String::from("/n0");

    let mut root = Resource::new(path.as_str());
    if let Some(authorizations) = root_acl {
        root = root.with_acl("/n0?ext=acl");
        store.put_acl("/n0?ext=acl", authorizations).await.unwrap();
    }
    store.put(root).await;

    for i in 1..=depth {
        let child = format!("{}/n{}", path, i);
        store.put(Resource::new(child.as_str()).with_parent(path.as_str())).await;
        path = child;
    }

    (store, Identifier::new(path))
}

proptest! {
    #[test]
    fn test_no_acl_means_no_access(
        depth in 0usize..12,
        user in "[a-z]{3,10}",
        groups in prop::collection::btree_set("[a-z]{3,8}", 0..4),
    ) {
        tokio_test::block_on(async {
            let (store, leaf) = chain(depth, None).await;
            let service = AccessControlService::new(AccessConfig::default(), store).unwrap();
            let session = Session::new(format!("https://example.com/{}", user)).with_groups(groups);

            let modes = service.modes_for(&session, &leaf).await.unwrap();
            prop_assert!(modes.is_empty());
            prop_assert!(service.find_acl_for(&leaf).await.unwrap().is_none());
            Ok(())
        })?;
    }

    #[test]
    fn test_agent_granted_exactly_its_modes(
        depth in 0usize..8,
        granted in prop::array::uniform4(any::<bool>()),
    ) {
        tokio_test::block_on(async {
            let user = "https://example.com/alice";
            let modes: Vec<AccessMode> = AccessMode::ALL
                .into_iter()
                .filter(|m| granted[m.index()])
                .collect();
            let rule = Authorization::new("/n0?ext=acl#alice").with_agent(user).with_modes(modes);

            let (store, leaf) = chain(depth, Some(vec![rule])).await;
            let service = AccessControlService::new(AccessConfig::default(), store).unwrap();
            let session = Session::new(user);

            for mode in AccessMode::ALL {
                let allowed = service.check(&session, &leaf, mode).await.unwrap();
                prop_assert_eq!(allowed, granted[mode.index()]);
            }

            let stranger = Session::new("https://example.com/mallory");
            prop_assert!(service.modes_for(&stranger, &leaf).await.unwrap().is_empty());
            Ok(())
        })?;
    }

    #[test]
    fn test_wildcard_matches_every_session(
        user in "[a-z]{1,12}",
        groups in prop::collection::btree_set("[a-z]{3,8}", 0..4),
        delegated in proptest::option::of("[a-z]{3,8}"),
    ) {
        tokio_test::block_on(async {
            let any = AccessConfig::default().any_agent;
            let rule = Authorization::new("/n0?ext=acl#public")
                .with_agent_class(any)
                .with_mode(AccessMode::Read);
            let (store, leaf) = chain(3, Some(vec![rule])).await;
            let service = AccessControlService::new(AccessConfig::default(), store).unwrap();

            let mut session =
                Session::new(format!("https://example.com/{}", user)).with_groups(groups);
            if let Some(delegator) = delegated {
                session = session.delegated_by(format!("https://example.com/{}", delegator));
            }

            prop_assert!(service.can_read(&session, &leaf).await.unwrap());
            prop_assert!(!service.can_write(&session, &leaf).await.unwrap());
            Ok(())
        })?;
    }

    #[test]
    fn test_decisions_are_deterministic(
        depth in 0usize..6,
        group in "[a-z]{3,8}",
        member in any::<bool>(),
    ) {
        tokio_test::block_on(async {
            let group_id = format!("https://example.com/groups/{}", group);
            let rule = Authorization::new("/n0?ext=acl#group")
                .with_group(group_id.as_str())
                .with_modes([AccessMode::Read, AccessMode::Write]);
            let (store, leaf) = chain(depth, Some(vec![rule])).await;
            let service = AccessControlService::new(AccessConfig::default(), store).unwrap();

            let mut session = Session::new("https://example.com/bob");
            if member {
                session = session.with_group(group_id.as_str());
            }

            let first = service.modes_for(&session, &leaf).await.unwrap();
            let second = service.modes_for(&session, &leaf).await.unwrap();
            prop_assert_eq!(first, second);
            prop_assert_eq!(first[AccessMode::Read], member);
            prop_assert!(!first[AccessMode::Control]);
            Ok(())
        })?;
    }
}
