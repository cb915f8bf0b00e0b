//! Security family passes over an in-memory registry source.

use artisync_core::{FileStore, Lifecycle, MetadataStore, Synchronizer};
use artisync_engine::{ChannelObserver, FamilyConfig, PassEvent, ReconciliationDriver};
use artisync_security::SecurityFamily;
use artisync_source::InMemorySource;
use artisync_testkit::init_tracing;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

const ROLES: &[u8] = br#"[{"name": "admin", "description": "Shop administrators"}]"#;
const ACCESS: &[u8] =
    br#"[{"name": "orders:read", "path": "/orders/*", "method": "GET", "roles": ["admin"]}]"#;

fn setup() -> (SecurityFamily, Arc<InMemorySource>, ReconciliationDriver, Receiver<PassEvent>) {
    init_tracing();
    let family = SecurityFamily::in_memory();
    let source = Arc::new(InMemorySource::new());
    source.put("/shop/security.roles", ROLES.to_vec()).unwrap();
    source.put("/shop/orders.access", ACCESS.to_vec()).unwrap();
    let (observer, events) = ChannelObserver::new();
    let driver = family
        .driver(FamilyConfig::new("security"), source.clone())
        .with_observer(Arc::new(observer));
    (family, source, driver, events)
}

fn transitions(events: &Receiver<PassEvent>) -> Vec<(String, Option<Lifecycle>, Lifecycle)> {
    events
        .try_iter()
        .filter_map(|e| match e {
            PassEvent::StateChanged(c) => Some((c.name, c.from, c.to)),
            PassEvent::PassFinished(_) => None,
        })
        .collect()
}

#[test]
fn first_pass_registers_roles_before_constraints() {
    let (family, _source, driver, events) = setup();

    let result = driver.synchronize();

    assert!(result.is_successful(), "{}", result.summary());
    assert_eq!(result.advanced_names(), vec!["admin", "orders:read"]);
    let created: Vec<_> = transitions(&events)
        .into_iter()
        .filter(|(_, _, to)| *to == Lifecycle::Created)
        .map(|(name, from, _)| (name, from))
        .collect();
    assert_eq!(
        created,
        vec![
            ("admin".to_string(), Some(Lifecycle::New)),
            ("orders:read".to_string(), Some(Lifecycle::New)),
        ]
    );
    assert!(family.security().is_allowed("/orders/7", "GET", &["admin"]));
    assert!(!family.security().is_allowed("/orders/7", "GET", &["guest"]));
}

#[test]
fn removing_roles_reports_external_dependency_and_deletes_role() {
    let (family, source, driver, events) = setup();
    driver.synchronize();
    let _ = transitions(&events);

    source.remove("/shop/security.roles");
    let result = driver.synchronize();

    assert!(result.is_successful(), "{}", result.summary());
    assert_eq!(
        result.external.get("orders:read"),
        Some(&vec!["admin".to_string()])
    );
    assert_eq!(
        result.deleted.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        vec!["admin"]
    );
    assert_eq!(
        transitions(&events),
        vec![(
            "admin".to_string(),
            Some(Lifecycle::Created),
            Lifecycle::Deleted
        )]
    );
    assert!(family.security().role("admin").is_none());
    assert!(family.security().constraint("orders:read").is_some());
    assert!(family.roles().store().find_all("role").unwrap().is_empty());
}

#[test]
fn removing_constraints_revokes_them() {
    let (family, source, driver, _events) = setup();
    driver.synchronize();

    source.remove("/shop/orders.access");
    let result = driver.synchronize();

    assert_eq!(
        result.deleted.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        vec!["orders:read"]
    );
    assert!(family.security().constraint_names().is_empty());
    assert_eq!(family.security().role_names(), vec!["admin"]);
    assert!(family.security().is_allowed("/orders/7", "GET", &[]));
}

#[test]
fn malformed_roles_file_keeps_applied_roles() {
    let (family, source, driver, _events) = setup();
    driver.synchronize();

    source.put("/shop/security.roles", b"[{".to_vec()).unwrap();
    let result = driver.synchronize();

    assert!(!result.is_successful());
    assert!(result.deleted.is_empty());
    assert!(family.security().role("admin").is_some());
}

#[test]
fn role_moved_between_files_stays_registered() {
    let (family, source, driver, _events) = setup();
    driver.synchronize();

    source.remove("/shop/security.roles");
    source.put("/shop/moved.roles", ROLES.to_vec()).unwrap();
    let result = driver.synchronize();

    assert!(result.is_successful(), "{}", result.summary());
    assert_eq!(result.advanced_names(), vec!["admin"]);
    assert_eq!(
        result.deleted.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        vec!["admin"]
    );
    let role = family.security().role("admin").expect("role registered");
    assert_eq!(role.location, "/shop/moved.roles");

    let result = driver.synchronize();
    assert_eq!(result.unchanged.len(), 2);
    assert!(family.security().role("admin").is_some());
    assert!(family.security().is_allowed("/orders/7", "GET", &["admin"]));
}

#[test]
fn file_backed_family_restores_registry_after_restart() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(InMemorySource::new());
    source.put("/shop/security.roles", ROLES.to_vec()).unwrap();
    source.put("/shop/orders.access", ACCESS.to_vec()).unwrap();
    let open = || {
        SecurityFamily::with_stores(
            Arc::new(FileStore::open(dir.path().join("roles.cbor")).unwrap()),
            Arc::new(FileStore::open(dir.path().join("access.cbor")).unwrap()),
        )
        .unwrap()
    };

    let family = open();
    assert!(family.security().role_names().is_empty());
    let result = family
        .driver(FamilyConfig::new("security"), source.clone())
        .synchronize();
    assert_eq!(result.advanced.len(), 2);
    drop(family);

    let family = open();
    assert_eq!(family.security().role_names(), vec!["admin"]);
    assert_eq!(family.security().constraint_names(), vec!["orders:read"]);

    let result = family
        .driver(FamilyConfig::new("security"), source.clone())
        .synchronize();
    assert!(result.is_successful(), "{}", result.summary());
    assert!(result.advanced.is_empty());
    assert_eq!(result.unchanged.len(), 2);
    assert!(family.security().is_allowed("/orders/7", "GET", &["admin"]));
}
