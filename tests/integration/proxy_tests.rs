use crate::common::{coordinator, mount_product};
use product_scout::pipeline::CallContext;
use product_scout::proxy::{ProxySpec, ProxyUpdate, DEFAULT_PROXY_ID, REDACTED};
use product_scout::{ErrorKind, ProxyError, ScoutError};
use wiremock::MockServer;

/// A proxy nobody listens on; fetches through it fail to connect
fn dead_proxy(name: &str) -> ProxySpec {
    ProxySpec {
        name: name.to_string(),
        username: "scout".to_string(),
        password: "hunter2".to_string(),
        host: "127.0.0.1".to_string(),
        port: 1,
        active: true,
    }
}

#[tokio::test]
async fn test_assigned_proxy_routes_the_callers_fetches() {
    let server = MockServer::start().await;
    mount_product(&server, "/dp/B000000001", "B000000001", "Widget").await;
    let coordinator = coordinator(&server, "");
    let url = format!("{}/dp/B000000001", server.uri());

    let proxy = coordinator.create_proxy(dead_proxy("dead"), "admin").unwrap();
    coordinator.assign_proxy("bob", &proxy.id).unwrap();

    // bob goes through the dead proxy, alice goes direct
    let err = coordinator
        .scrape(&url, &CallContext::new("bob", "192.0.2.1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FetchFailed);

    coordinator
        .scrape(&url, &CallContext::new("alice", "192.0.2.2"))
        .await
        .expect("Unassigned user should use the default route");

    // Once unassigned, bob falls back to the default route
    assert!(coordinator.unassign_proxy("bob"));
    assert!(!coordinator.unassign_proxy("bob"));
    coordinator
        .scrape(&url, &CallContext::new("bob", "192.0.2.1"))
        .await
        .expect("Default route should work");
}

#[tokio::test]
async fn test_deactivated_proxy_falls_back_to_default() {
    let server = MockServer::start().await;
    mount_product(&server, "/dp/B000000001", "B000000001", "Widget").await;
    let coordinator = coordinator(&server, "");
    let url = format!("{}/dp/B000000001", server.uri());

    let proxy = coordinator.create_proxy(dead_proxy("dead"), "admin").unwrap();
    coordinator.assign_proxy("bob", &proxy.id).unwrap();
    coordinator
        .update_proxy(
            &proxy.id,
            ProxyUpdate {
                active: Some(false),
                ..ProxyUpdate::default()
            },
        )
        .unwrap();

    coordinator
        .scrape(&url, &CallContext::new("bob", "192.0.2.1"))
        .await
        .expect("Inactive assignment should resolve to the default proxy");

    // New assignments to an inactive proxy are refused
    let err = coordinator.assign_proxy("carol", &proxy.id).unwrap_err();
    assert!(matches!(err, ScoutError::Proxy(ProxyError::Inactive(_))));
}

#[tokio::test]
async fn test_proxy_lifecycle_through_coordinator() {
    let server = MockServer::start().await;
    let coordinator = coordinator(&server, "");

    let created = coordinator.create_proxy(dead_proxy("eu-1"), "admin").unwrap();
    assert_eq!(created.password, REDACTED);
    assert_eq!(created.created_by, "admin");

    let listed = coordinator.list_proxies();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, DEFAULT_PROXY_ID);
    assert!(listed.iter().all(|p| p.password != "hunter2"));

    // Empty strings leave stored values untouched
    let updated = coordinator
        .update_proxy(
            &created.id,
            ProxyUpdate {
                name: Some(String::new()),
                host: Some("10.1.1.1".to_string()),
                ..ProxyUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(updated.name, "eu-1");
    assert_eq!(updated.host, "10.1.1.1");
    assert!(updated.updated_at >= created.updated_at);

    coordinator.assign_proxy("bob", &created.id).unwrap();
    coordinator.assign_proxy("carol", &created.id).unwrap();
    assert_eq!(coordinator.delete_proxy(&created.id).unwrap(), 2);
    assert!(coordinator.proxy_assignments().is_empty());

    let err = coordinator.get_proxy(&created.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProxyNotFound);

    let err = coordinator.delete_proxy(DEFAULT_PROXY_ID).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProxyIsDefault);
    assert!(coordinator.get_proxy(DEFAULT_PROXY_ID).is_ok());
}
