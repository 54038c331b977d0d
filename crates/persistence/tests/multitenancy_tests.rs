//! Tenant resolution, store routing and isolation tests.

mod common;

use std::sync::Arc;

use serde_json::json;

use atrium_persistence::core::EntityStore;
use atrium_persistence::error::{StorageError, TenantError};
use atrium_persistence::lifecycle::{EntityLifecycleScope, Trashable};
use atrium_persistence::strategy::DatabasePerTenantConfig;
use atrium_persistence::tenant::{
    CentralRegistry, HostResolution, NewTenant, RequestMetadata, TenantId,
};

use common::{Harness, insert, manager};

fn is_tenant_error(err: &StorageError, check: fn(&TenantError) -> bool) -> bool {
    matches!(err, StorageError::Tenant(e) if check(e))
}

// ============================================================================
// Resolution
// ============================================================================

#[tokio::test]
async fn test_host_resolution_is_deterministic() {
    let harness = Harness::in_memory();
    harness.tenant("acme").await;
    harness
        .registry
        .attach_domain(&TenantId::new("acme"), "crm.acme.test")
        .await
        .unwrap();

    for host in ["acme.example.com", "ACME.example.com:8443", "crm.acme.test."] {
        let first = harness.resolver.resolve_tenant(host).await.unwrap();
        let second = harness.resolver.resolve_tenant(host).await.unwrap();
        assert_eq!(first.id.as_str(), "acme");
        assert_eq!(first, second);
    }
}

#[tokio::test]
async fn test_unknown_host_is_not_resolved() {
    let harness = Harness::in_memory();
    harness.tenant("acme").await;

    let err = harness
        .resolver
        .resolve_tenant("globex.example.com")
        .await
        .unwrap_err();
    assert!(is_tenant_error(&err, |e| matches!(e, TenantError::NotResolved { .. })));

    let err = harness.resolver.resolve_tenant("").await.unwrap_err();
    assert!(is_tenant_error(&err, |e| matches!(e, TenantError::NotResolved { .. })));
}

#[tokio::test]
async fn test_central_domain_denied_for_tenant_routes() {
    let harness = Harness::in_memory();
    harness.tenant("acme").await;
    harness
        .registry
        .designate_central_domain("admin.example.com")
        .await
        .unwrap();

    assert_eq!(
        harness.resolver.resolve("admin.example.com").await.unwrap(),
        HostResolution::Central {
            host: "admin.example.com".to_string()
        }
    );

    let err = harness
        .resolver
        .resolve_tenant("admin.example.com")
        .await
        .unwrap_err();
    assert!(is_tenant_error(&err, |e| matches!(
        e,
        TenantError::CentralDomainAccessDenied { .. }
    )));

    let err = harness
        .resolver
        .resolve_central("acme.example.com")
        .await
        .unwrap_err();
    assert!(is_tenant_error(&err, |e| matches!(e, TenantError::CentralRouteDenied { .. })));
}

#[tokio::test]
async fn test_suspended_tenant() {
    let harness = Harness::in_memory();
    let acme = harness.tenant("acme").await;

    let suspended = harness.registry.set_active(&acme.id, false).await.unwrap();
    let err = harness
        .resolver
        .resolve_tenant("acme.example.com")
        .await
        .unwrap_err();
    assert!(is_tenant_error(&err, |e| matches!(e, TenantError::TenantSuspended { .. })));

    let err = harness
        .router
        .bind(&suspended, RequestMetadata::new())
        .unwrap_err();
    assert!(is_tenant_error(&err, |e| matches!(
        e,
        TenantError::ConnectionUnavailable { .. }
    )));
}

#[tokio::test]
async fn test_registry_changes_apply_to_later_resolutions() {
    let harness = Harness::in_memory();
    let acme = harness.tenant("acme").await;

    let snapshot = harness
        .resolver
        .resolve_tenant("acme.example.com")
        .await
        .unwrap();
    harness
        .registry
        .detach_domain(&acme.id, "acme.example.com")
        .await
        .unwrap();

    // The earlier snapshot is unaffected
    assert!(snapshot.owns_domain("acme.example.com"));
    assert!(harness
        .resolver
        .resolve_tenant("acme.example.com")
        .await
        .is_err());
}

// ============================================================================
// Isolation
// ============================================================================

#[tokio::test]
async fn test_same_local_id_in_two_tenants() {
    let harness = Harness::in_memory();
    let acme = harness.tenant("acme").await;
    let globex = harness.tenant("globex").await;
    let clients = manager("clients");
    let def = clients.definition().clone();

    {
        let mut ctx = harness.bind(&acme, "10.0.0.1");
        insert(&mut ctx, &clients, json!({"id": "c-1", "nome": "Acme client"})).await;
    }
    {
        let mut ctx = harness.bind(&globex, "10.0.0.2");
        insert(&mut ctx, &clients, json!({"id": "c-1", "nome": "Globex client"})).await;
    }

    // Trash in acme only
    {
        let mut ctx = harness.bind(&acme, "10.0.0.1");
        clients
            .move_to_trash(&mut ctx, "c-1", Some("acme-admin"), None)
            .await
            .unwrap();
    }

    let mut ctx = harness.bind(&globex, "10.0.0.2");
    let record = ctx
        .fetch(&def, "c-1", EntityLifecycleScope::Default)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.data["nome"], "Globex client");
    assert_eq!(ctx.count(&def, EntityLifecycleScope::TrashOnly).await.unwrap(), 0);

    let mut ctx = harness.bind(&acme, "10.0.0.1");
    let record = ctx
        .fetch(&def, "c-1", EntityLifecycleScope::TrashOnly)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.data["nome"], "Acme client");
}

#[tokio::test]
async fn test_similar_tenant_ids_get_separate_stores() {
    let harness = Harness::on_disk();
    let mut tenants = Vec::new();
    for (id, domain) in [("a-b", "dashed.example.com"), ("a_b", "underscored.example.com")] {
        let tenant = harness
            .registry
            .create_tenant(NewTenant::new(id, id).with_domain(domain))
            .await
            .unwrap();
        harness.router.provision(&tenant).unwrap();
        tenants.push(tenant);
    }
    let clients = manager("clients");
    let def = clients.definition().clone();

    {
        let mut ctx = harness.bind(&tenants[0], "10.0.0.1");
        insert(&mut ctx, &clients, json!({"id": "secret", "nome": "dashed only"})).await;
    }

    let mut ctx = harness.bind(&tenants[1], "10.0.0.2");
    assert_eq!(ctx.count(&def, EntityLifecycleScope::Unscoped).await.unwrap(), 0);
    assert!(
        ctx.fetch(&def, "secret", EntityLifecycleScope::Unscoped)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_stay_in_their_tenant() {
    let harness = Arc::new(Harness::on_disk());
    let tenants = vec![
        harness.tenant("acme").await,
        harness.tenant("globex").await,
        harness.tenant("initech").await,
    ];

    let mut handles = Vec::new();
    for tenant in &tenants {
        for n in 0..10 {
            let harness = harness.clone();
            let tenant = tenant.clone();
            handles.push(tokio::spawn(async move {
                let clients = manager("clients");
                let mut ctx = harness.bind(&tenant, "10.0.0.1");
                insert(
                    &mut ctx,
                    &clients,
                    json!({"nome": format!("{} #{n}", tenant.id)}),
                )
                .await;
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let clients = manager("clients");
    for tenant in &tenants {
        let mut ctx = harness.bind(tenant, "10.0.0.1");
        let page = ctx
            .list(
                clients.definition(),
                EntityLifecycleScope::Default,
                atrium_persistence::types::Pagination::new(0, 100),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 10);
        let prefix = format!("{} #", tenant.id);
        assert!(page
            .items
            .iter()
            .all(|r| r.data["nome"].as_str().unwrap().starts_with(&prefix)));
    }
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn test_unprovisioned_store_is_unavailable() {
    let harness = Harness::on_disk();
    let tenant = harness
        .registry
        .create_tenant(NewTenant::new("acme", "Acme").with_domain("acme.example.com"))
        .await
        .unwrap();

    let err = harness
        .router
        .bind(&tenant, RequestMetadata::new())
        .unwrap_err();
    assert!(is_tenant_error(&err, |e| matches!(
        e,
        TenantError::ConnectionUnavailable { .. }
    )));

    harness.router.provision(&tenant).unwrap();
    assert!(harness.router.bind(&tenant, RequestMetadata::new()).is_ok());
}

#[tokio::test]
async fn test_pool_eviction_keeps_data() {
    let harness = Harness::on_disk_with(DatabasePerTenantConfig::new().with_max_pools(2));
    let clients = manager("clients");
    let acme = harness.tenant("acme").await;

    {
        let mut ctx = harness.bind(&acme, "10.0.0.1");
        insert(&mut ctx, &clients, json!({"id": "kept", "nome": "Ana"})).await;
    }

    for id in ["globex", "initech", "umbrella"] {
        let tenant = harness.tenant(id).await;
        drop(harness.bind(&tenant, "10.0.0.1"));
        std::thread::sleep(std::time::Duration::from_millis(2));
    }
    assert!(harness.router.open_pools() <= 3);

    let mut ctx = harness.bind(&acme, "10.0.0.1");
    assert!(ctx
        .fetch(clients.definition(), "kept", EntityLifecycleScope::Default)
        .await
        .unwrap()
        .is_some());
}
