//! Raw-Query Gate Tests
//!
//! Plugin statements through the host and context:
//! - Only statements on the permitted table reach the store
//! - Every table in a list, USING clause or commented clause is checked
//! - DDL and stacked statements are refused
//! - Teardown closes the shared connection and stops the host

mod common;

use serde_json::json;

use common::{seeded_store, services};
use tenantql::gate::{HostError, RawQueryError};

// =============================================================================
// Validation Chain Tests
// =============================================================================

#[tokio::test]
async fn test_gate_properties() {
    let store = seeded_store();
    let services = services(store.clone());
    services.plugins.init();
    services.plugins.register("reports").unwrap();
    let context = services.plugins.context("reports", "acme").unwrap();

    assert!(matches!(
        context.query("DROP TABLE data", &[]).await,
        Err(RawQueryError::ForbiddenStatement(_))
    ));
    assert!(matches!(
        context.query("SELECT * FROM users", &[]).await,
        Err(RawQueryError::TableNotAllowed(_))
    ));
    assert!(store.statements().is_empty());

    let accepted = context
        .query("SELECT * FROM data WHERE sid=$1", &[json!(context.sid())])
        .await;
    assert!(accepted.is_ok());
    assert_eq!(store.statements().len(), 1);

    let metrics = services.metrics.snapshot();
    assert_eq!(metrics.raw_queries_rejected, 2);
    assert_eq!(metrics.raw_queries_executed, 1);
}

/// Credentials stay out of reach however the statement names them.
#[tokio::test]
async fn test_credentials_table_unreachable() {
    let store = seeded_store();
    let services = services(store.clone());
    services.plugins.init();
    services.plugins.register("reports").unwrap();
    let context = services.plugins.context("reports", "acme").unwrap();

    let statements = [
        "SELECT * FROM data, api_keys",
        "DELETE FROM data USING api_keys WHERE data.sid = api_keys.sid",
        "SELECT * FROM data WHERE id IN (SELECT token FROM/**/api_keys)",
    ];
    for sql in statements {
        match context.query(sql, &[]).await {
            Err(RawQueryError::TableNotAllowed(table)) => assert_eq!(table, "api_keys", "{sql}"),
            other => panic!("{sql}: expected TableNotAllowed, got {:?}", other),
        }
    }

    assert!(store.statements().is_empty());
    assert_eq!(services.metrics.snapshot().raw_queries_rejected, 3);
}

/// A rejected call does not poison the shared connection.
#[tokio::test]
async fn test_rejection_is_per_call() {
    let services = services(seeded_store());
    services.plugins.init();
    services.plugins.register("reports").unwrap();
    let context = services.plugins.context("reports", "acme").unwrap();

    assert!(context
        .query("SELECT * FROM data; DELETE FROM data", &[])
        .await
        .is_err());
    assert!(context
        .query("SELECT id FROM data WHERE sid = $1", &[json!("acme")])
        .await
        .is_ok());
}

// =============================================================================
// Host Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_teardown_stops_host() {
    let services = services(seeded_store());
    services.plugins.init();
    services.plugins.register("reports").unwrap();

    let context = services.plugins.context("reports", "acme").unwrap();
    context.query("SELECT id FROM data", &[]).await.unwrap();
    assert!(services.connection.is_connected());

    services.plugins.teardown().await.unwrap();
    assert!(!services.connection.is_connected());
    assert_eq!(
        services.plugins.context("reports", "acme").err(),
        Some(HostError::HostNotRunning)
    );
}

/// Plugin and API traffic share one connection.
#[tokio::test]
async fn test_context_close_is_idempotent() {
    let services = services(seeded_store());
    services.plugins.init();
    services.plugins.register("reports").unwrap();
    let context = services.plugins.context("reports", "globex").unwrap();

    context.query("SELECT id FROM data", &[]).await.unwrap();
    context.close().await;
    context.end().await;
    assert!(!services.connection.is_connected());

    // the next statement reconnects
    context.query("SELECT id FROM data", &[]).await.unwrap();
    assert!(services.connection.is_connected());
}
