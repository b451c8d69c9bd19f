mod common;

use common::{ScriptedGateway, config_for, start_app_in};
use ledger_sync::AppError;
use ledger_sync::application::ports::OutboxStore;
use ledger_sync::domain::entities::{AttachmentRef, ExpensePayload, MutationDraft};
use ledger_sync::domain::value_objects::{EntityKind, MutationStatus};
use ledger_sync::infrastructure::{ConnectionPool, PlatformConnectivitySource, SqliteOutboxStore};
use bytes::Bytes;
use std::sync::Arc;

async fn open_store(dir: &tempfile::TempDir) -> (ConnectionPool, SqliteOutboxStore) {
    let pool = ConnectionPool::new(&config_for(dir).database).await.unwrap();
    pool.migrate().await.unwrap();
    let store = SqliteOutboxStore::new(pool.clone_pool());
    (pool, store)
}

fn receipt_expense() -> MutationDraft {
    MutationDraft::new(
        ExpensePayload::new(
            "Hotel".into(),
            189.0,
            "2024-03-02".into(),
            "Lodging".into(),
        )
        .with_location("Lisbon")
        .with_attachment(AttachmentRef::new(
            "folio.pdf".into(),
            Some("application/pdf".into()),
            Bytes::from_static(b"%PDF-1.7 \x00\x01\x02"),
        ))
        .into(),
    )
}

#[tokio::test]
async fn queued_records_survive_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let draft = receipt_expense();
    let expected_payload = draft.payload.clone();

    let (pool, store) = open_store(&dir).await;
    let id = store.enqueue(draft).await.unwrap();
    pool.close().await;

    let (pool, store) = open_store(&dir).await;
    let record = store.get(EntityKind::Expense, id).await.unwrap().unwrap();
    assert_eq!(record.payload, expected_payload);
    assert_eq!(record.status, MutationStatus::Pending);
    pool.close().await;
}

#[tokio::test]
async fn interrupted_cycle_is_redelivered_with_the_same_key() {
    let dir = Arc::new(tempfile::tempdir().unwrap());

    let (pool, store) = open_store(&dir).await;
    let draft = receipt_expense();
    let key = draft.idempotency_key.clone();
    let id = store.enqueue(draft).await.unwrap();
    store.mark_syncing(EntityKind::Expense, id).await.unwrap();
    pool.close().await;

    let gateway = ScriptedGateway::accept_all();
    let app = start_app_in(
        dir.clone(),
        gateway.clone(),
        Arc::new(PlatformConnectivitySource::new(true)),
    )
    .await;

    let record = app
        .state
        .outbox_service
        .get(EntityKind::Expense, id)
        .await
        .unwrap();
    assert_eq!(record.status, MutationStatus::Pending);

    let report = app
        .state
        .orchestrator
        .trigger_sync()
        .await
        .report()
        .cloned()
        .unwrap();
    assert_eq!(report.succeeded, 1);

    let requests = gateway.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].idempotency_key, key);
    assert_eq!(
        requests[0].attachment.as_ref().map(|a| a.bytes.clone()),
        Some(Bytes::from_static(b"%PDF-1.7 \x00\x01\x02"))
    );
    app.state.shutdown().await;
}

#[tokio::test]
async fn unavailable_storage_fails_the_save_and_leaves_nothing_behind() {
    let dir = Arc::new(tempfile::tempdir().unwrap());
    let app = start_app_in(
        dir.clone(),
        ScriptedGateway::accept_all(),
        Arc::new(PlatformConnectivitySource::new(false)),
    )
    .await;

    app.state.pool.close().await;
    let err = app
        .state
        .outbox_service
        .save_mutation_offline(receipt_expense().payload)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Storage(_)));
    assert!(app.notifications.lock().unwrap().is_empty());

    let (pool, store) = open_store(&dir).await;
    assert_eq!(store.count(None).await.unwrap(), 0);
    pool.close().await;
}

#[tokio::test]
async fn invalid_configuration_is_rejected_before_opening_storage() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(&dir);
    config.remote.base_url = "ftp://example.com".into();

    let result = ledger_sync::AppState::with_collaborators(
        config,
        ScriptedGateway::accept_all(),
        Arc::new(PlatformConnectivitySource::new(true)),
    )
    .await;
    assert!(result.is_err());
    assert!(!dir.path().join("outbox.db").exists());
}
