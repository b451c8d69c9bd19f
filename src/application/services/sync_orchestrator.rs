use super::connectivity_monitor::{ConnectivityMonitor, ConnectivityTransition};
use super::mutation_replayer::MutationReplayer;
use crate::application::ports::mutation_gateway::RemoteError;
use crate::application::ports::outbox_store::OutboxStore;
use crate::application::ports::sync_event_sink::{SyncEvent, SyncEventSink};
use crate::domain::entities::{CycleEnd, DrainOutcome, DrainReport, PendingMutation};
use crate::domain::value_objects::EntityKind;
use crate::infrastructure::outbox::metrics;
use crate::shared::error::AppError;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

const OFFLINE_REASON: &str = "connectivity lost";

#[derive(Debug, Default)]
struct CycleTally {
    attempted: u32,
    succeeded: u32,
    failed: u32,
}

/// Drains the outbox through the replayer. At most one cycle runs at a time.
pub struct SyncOrchestrator {
    store: Arc<dyn OutboxStore>,
    replayer: Arc<MutationReplayer>,
    connectivity: Arc<ConnectivityMonitor>,
    sink: Arc<dyn SyncEventSink>,
    gate: Mutex<()>,
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<dyn OutboxStore>,
        replayer: Arc<MutationReplayer>,
        connectivity: Arc<ConnectivityMonitor>,
        sink: Arc<dyn SyncEventSink>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            replayer,
            connectivity,
            sink,
            gate: Mutex::new(()),
        })
    }

    pub fn is_running(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    /// Runs one drain cycle, or returns [`DrainOutcome::Skipped`] when one is already running.
    pub async fn trigger_sync(&self) -> DrainOutcome {
        // The guard drops on every exit path, including a panic unwinding through the cycle.
        let Ok(_guard) = self.gate.try_lock() else {
            tracing::debug!(target: "outbox::sync", "drain already running; trigger ignored");
            return DrainOutcome::Skipped;
        };

        let started = Instant::now();
        self.sink.emit(&SyncEvent::CycleStarted);

        let mut tally = CycleTally::default();
        let end = match self.drain(&mut tally).await {
            Ok(end) => end,
            Err(err) => {
                tracing::error!(
                    target: "outbox::sync",
                    error = %err,
                    "drain cycle stopped on a store error"
                );
                CycleEnd::Errored {
                    message: err.to_string(),
                }
            }
        };

        let report = DrainReport::new(
            tally.attempted,
            tally.succeeded,
            tally.failed,
            end,
            started.elapsed().as_millis() as u64,
        );
        metrics::record_cycle(&report);
        tracing::info!(
            target: "outbox::sync",
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            end = ?report.end,
            duration_ms = report.duration_ms,
            "drain cycle finished"
        );
        self.sink.emit(&SyncEvent::CycleFinished(report.clone()));

        DrainOutcome::Completed(report)
    }

    /// Fire-and-forget variant used by event listeners.
    pub fn trigger(self: &Arc<Self>) -> JoinHandle<DrainOutcome> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move { orchestrator.trigger_sync().await })
    }

    /// Starts a drain on every `WentOnline` transition.
    pub fn spawn_reconnect_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let mut transitions = self.connectivity.subscribe();
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match transitions.recv().await {
                    Ok(ConnectivityTransition::WentOnline) => {
                        tracing::info!(target: "outbox::sync", "back online; draining outbox");
                        orchestrator.trigger();
                    }
                    Ok(ConnectivityTransition::WentOffline) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            target: "outbox::sync",
                            skipped,
                            "missed connectivity transitions"
                        );
                        if orchestrator.connectivity.is_online() {
                            orchestrator.trigger();
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    async fn drain(&self, tally: &mut CycleTally) -> Result<CycleEnd, AppError> {
        let mut batches = Vec::with_capacity(EntityKind::ALL.len());
        for kind in EntityKind::ALL {
            batches.push(self.store.list_pending(kind).await?);
        }

        let total = batches.iter().map(Vec::len).sum::<usize>();
        self.sink.emit(&SyncEvent::ItemCount {
            total: u32::try_from(total).unwrap_or(u32::MAX),
        });

        for mutation in batches.into_iter().flatten() {
            if !self.connectivity.is_online() {
                tracing::info!(
                    target: "outbox::sync",
                    kind = %mutation.kind(),
                    id = mutation.id.value(),
                    "offline; leaving remaining records pending"
                );
                return Ok(CycleEnd::Aborted {
                    reason: OFFLINE_REASON.to_string(),
                });
            }

            if let Some(end) = self.process(&mutation, tally).await? {
                return Ok(end);
            }
        }

        Ok(CycleEnd::Exhausted)
    }

    /// Replays one record and applies the resulting transition. `Some` ends the cycle.
    async fn process(
        &self,
        mutation: &PendingMutation,
        tally: &mut CycleTally,
    ) -> Result<Option<CycleEnd>, AppError> {
        let kind = mutation.kind();
        let id = mutation.id;

        match self.store.mark_syncing(kind, id).await {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {
                tracing::warn!(
                    target: "outbox::sync",
                    kind = %kind,
                    id = id.value(),
                    "record vanished before replay; skipping"
                );
                return Ok(None);
            }
            Err(err) => return Err(err),
        }
        tally.attempted += 1;

        match self.replayer.replay(mutation).await {
            Ok(_) => {
                skip_vanished(self.store.remove(kind, id).await, kind, mutation)?;
                tally.succeeded += 1;
                Ok(None)
            }
            Err(RemoteError::Validation(message)) => {
                skip_vanished(
                    self.store.mark_failed(kind, id, &message).await,
                    kind,
                    mutation,
                )?;
                tally.failed += 1;
                tracing::warn!(
                    target: "outbox::sync",
                    kind = %kind,
                    id = id.value(),
                    error = %message,
                    "server rejected record"
                );
                self.sink.emit(&SyncEvent::ItemFailed {
                    kind,
                    id,
                    error: message,
                });
                Ok(None)
            }
            Err(RemoteError::Transport(message)) => {
                skip_vanished(self.store.mark_pending(kind, id).await, kind, mutation)?;
                tracing::info!(
                    target: "outbox::sync",
                    kind = %kind,
                    id = id.value(),
                    error = %message,
                    "transport failure; aborting cycle"
                );
                Ok(Some(CycleEnd::Aborted { reason: message }))
            }
        }
    }
}

fn skip_vanished(
    result: Result<(), AppError>,
    kind: EntityKind,
    mutation: &PendingMutation,
) -> Result<(), AppError> {
    match result {
        Err(err) if err.is_not_found() => {
            tracing::warn!(
                target: "outbox::sync",
                kind = %kind,
                id = mutation.id.value(),
                "record vanished after replay"
            );
            Ok(())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::mutation_gateway::{
        DomainMutationGateway, RemoteMutationRequest,
    };
    use crate::domain::entities::{ExpensePayload, MutationDraft, TripPayload};
    use crate::domain::value_objects::{IdempotencyKey, MutationId, MutationStatus, RemoteId};
    use crate::infrastructure::connectivity::PlatformConnectivitySource;
    use crate::infrastructure::outbox::SqliteOutboxStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use mockall::mock;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    mock! {
        pub Gateway {}

        #[async_trait]
        impl DomainMutationGateway for Gateway {
            async fn submit(&self, request: RemoteMutationRequest) -> Result<RemoteId, RemoteError>;
        }
    }

    mock! {
        pub Store {}

        #[async_trait]
        impl OutboxStore for Store {
            async fn enqueue(&self, draft: MutationDraft) -> Result<MutationId, AppError>;
            async fn list_pending(&self, kind: EntityKind) -> Result<Vec<PendingMutation>, AppError>;
            async fn list_failed(&self, kind: EntityKind) -> Result<Vec<PendingMutation>, AppError>;
            async fn get(&self, kind: EntityKind, id: MutationId) -> Result<Option<PendingMutation>, AppError>;
            async fn mark_syncing(&self, kind: EntityKind, id: MutationId) -> Result<(), AppError>;
            async fn mark_pending(&self, kind: EntityKind, id: MutationId) -> Result<(), AppError>;
            async fn mark_failed(&self, kind: EntityKind, id: MutationId, error: &str) -> Result<(), AppError>;
            async fn remove(&self, kind: EntityKind, id: MutationId) -> Result<(), AppError>;
            async fn count(&self, kind: Option<EntityKind>) -> Result<u64, AppError>;
            async fn recover_in_flight(&self) -> Result<u64, AppError>;
        }
    }

    fn queued_expense(id: i64, merchant: &str) -> PendingMutation {
        PendingMutation::new(
            MutationId::new(id).unwrap(),
            IdempotencyKey::generate(),
            ExpensePayload::new(merchant.into(), 10.0, "2024-01-15".into(), "Food".into()).into(),
            MutationStatus::Pending,
            Utc::now(),
            None,
        )
    }

    /// Store whose expense table holds `expenses` and whose trip table is empty.
    fn store_listing(expenses: Vec<PendingMutation>) -> MockStore {
        let mut store = MockStore::new();
        store.expect_list_pending().returning(move |kind| match kind {
            EntityKind::Expense => Ok(expenses.clone()),
            EntityKind::Trip => Ok(Vec::new()),
        });
        store
    }

    #[derive(Default)]
    struct RecordingSink {
        events: StdMutex<Vec<SyncEvent>>,
    }

    impl RecordingSink {
        fn finished(&self) -> Vec<DrainReport> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter_map(|event| match event {
                    SyncEvent::CycleFinished(report) => Some(report.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    impl SyncEventSink for RecordingSink {
        fn emit(&self, event: &SyncEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    /// Blocks every submit until released.
    struct GatedGateway {
        calls: AtomicUsize,
        release: Notify,
    }

    #[async_trait]
    impl DomainMutationGateway for GatedGateway {
        async fn submit(&self, _request: RemoteMutationRequest) -> Result<RemoteId, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            Ok(RemoteId::new("remote".into()).unwrap())
        }
    }

    struct Fixture {
        store: Arc<SqliteOutboxStore>,
        source: Arc<PlatformConnectivitySource>,
        sink: Arc<RecordingSink>,
    }

    async fn fixture() -> Fixture {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        Fixture {
            store: Arc::new(SqliteOutboxStore::new(pool)),
            source: Arc::new(PlatformConnectivitySource::new(true)),
            sink: Arc::new(RecordingSink::default()),
        }
    }

    impl Fixture {
        fn orchestrator(&self, gateway: Arc<dyn DomainMutationGateway>) -> Arc<SyncOrchestrator> {
            SyncOrchestrator::new(
                self.store.clone(),
                Arc::new(MutationReplayer::new(gateway)),
                ConnectivityMonitor::new(self.source.clone()),
                self.sink.clone(),
            )
        }

        async fn enqueue_expense(&self, merchant: &str, category: &str) {
            self.store
                .enqueue(MutationDraft::new(
                    ExpensePayload::new(
                        merchant.into(),
                        10.0,
                        "2024-01-15".into(),
                        category.into(),
                    )
                    .into(),
                ))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn rejected_record_does_not_block_the_rest() {
        let fx = fixture().await;
        for merchant in ["first", "second", "third"] {
            fx.enqueue_expense(merchant, "Food").await;
        }

        let mut gateway = MockGateway::new();
        gateway.expect_submit().times(3).returning(|request| {
            if request.fields.get("merchant") == Some(&serde_json::json!("second")) {
                Err(RemoteError::Validation("Category is required".into()))
            } else {
                Ok(RemoteId::new("ok".into()).unwrap())
            }
        });

        let outcome = fx.orchestrator(Arc::new(gateway)).trigger_sync().await;
        let report = outcome.report().unwrap();
        assert_eq!((report.attempted, report.succeeded, report.failed), (3, 2, 1));
        assert_eq!(report.end, CycleEnd::Exhausted);

        assert!(fx.store.list_pending(EntityKind::Expense).await.unwrap().is_empty());
        let failed = fx.store.list_failed(EntityKind::Expense).await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].last_error.as_deref(), Some("Category is required"));
        assert_eq!(fx.sink.finished().len(), 1);
    }

    #[tokio::test]
    async fn going_offline_leaves_remaining_records_pending() {
        let fx = fixture().await;
        for name in ["one", "two", "three"] {
            fx.store
                .enqueue(MutationDraft::new(
                    TripPayload::new(name.into(), "2024-02-01".into()).into(),
                ))
                .await
                .unwrap();
        }

        let source = fx.source.clone();
        let mut gateway = MockGateway::new();
        gateway.expect_submit().times(1).returning(move |_| {
            source.report(false);
            Ok(RemoteId::new("trip_1".into()).unwrap())
        });

        let report = fx
            .orchestrator(Arc::new(gateway))
            .trigger_sync()
            .await
            .report()
            .cloned()
            .unwrap();
        assert!(report.is_aborted());
        assert_eq!((report.attempted, report.succeeded), (1, 1));

        let pending = fx.store.list_pending(EntityKind::Trip).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|m| m.status == MutationStatus::Pending));
    }

    #[tokio::test]
    async fn transport_failure_releases_record_and_aborts() {
        let fx = fixture().await;
        fx.enqueue_expense("a", "Food").await;
        fx.enqueue_expense("b", "Food").await;

        let mut gateway = MockGateway::new();
        gateway
            .expect_submit()
            .times(1)
            .returning(|_| Err(RemoteError::Transport("connection reset".into())));

        let report = fx
            .orchestrator(Arc::new(gateway))
            .trigger_sync()
            .await
            .report()
            .cloned()
            .unwrap();
        assert_eq!(
            report.end,
            CycleEnd::Aborted {
                reason: "connection reset".into()
            }
        );

        let pending = fx.store.list_pending(EntityKind::Expense).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|m| m.status == MutationStatus::Pending));
        assert!(fx.store.list_failed(EntityKind::Expense).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn overlapping_trigger_is_a_no_op() {
        let fx = fixture().await;
        fx.enqueue_expense("slow", "Food").await;

        let gateway = Arc::new(GatedGateway {
            calls: AtomicUsize::new(0),
            release: Notify::new(),
        });
        let orchestrator = fx.orchestrator(gateway.clone());

        let first = orchestrator.trigger();
        while gateway.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert!(orchestrator.is_running());

        assert_eq!(orchestrator.trigger_sync().await, DrainOutcome::Skipped);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);

        gateway.release.notify_one();
        let report = first.await.unwrap().report().cloned().unwrap();
        assert_eq!(report.succeeded, 1);
        assert!(!orchestrator.is_running());
        assert_eq!(fx.sink.finished().len(), 1);
    }

    #[tokio::test]
    async fn empty_outbox_still_reports_once() {
        let fx = fixture().await;
        let mut gateway = MockGateway::new();
        gateway.expect_submit().never();

        let report = fx
            .orchestrator(Arc::new(gateway))
            .trigger_sync()
            .await
            .report()
            .cloned()
            .unwrap();
        assert_eq!(report.attempted, 0);
        assert_eq!(fx.sink.finished(), vec![report]);
    }

    #[tokio::test]
    async fn reconnect_transition_starts_a_drain() {
        let fx = fixture().await;
        fx.source.report(false);
        fx.enqueue_expense("queued", "Food").await;

        let mut gateway = MockGateway::new();
        gateway
            .expect_submit()
            .times(1)
            .returning(|_| Ok(RemoteId::new("exp".into()).unwrap()));

        let monitor = ConnectivityMonitor::new(fx.source.clone());
        let orchestrator = SyncOrchestrator::new(
            fx.store.clone(),
            Arc::new(MutationReplayer::new(Arc::new(gateway))),
            monitor.clone(),
            fx.sink.clone(),
        );
        monitor.start();
        let listener = orchestrator.spawn_reconnect_listener();

        fx.source.report(true);
        for _ in 0..200 {
            if fx.store.count(None).await.unwrap() == 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(fx.store.count(None).await.unwrap(), 0);
        listener.abort();
    }

    #[tokio::test]
    async fn store_failure_mid_cycle_reports_once_and_frees_the_gate() {
        let fx = fixture().await;
        let mut store = store_listing(vec![queued_expense(1, "rejected")]);
        store.expect_mark_syncing().times(2).returning(|_, _| Ok(()));
        store
            .expect_mark_failed()
            .times(2)
            .returning(|_, _, _| Err(AppError::Storage("disk I/O error".into())));

        let mut gateway = MockGateway::new();
        gateway
            .expect_submit()
            .times(2)
            .returning(|_| Err(RemoteError::Validation("Category is required".into())));

        let orchestrator = SyncOrchestrator::new(
            Arc::new(store),
            Arc::new(MutationReplayer::new(Arc::new(gateway))),
            ConnectivityMonitor::new(fx.source.clone()),
            fx.sink.clone(),
        );

        let report = orchestrator.trigger_sync().await.report().cloned().unwrap();
        assert!(matches!(
            report.end,
            CycleEnd::Errored { ref message } if message.contains("disk I/O error")
        ));
        assert_eq!((report.attempted, report.failed), (1, 0));
        assert!(!orchestrator.is_running());
        assert_eq!(fx.sink.finished(), vec![report]);
        assert!(
            !fx.sink
                .events
                .lock()
                .unwrap()
                .iter()
                .any(|event| matches!(event, SyncEvent::ItemFailed { .. }))
        );

        let again = orchestrator.trigger_sync().await;
        assert_ne!(again, DrainOutcome::Skipped);
        assert_eq!(fx.sink.finished().len(), 2);
    }

    #[tokio::test]
    async fn vanished_record_is_skipped_without_ending_the_cycle() {
        let fx = fixture().await;
        let mut store =
            store_listing(vec![queued_expense(1, "deleted"), queued_expense(2, "kept")]);
        store
            .expect_mark_syncing()
            .times(2)
            .returning(|kind, id| match id.value() {
                1 => Err(AppError::NotFound(format!("{kind} #1"))),
                _ => Ok(()),
            });
        store
            .expect_remove()
            .withf(|_, id| id.value() == 2)
            .times(1)
            .returning(|_, _| Ok(()));

        let mut gateway = MockGateway::new();
        gateway
            .expect_submit()
            .withf(|request| request.fields.get("merchant") == Some(&serde_json::json!("kept")))
            .times(1)
            .returning(|_| Ok(RemoteId::new("exp_2".into()).unwrap()));

        let orchestrator = SyncOrchestrator::new(
            Arc::new(store),
            Arc::new(MutationReplayer::new(Arc::new(gateway))),
            ConnectivityMonitor::new(fx.source.clone()),
            fx.sink.clone(),
        );

        let report = orchestrator.trigger_sync().await.report().cloned().unwrap();
        assert_eq!(report.end, CycleEnd::Exhausted);
        assert_eq!((report.attempted, report.succeeded, report.failed), (1, 1, 0));
        assert_eq!(fx.sink.finished().len(), 1);
    }

    #[tokio::test]
    async fn record_removed_during_replay_still_counts_as_synced() {
        let fx = fixture().await;
        let mut store = store_listing(vec![queued_expense(7, "raced")]);
        store.expect_mark_syncing().times(1).returning(|_, _| Ok(()));
        store
            .expect_remove()
            .times(1)
            .returning(|kind, id| Err(AppError::NotFound(format!("{kind} #{}", id.value()))));

        let mut gateway = MockGateway::new();
        gateway
            .expect_submit()
            .times(1)
            .returning(|_| Ok(RemoteId::new("exp_7".into()).unwrap()));

        let orchestrator = SyncOrchestrator::new(
            Arc::new(store),
            Arc::new(MutationReplayer::new(Arc::new(gateway))),
            ConnectivityMonitor::new(fx.source.clone()),
            fx.sink.clone(),
        );

        let report = orchestrator.trigger_sync().await.report().cloned().unwrap();
        assert_eq!(report.end, CycleEnd::Exhausted);
        assert_eq!(report.succeeded, 1);
    }
}
