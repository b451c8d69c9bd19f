#![allow(dead_code)]

use ledger_sync::application::ports::mutation_gateway::{
    DomainMutationGateway, RemoteError, RemoteMutationRequest,
};
use ledger_sync::application::services::StatusNotification;
use ledger_sync::domain::value_objects::RemoteId;
use ledger_sync::infrastructure::PlatformConnectivitySource;
use ledger_sync::{AppConfig, AppState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const POLL_ATTEMPTS: usize = 200;
const POLL_INTERVAL: Duration = Duration::from_millis(10);

type Responder =
    Box<dyn Fn(&RemoteMutationRequest, usize) -> Result<RemoteId, RemoteError> + Send + Sync>;

/// Gateway double that records every request and answers through a script.
pub struct ScriptedGateway {
    requests: Mutex<Vec<RemoteMutationRequest>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
    responder: Responder,
}

impl ScriptedGateway {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&RemoteMutationRequest, usize) -> Result<RemoteId, RemoteError>
            + Send
            + Sync
            + 'static,
    {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: None,
            responder: Box::new(responder),
        })
    }

    pub fn accept_all() -> Arc<Self> {
        Self::new(|_, call| Ok(remote_id(&format!("remote-{call}"))))
    }

    pub fn slow_accept_all(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: Some(delay),
            responder: Box::new(|_, call| Ok(remote_id(&format!("remote-{call}")))),
        })
    }

    pub fn requests(&self) -> Vec<RemoteMutationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DomainMutationGateway for ScriptedGateway {
    async fn submit(&self, request: RemoteMutationRequest) -> Result<RemoteId, RemoteError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(&request, call)
    }
}

pub fn remote_id(value: &str) -> RemoteId {
    RemoteId::new(value.to_string()).unwrap()
}

pub struct TestApp {
    pub state: AppState,
    pub connectivity: Arc<PlatformConnectivitySource>,
    pub notifications: Arc<Mutex<Vec<StatusNotification>>>,
    _dir: Arc<TempDir>,
}

pub fn config_for(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = format!("sqlite://{}", dir.path().join("outbox.db").display());
    config.sync.sync_on_startup = false;
    config.sync.auto_sync_on_reconnect = true;
    config
}

pub async fn start_app(gateway: Arc<dyn DomainMutationGateway>, online: bool) -> TestApp {
    let connectivity = Arc::new(PlatformConnectivitySource::new(online));
    start_app_with(gateway, connectivity).await
}

pub async fn start_app_with(
    gateway: Arc<dyn DomainMutationGateway>,
    connectivity: Arc<PlatformConnectivitySource>,
) -> TestApp {
    let dir = Arc::new(tempfile::tempdir().unwrap());
    start_app_in(dir, gateway, connectivity).await
}

pub async fn start_app_in(
    dir: Arc<TempDir>,
    gateway: Arc<dyn DomainMutationGateway>,
    connectivity: Arc<PlatformConnectivitySource>,
) -> TestApp {
    let state = AppState::with_collaborators(config_for(&dir), gateway, connectivity.clone())
        .await
        .unwrap();

    let notifications = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&notifications);
    state
        .reporter
        .subscribe(Arc::new(move |notification: &StatusNotification| {
            sink.lock().unwrap().push(notification.clone());
        }));

    TestApp {
        state,
        connectivity,
        notifications,
        _dir: dir,
    }
}

impl TestApp {
    /// Waits up to two seconds for the outbox to empty.
    pub async fn wait_until_drained(&self) -> bool {
        for _ in 0..POLL_ATTEMPTS {
            if self.state.outbox_service.count(None).await.unwrap() == 0 {
                return true;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        false
    }

    /// Waits up to two seconds for a notification matching `predicate`.
    pub async fn wait_for_notification<F>(&self, predicate: F) -> bool
    where
        F: Fn(&StatusNotification) -> bool,
    {
        for _ in 0..POLL_ATTEMPTS {
            if self.notifications.lock().unwrap().iter().any(&predicate) {
                return true;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        false
    }
}
