//! Startup orchestration on the hub's background thread.
//!
//! # Responsibilities
//! - Build a single-threaded event loop on a dedicated thread
//! - Initialize the hub and seed the store on that thread
//! - Report readiness (or the failure that prevented it) to the controller
//! - Serve until the stop signal fires
//!
//! # Design Decisions
//! - The readiness report carries the handle, so the controller never
//!   reads anything the background thread has not explicitly published
//! - Readiness is sent from a task on the loop, so it fires only once the
//!   loop is actually running
//! - Every store access happens on the loop thread

use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::mpsc::SyncSender;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tokio::runtime::{Builder, Handle};
use tokio::sync::oneshot;

use super::controller::ControllerError;
use super::seed::Seeder;
use super::shutdown::Shutdown;
use crate::config::HubConfig;
use crate::db::{self, Database};
use crate::hub::api::lock_db;
use crate::hub::{Hub, HubError};

/// Name given to the hub's background thread.
pub const THREAD_NAME: &str = "hub-loop";

/// What the background thread reports once startup settles.
pub type Readiness = Result<HubHandle, HubError>;

/// Cross-thread handle to a running hub, published with the readiness report.
#[derive(Clone)]
pub struct HubHandle {
    addr: SocketAddr,
    runtime: Handle,
    shutdown: Shutdown,
    db: Arc<Mutex<Database>>,
}

impl HubHandle {
    /// The address the hub is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL of the hub.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Run `f` against the store on the hub's loop thread and wait for it.
    ///
    /// Blocks the calling thread; must not be called from inside a runtime.
/// A panic inside `f` is reported as [`ControllerError::CallPanicked`] and
/// leaves the loop running.
    pub fn call<F, R>(&self, f: F) -> Result<R, ControllerError>
    where
        F: FnOnce(&mut Database) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let db = self.db.clone();
        let task = self.runtime.spawn(async move { f(&mut lock_db(&db)) });
        self.runtime.spawn(async move {
            let _ = tx.send(task.await);
        });

        match rx.blocking_recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) if e.is_panic() => Err(ControllerError::CallPanicked),
            Ok(Err(_)) | Err(_) => Err(ControllerError::LoopClosed),
        }
    }

    /// Enqueue the stop signal on the hub's loop.
    pub fn request_stop(&self) {
        self.shutdown.schedule_on(&self.runtime);
    }
}

/// Start the background thread that owns the hub.
///
/// Startup failures are delivered through `ready`; the thread's own result
/// only reflects errors raised after readiness.
pub(crate) fn spawn_hub_thread(
    config: HubConfig,
    seeder: Arc<dyn Seeder>,
    ready: SyncSender<Readiness>,
) -> io::Result<JoinHandle<Result<(), HubError>>> {
    thread::Builder::new()
        .name(THREAD_NAME.to_string())
        .spawn(move || run_hub(config, seeder, ready))
}

fn run_hub(
    config: HubConfig,
    seeder: Arc<dyn Seeder>,
    ready: SyncSender<Readiness>,
) -> Result<(), HubError> {
    let runtime = match Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            report_failure(&ready, HubError::Runtime(e));
            return Ok(());
        }
    };

    runtime.block_on(async move {
        let hub = match prepare(config, seeder.as_ref()).await {
            Ok(hub) => hub,
            Err(e) => {
                report_failure(&ready, e);
                return Ok(());
            }
        };

        let shutdown = Shutdown::new();
        let stop = shutdown.subscribe();
        let artifact = lock_db(&hub.db()).path().map(Path::to_path_buf);
        let handle = HubHandle {
            addr: hub.local_addr(),
            runtime: Handle::current(),
            shutdown: shutdown.clone(),
            db: hub.db(),
        };

        // Nobody is left to stop an unclaimed hub, so it stops itself.
        let announced = tokio::spawn(async move {
            if ready.send(Ok(handle)).is_err() {
                tracing::warn!("Controller stopped waiting before the hub became ready; stopping");
                shutdown.trigger();
                return false;
            }
            true
        });

        let result = hub.run(stop).await;
        if let Ok(false) = announced.await {
            discard_artifact(artifact.as_deref());
        }
        result
    })
}

fn discard_artifact(path: Option<&Path>) {
    if let Some(path) = path {
        if let Err(e) = db::remove_artifact(path) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove store artifact");
        }
    }
}

/// Initialize the hub and write the baseline state.
async fn prepare(config: HubConfig, seeder: &dyn Seeder) -> Result<Hub, HubError> {
    let hub = Hub::initialize(config).await?;
    {
        let db = hub.db();
        let mut db = lock_db(&db);
        seeder.seed(&mut db)?;
    }
    Ok(hub)
}

fn report_failure(ready: &SyncSender<Readiness>, error: HubError) {
    tracing::error!(error = %error, "Hub failed to start");
    let _ = ready.send(Err(error));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DbError, User};
    use crate::mocking::{MockPamAuthenticator, MockSpawner};
    use std::sync::mpsc;
    use std::time::Duration;

    fn config() -> HubConfig {
        HubConfig::new(
            Arc::new(MockPamAuthenticator::new()),
            Arc::new(MockSpawner::with_worker("mock-worker")),
        )
        .with_bind_address("127.0.0.1:0")
        .with_db_url("memory:")
    }

    fn seed_user(db: &mut Database) -> Result<(), DbError> {
        db.add_user(User::new("user"))
    }

    #[test]
    fn test_ready_handle_reaches_the_store() {
        let (tx, rx) = mpsc::sync_channel(1);
        let thread = spawn_hub_thread(config(), Arc::new(seed_user), tx).unwrap();

        let handle = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        assert_eq!(thread.thread().name(), Some(THREAD_NAME));
        assert!(handle.call(|db| db.find_user("user").is_some()).unwrap());

        handle.request_stop();
        thread.join().unwrap().unwrap();
        assert!(matches!(
            handle.call(|db| db.user_count()),
            Err(ControllerError::LoopClosed)
        ));
    }

    #[test]
    fn test_seed_failure_is_reported() {
        let (tx, rx) = mpsc::sync_channel(1);
        let failing = |db: &mut Database| {
            db.add_user(User::new("dup"))?;
            db.add_user(User::new("dup"))
        };
        let thread = spawn_hub_thread(config(), Arc::new(failing), tx).unwrap();

        let readiness = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(
            readiness,
            Err(HubError::Database(DbError::DuplicateUser(_)))
        ));
        thread.join().unwrap().unwrap();
    }

    #[test]
    fn test_panicking_call_keeps_loop_running() {
        let (tx, rx) = mpsc::sync_channel(1);
        let thread = spawn_hub_thread(config(), Arc::new(seed_user), tx).unwrap();
        let handle = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();

        let result = handle.call(|_| -> usize { panic!("boom") });
        assert!(matches!(result, Err(ControllerError::CallPanicked)));
        assert_eq!(handle.call(|db| db.user_count()).unwrap(), 1);

        handle.request_stop();
        thread.join().unwrap().unwrap();
    }

    #[test]
    fn test_unclaimed_hub_stops_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("hub.json");
        let url = crate::db::StoreLocation::file_url(&artifact).unwrap();

        let (tx, rx) = mpsc::sync_channel(1);
        drop(rx);
        let thread = spawn_hub_thread(config().with_db_url(url), Arc::new(seed_user), tx).unwrap();

        thread.join().unwrap().unwrap();
        assert!(!artifact.exists());
    }
}
