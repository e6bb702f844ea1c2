//! Synchronous start/stop control over a hub running on its own thread.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;

use super::seed::{BaselineSeeder, Seeder};
use super::startup::{spawn_hub_thread, HubHandle, Readiness};
use crate::config::HubConfig;
use crate::db::{self, Database, StoreLocation};
use crate::hub::HubError;
use crate::observability::metrics;

/// How long `start` waits for readiness unless configured otherwise.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Controller state machine.
///
/// ```text
/// Idle → Starting → Ready → Stopping → Idle
///           ↓
///         Failed → Starting (next start)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No hub thread exists.
    Idle,
    /// The hub thread is initializing; readiness not yet observed.
    Starting,
    /// The hub is serving and its baseline state is committed.
    Ready,
    /// A stop is in progress.
    Stopping,
    /// The last start reported a failure; the thread has exited.
    Failed,
}

impl LifecycleState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Stopping => "stopping",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The operation is not allowed in the current state.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },

    /// Readiness was not reported in time. The hub may still become ready.
    #[error("hub not ready after {0:?}")]
    StartupTimeout(Duration),

    /// The hub reported a startup failure.
    #[error("hub failed to start: {0}")]
    Startup(#[source] HubError),

    /// The hub thread ended without reporting anything.
    #[error("hub thread exited before reporting readiness")]
    StartupAborted,

    /// The hub thread could not be created.
    #[error("failed to spawn hub thread: {0}")]
    Thread(#[source] io::Error),

    /// Removing the store artifact failed for a reason other than absence.
    #[error("failed to remove store artifact: {0}")]
    Cleanup(#[source] io::Error),

    /// The hub's event loop is gone.
    #[error("hub event loop is no longer running")]
    LoopClosed,

    /// A store call panicked. The loop keeps running.
    #[error("store call panicked on the hub loop")]
    CallPanicked,

    /// The hub thread panicked.
    #[error("hub thread panicked")]
    Panicked,

    /// The hub stopped serving with an error.
    #[error("hub stopped with an error: {0}")]
    Serve(#[source] HubError),
}

/// Owns one hub instance and its background thread.
///
/// `start` blocks until the hub is ready (or fails, or times out); `stop`
/// blocks until the thread has exited and the store artifact is gone.
pub struct HubController {
    config: HubConfig,
    seeder: Arc<dyn Seeder>,
    startup_timeout: Duration,
    state: LifecycleState,
    thread: Option<JoinHandle<Result<(), HubError>>>,
    ready: Option<Receiver<Readiness>>,
    handle: Option<HubHandle>,
}

impl HubController {
    /// Create a controller for `config` that seeds nothing.
    pub fn new(config: HubConfig) -> Self {
        Self {
            config,
            seeder: Arc::new(BaselineSeeder::none()),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            state: LifecycleState::Idle,
            thread: None,
            ready: None,
            handle: None,
        }
    }

    /// Seed the store with `seeder` before readiness.
    pub fn with_seeder(mut self, seeder: impl Seeder + 'static) -> Self {
        self.seeder = Arc::new(seeder);
        self
    }

    /// Bound the readiness wait in `start`.
    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The hub configuration.
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Handle to the running hub. Only available once `Ready`.
    pub fn handle(&self) -> Option<&HubHandle> {
        self.handle.as_ref()
    }

    /// Address of the running hub.
    pub fn addr(&self) -> Option<SocketAddr> {
        self.handle.as_ref().map(HubHandle::addr)
    }

    /// Whether the background thread is alive.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// The file the store persists to, if it persists at all.
    pub fn artifact_path(&self) -> Option<PathBuf> {
        match StoreLocation::parse(&self.config.database.url) {
            Ok(StoreLocation::File(path)) => Some(path),
            _ => None,
        }
    }

    /// Run `f` against the hub's store on the hub's own thread.
    pub fn call<F, R>(&self, f: F) -> Result<R, ControllerError>
    where
        F: FnOnce(&mut Database) -> R + Send + 'static,
        R: Send + 'static,
    {
        match &self.handle {
            Some(handle) => handle.call(f),
            None => Err(ControllerError::InvalidState {
                operation: "query the store",
                state: self.state,
            }),
        }
    }

    /// Boot the hub on a background thread and wait for readiness.
    ///
    /// Allowed from `Idle` or `Failed`. Removes any stale store artifact
    /// first. On `StartupTimeout` the controller stays `Starting`; call
    /// [`wait_ready`](Self::wait_ready) to keep waiting.
    pub fn start(&mut self) -> Result<(), ControllerError> {
        match self.state {
            LifecycleState::Idle | LifecycleState::Failed => {}
            state => {
                return Err(ControllerError::InvalidState {
                    operation: "start",
                    state,
                })
            }
        }

        self.remove_artifact()?;

        let (tx, rx) = mpsc::sync_channel(1);
        let thread = spawn_hub_thread(self.config.clone(), self.seeder.clone(), tx)
            .map_err(ControllerError::Thread)?;
        self.thread = Some(thread);
        self.ready = Some(rx);
        self.transition(LifecycleState::Starting);

        self.wait_ready(self.startup_timeout)
    }

    /// Wait up to `timeout` for a `Starting` hub to report.
    pub fn wait_ready(&mut self, timeout: Duration) -> Result<(), ControllerError> {
        if self.state == LifecycleState::Ready {
            return Ok(());
        }
        let ready = match (&self.ready, self.state) {
            (Some(ready), LifecycleState::Starting) => ready,
            (_, state) => {
                return Err(ControllerError::InvalidState {
                    operation: "wait for readiness",
                    state,
                })
            }
        };

        match ready.recv_timeout(timeout) {
            Ok(Ok(handle)) => {
                tracing::info!(address = %handle.addr(), "Hub ready");
                self.ready = None;
                self.handle = Some(handle);
                self.transition(LifecycleState::Ready);
                Ok(())
            }
            Ok(Err(cause)) => {
                self.fail_startup();
                Err(ControllerError::Startup(cause))
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(timeout = ?timeout, "Hub not ready before timeout");
                Err(ControllerError::StartupTimeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.fail_startup();
                Err(ControllerError::StartupAborted)
            }
        }
    }

    /// Stop the hub and wait for its thread to exit.
    ///
    /// Only allowed from `Ready`. After a successful return no hub thread is
    /// alive and no store artifact remains.
    pub fn stop(&mut self) -> Result<(), ControllerError> {
        if self.state != LifecycleState::Ready {
            return Err(ControllerError::InvalidState {
                operation: "stop",
                state: self.state,
            });
        }
        self.transition(LifecycleState::Stopping);

        if let Some(handle) = self.handle.take() {
            handle.request_stop();
        }

        let outcome = match self.thread.take() {
            Some(thread) => thread.join(),
            None => Ok(Ok(())),
        };
        let cleanup = self.remove_artifact();
        self.transition(LifecycleState::Idle);

        match outcome {
            Err(_) => Err(ControllerError::Panicked),
            Ok(Err(e)) => Err(ControllerError::Serve(e)),
            Ok(Ok(())) => cleanup,
        }
    }

    fn fail_startup(&mut self) {
        self.ready = None;
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Hub thread panicked during startup");
            }
        }
        if let Err(e) = self.remove_artifact() {
            tracing::warn!(error = %e, "Failed to clean up after startup failure");
        }
        self.transition(LifecycleState::Failed);
    }

    fn remove_artifact(&self) -> Result<(), ControllerError> {
        match self.artifact_path() {
            Some(path) => db::remove_artifact(&path).map_err(ControllerError::Cleanup),
            None => Ok(()),
        }
    }

    fn transition(&mut self, next: LifecycleState) {
        tracing::debug!(from = %self.state, to = %next, "Lifecycle transition");
        self.state = next;
        metrics::record_transition(next.as_str());
    }
}

impl Drop for HubController {
    fn drop(&mut self) {
        match self.state {
            LifecycleState::Ready => {
                if let Err(e) = self.stop() {
                    tracing::warn!(error = %e, "Hub did not stop cleanly on drop");
                }
            }
            LifecycleState::Starting => {
                tracing::warn!(
                    "Hub controller dropped while starting; the hub stops and removes its store once it is ready"
                );
            }
            _ => {}
        }
    }
}
