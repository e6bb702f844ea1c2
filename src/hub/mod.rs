//! The hub server core.
//!
//! # Data Flow
//! ```text
//! HubConfig
//!     → Hub::initialize (validate, open store, register admins, bind)
//!     → Hub::run (axum serve until the shutdown broadcast fires)
//!     → stop every worker the hub launched
//! ```
//!
//! # Design Decisions
//! - Initialization does all fallible setup before anything is served
//! - The store is only ever locked from the runtime driving `run`
//! - Capabilities are used through the trait objects in the config

pub mod api;
pub mod servers;

pub use api::{router, AppState, UserModel};
pub use servers::{ServerInfo, ServerRegistry};

use std::collections::BTreeSet;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::auth::{AuthError, Authenticator};
use crate::config::{validate_config, HubConfig, ValidationError};
use crate::db::{Database, DbError, User};
use crate::observability::metrics;

/// Errors raised while starting or running the hub.
#[derive(Debug, Error)]
pub enum HubError {
    /// The configuration failed validation.
    #[error("invalid configuration: {}", join_errors(.0))]
    Config(Vec<ValidationError>),

    /// The user store could not be opened or written.
    #[error(transparent)]
    Database(#[from] DbError),

    /// An admin identity was rejected by the authenticator.
    #[error("admin user rejected: {0}")]
    AdminUser(#[from] AuthError),

    /// The listener could not be bound.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// The event loop could not be built.
    #[error("failed to build runtime: {0}")]
    Runtime(#[source] io::Error),

    /// Serving stopped with an error.
    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A fully initialized hub, ready to serve.
pub struct Hub {
    state: AppState,
    listener: TcpListener,
    addr: SocketAddr,
}

impl Hub {
    /// Run every fallible setup step and bind the listener.
    pub async fn initialize(config: HubConfig) -> Result<Self, HubError> {
        validate_config(&config).map_err(HubError::Config)?;

        let mut db = Database::open(&config.database.url)?;
        init_admin_users(&mut db, config.authenticator.as_ref(), &config.admin_users)?;

        let listener = TcpListener::bind(&config.listener.bind_address)
            .await
            .map_err(|source| HubError::Bind {
                address: config.listener.bind_address.clone(),
                source,
            })?;
        let addr = listener.local_addr().map_err(|source| HubError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

        tracing::info!(
            address = %addr,
            users = db.user_count(),
            admins = config.admin_users.len(),
            "Hub initialized"
        );

        let state = AppState {
            db: Arc::new(Mutex::new(db)),
            authenticator: config.authenticator,
            spawner: config.spawner,
            servers: Arc::new(ServerRegistry::new()),
            api_url: format!("http://{addr}/hub/api"),
        };

        Ok(Self {
            state,
            listener,
            addr,
        })
    }

    /// The address the hub is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shared handle to the user store.
    pub fn db(&self) -> Arc<Mutex<Database>> {
        self.state.db.clone()
    }

    /// Registry of running workers.
    pub fn servers(&self) -> Arc<ServerRegistry> {
        self.state.servers.clone()
    }

    /// Serve until `shutdown` fires, then stop all workers.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<(), HubError> {
        tracing::info!(address = %self.addr, "Hub serving");

        let servers = self.state.servers.clone();
        let app = router(self.state);

        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Hub shutdown signal received");
            })
            .await
            .map_err(HubError::Serve)?;

        servers.stop_all().await;
        tracing::info!("Hub stopped");
        Ok(())
    }
}

/// Make sure every configured admin exists and carries the admin role.
fn init_admin_users(
    db: &mut Database,
    authenticator: &dyn Authenticator,
    admins: &BTreeSet<String>,
) -> Result<(), HubError> {
    for name in admins {
        authenticator.add_user(name)?;
        db.upsert_user(User::admin(name.as_str()));
        tracing::debug!(user = %name, "Admin user registered");
    }
    db.commit()?;
    metrics::record_users(db.user_count());
    Ok(())
}
