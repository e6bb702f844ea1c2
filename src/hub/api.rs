//! HTTP API of the hub.
//!
//! # Routes
//! - `GET    /hub/api`                     version
//! - `POST   /hub/login`                   form login, creates the user on first success
//! - `GET    /hub/api/users`               list users
//! - `GET    /hub/api/users/{name}`        one user
//! - `POST   /hub/api/users/{name}/server` launch the user's worker
//! - `DELETE /hub/api/users/{name}/server` stop the user's worker

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::auth::{Authenticator, Credential};
use crate::db::{Database, DbError, User};
use crate::hub::servers::{ServerInfo, ServerRegistry};
use crate::observability::metrics;
use crate::spawner::{SpawnError, Spawner};

/// Upper bound on a single API request.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub authenticator: Arc<dyn Authenticator>,
    pub spawner: Arc<dyn Spawner>,
    pub servers: Arc<ServerRegistry>,
    pub api_url: String,
}

impl AppState {
    fn db(&self) -> MutexGuard<'_, Database> {
        lock_db(&self.db)
    }
}

/// Lock the store, recovering the data if a previous holder panicked.
pub(crate) fn lock_db(db: &Mutex<Database>) -> MutexGuard<'_, Database> {
    db.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Build the hub router with all middleware layers.
#[allow(deprecated)]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/hub/api", get(get_info))
        .route("/hub/login", post(login))
        .route("/hub/api/users", get(list_users))
        .route("/hub/api/users/{name}", get(get_user))
        .route(
            "/hub/api/users/{name}/server",
            post(start_server).delete(stop_server),
        )
        .with_state(state)
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .layer(TraceLayer::new_for_http())
}

/// Error body returned by every failing route.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Forbidden(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m),
            ApiError::Internal(m) => {
                tracing::error!(error = %m, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<SpawnError> for ApiError {
    fn from(e: SpawnError) -> Self {
        match e {
            SpawnError::AlreadyRunning(_) => ApiError::Conflict(e.to_string()),
            SpawnError::NotRunning(_) => ApiError::NotFound(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[derive(Serialize)]
pub struct HubInfo {
    pub version: &'static str,
}

/// User as returned by the API.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserModel {
    pub name: String,
    pub admin: bool,
    pub server: Option<u16>,
}

impl UserModel {
    fn new(user: &User, servers: &ServerRegistry) -> Self {
        Self {
            name: user.name.clone(),
            admin: user.is_admin(),
            server: servers.port(&user.name),
        }
    }
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

async fn get_info() -> Json<HubInfo> {
    Json(HubInfo {
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<UserModel>, ApiError> {
    // Form fields reach the backend as the raw bytes sent on the wire.
    let username = Credential::Bytes(form.username.as_bytes().to_vec());
    let password = Credential::Bytes(form.password.into_bytes());

    if !state.authenticator.authenticate(&username, &password) {
        tracing::info!(user = %form.username, "Login failed");
        metrics::record_login(false);
        return Err(ApiError::Forbidden("invalid username or password".to_string()));
    }

    let mut db = state.db();
    if db.find_user(&form.username).is_none() {
        if let Err(e) = state.authenticator.add_user(&form.username) {
            metrics::record_login(false);
            return Err(ApiError::Forbidden(e.to_string()));
        }
        db.add_user(User::new(form.username.as_str()))?;
        if let Err(e) = db.commit() {
            db.remove_user(&form.username);
            metrics::record_login(false);
            return Err(e.into());
        }
        metrics::record_users(db.user_count());
        tracing::info!(user = %form.username, "User created on first login");
    }

    let model = db
        .find_user(&form.username)
        .map(|u| UserModel::new(u, &state.servers))
        .ok_or_else(|| ApiError::Internal("user vanished after commit".to_string()))?;

    metrics::record_login(true);
    tracing::info!(user = %form.username, "Login succeeded");
    Ok(Json(model))
}

async fn list_users(State(state): State<AppState>) -> Json<Vec<UserModel>> {
    let users = state
        .db()
        .users()
        .map(|u| UserModel::new(u, &state.servers))
        .collect();
    Json(users)
}

async fn get_user(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<UserModel>, ApiError> {
    let user = state
        .db()
        .find_user(&name)
        .map(|u| UserModel::new(u, &state.servers));
    user.map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no such user `{name}`")))
}

async fn start_server(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<(StatusCode, Json<ServerInfo>), ApiError> {
    if state.db().find_user(&name).is_none() {
        return Err(ApiError::NotFound(format!("no such user `{name}`")));
    }

    let info = state
        .servers
        .spawn(&name, state.spawner.as_ref(), &state.api_url)?;
    Ok((StatusCode::CREATED, Json(info)))
}

async fn stop_server(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.servers.stop(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}
