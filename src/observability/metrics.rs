//! Metrics collection.
//!
//! # Metrics
//! - `hub_logins_total` (counter): login attempts by outcome
//! - `hub_spawns_total` (counter): worker launches by outcome
//! - `hub_users` (gauge): users in the store
//! - `hub_lifecycle_transitions_total` (counter): controller state changes
//!
//! Without an installed recorder every call is a no-op.

use metrics::{counter, gauge};

/// Record a login attempt.
pub fn record_login(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("hub_logins_total", "outcome" => outcome).increment(1);
}

/// Record a worker launch attempt.
pub fn record_spawn(outcome: &'static str) {
    counter!("hub_spawns_total", "outcome" => outcome).increment(1);
}

/// Record the number of stored users.
pub fn record_users(count: usize) {
    gauge!("hub_users").set(count as f64);
}

/// Record a lifecycle state transition.
pub fn record_transition(state: &'static str) {
    counter!("hub_lifecycle_transitions_total", "state" => state).increment(1);
}
