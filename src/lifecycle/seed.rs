//! Baseline state written before the hub reports readiness.

use crate::db::{Database, DbError, User};

/// Writes fixture records into a freshly opened store.
///
/// Runs on the hub's own thread, after initialization and before readiness.
pub trait Seeder: Send + Sync {
    fn seed(&self, db: &mut Database) -> Result<(), DbError>;
}

impl<F> Seeder for F
where
    F: Fn(&mut Database) -> Result<(), DbError> + Send + Sync,
{
    fn seed(&self, db: &mut Database) -> Result<(), DbError> {
        self(db)
    }
}

/// Name of the user every seeded store starts with.
pub const BASELINE_USER: &str = "user";

/// Inserts a fixed set of users and commits them synchronously.
#[derive(Debug, Clone)]
pub struct BaselineSeeder {
    users: Vec<User>,
}

impl BaselineSeeder {
    /// Seed exactly these users.
    pub fn new(users: Vec<User>) -> Self {
        Self { users }
    }

    /// Seed nothing.
    pub fn none() -> Self {
        Self::new(Vec::new())
    }
}

impl Default for BaselineSeeder {
    fn default() -> Self {
        Self::new(vec![User::new(BASELINE_USER)])
    }
}

impl Seeder for BaselineSeeder {
    fn seed(&self, db: &mut Database) -> Result<(), DbError> {
        if self.users.is_empty() {
            return Ok(());
        }
        for user in &self.users {
            db.upsert_user(user.clone());
        }
        db.commit()?;
        tracing::info!(users = self.users.len(), "Seeded baseline users");
        Ok(())
    }
}
