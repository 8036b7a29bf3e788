//! Persistence boundary for users, tasks and pending upgrades
//!
//! Handlers and the upgrade flow never talk to a database directly; they go
//! through the [`Store`] trait. Two implementations exist:
//!
//! - [`PgStore`]: PostgreSQL via sqlx, delegating to the model queries
//! - [`MemoryStore`]: process-local maps, for tests and database-less runs
//!
//! # Example
//!
//! ```
//! use organizit_shared::store::{MemoryStore, Store};
//! use organizit_shared::models::user::CreateUser;
//!
//! # async fn example() -> Result<(), organizit_shared::store::StoreError> {
//! let store = MemoryStore::new();
//! let user = store.create_user(CreateUser {
//!     name: "Ada".to_string(),
//!     email: "ada@example.com".to_string(),
//! }).await?;
//!
//! assert_eq!(store.count_tasks(user.id).await?, 0);
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::pending_upgrade::PendingUpgrade;
use crate::models::task::{CreateTask, Task, TaskInsert, UpdateTask};
use crate::models::user::{CreateUser, UpdateProfile, User};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unique constraint violated (e.g. duplicate email)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Referenced row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// In-memory state is unusable after a panic while holding a lock
    #[error("Store lock poisoned")]
    Poisoned,
}

/// Outcome of the conditional `free → pro` flip
#[derive(Debug, Clone)]
pub enum UpgradeOutcome {
    /// This call performed the flip
    Upgraded(User),

    /// The user was already pro; nothing changed
    AlreadyPro(User),

    /// No such user
    NotFound,
}

/// Persistence operations used by the API and the upgrade flow
#[async_trait]
pub trait Store: Send + Sync {
    /// Backend name for health reporting
    fn backend(&self) -> &'static str;

    /// Checks the backend is reachable
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Creates a free-plan user
    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Updates name and/or email; duplicate email → [`StoreError::Conflict`]
    async fn update_profile(
        &self,
        id: Uuid,
        data: UpdateProfile,
    ) -> Result<Option<User>, StoreError>;

    /// Sets `plan = pro` only if the user is currently free
    ///
    /// Must be atomic with respect to concurrent callers: of two racing
    /// calls for the same free user, exactly one observes `Upgraded`.
    async fn upgrade_to_pro(&self, id: Uuid) -> Result<UpgradeOutcome, StoreError>;

    /// Inserts a task without consulting the plan
    async fn create_task(&self, data: CreateTask) -> Result<Task, StoreError>;

    /// Inserts a task if the owner's plan allows another one
    ///
    /// Counting and inserting happen atomically per owner: concurrent calls
    /// can never take a free user past the limit. Missing owner →
    /// [`StoreError::NotFound`].
    async fn create_task_gated(&self, data: CreateTask) -> Result<TaskInsert, StoreError>;

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError>;

    /// Lists a user's tasks, newest first
    async fn list_tasks(&self, user_id: Uuid) -> Result<Vec<Task>, StoreError>;

    async fn count_tasks(&self, user_id: Uuid) -> Result<u64, StoreError>;

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> Result<Option<Task>, StoreError>;

    /// Flips pending ⇄ completed
    async fn toggle_task(&self, id: Uuid) -> Result<Option<Task>, StoreError>;

    async fn delete_task(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Inserts or replaces a pending upgrade keyed by reference
    ///
    /// Also drops the same user's stale (expired, unconsumed) references.
    async fn save_pending_upgrade(&self, record: &PendingUpgrade) -> Result<(), StoreError>;

    /// Looks a reference up, whatever its state
    async fn find_pending_upgrade(
        &self,
        reference: &str,
    ) -> Result<Option<PendingUpgrade>, StoreError>;

    async fn delete_pending_upgrade(&self, reference: &str) -> Result<bool, StoreError>;

    /// Marks every unconsumed reference issued to a user as consumed
    async fn consume_pending_upgrades(&self, user_id: Uuid) -> Result<u64, StoreError>;
}
