//! PostgreSQL store
//!
//! Thin adapter from [`Store`] to the model queries in [`crate::models`].

use super::{Store, StoreError, UpgradeOutcome};
use crate::db::pool::health_check;
use crate::models::pending_upgrade::PendingUpgrade;
use crate::models::task::{CreateTask, Task, TaskInsert, UpdateTask};
use crate::models::user::{CreateUser, UpdateProfile, User};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps unique violations to `Conflict`, everything else to `Database`
fn map_unique(err: sqlx::Error, what: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(what.to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(health_check(&self.pool).await?)
    }

    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError> {
        User::create(&self.pool, data)
            .await
            .map_err(|e| map_unique(e, "email already registered"))
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        data: UpdateProfile,
    ) -> Result<Option<User>, StoreError> {
        User::update_profile(&self.pool, id, data)
            .await
            .map_err(|e| map_unique(e, "email already registered"))
    }

    async fn upgrade_to_pro(&self, id: Uuid) -> Result<UpgradeOutcome, StoreError> {
        if let Some(user) = User::upgrade_to_pro(&self.pool, id).await? {
            return Ok(UpgradeOutcome::Upgraded(user));
        }

        // No row flipped: either already pro or missing
        match User::find_by_id(&self.pool, id).await? {
            Some(user) => Ok(UpgradeOutcome::AlreadyPro(user)),
            None => Ok(UpgradeOutcome::NotFound),
        }
    }

    async fn create_task(&self, data: CreateTask) -> Result<Task, StoreError> {
        Task::create(&self.pool, data).await.map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::NotFound("user".to_string())
            }
            _ => StoreError::Database(e),
        })
    }

    async fn create_task_gated(&self, data: CreateTask) -> Result<TaskInsert, StoreError> {
        let user_id = data.user_id;
        Task::create_gated(&self.pool, data).await.map_err(|e| match e {
            sqlx::Error::RowNotFound => StoreError::NotFound(format!("user {}", user_id)),
            e => StoreError::Database(e),
        })
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn list_tasks(&self, user_id: Uuid) -> Result<Vec<Task>, StoreError> {
        Ok(Task::list_by_user(&self.pool, user_id).await?)
    }

    async fn count_tasks(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let count = Task::count_by_user(&self.pool, user_id).await?;
        Ok(count.max(0) as u64)
    }

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> Result<Option<Task>, StoreError> {
        Ok(Task::update(&self.pool, id, data).await?)
    }

    async fn toggle_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(Task::toggle_status(&self.pool, id).await?)
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(Task::delete(&self.pool, id).await?)
    }

    async fn save_pending_upgrade(&self, record: &PendingUpgrade) -> Result<(), StoreError> {
        Ok(PendingUpgrade::save(&self.pool, record).await?)
    }

    async fn find_pending_upgrade(
        &self,
        reference: &str,
    ) -> Result<Option<PendingUpgrade>, StoreError> {
        Ok(PendingUpgrade::find(&self.pool, reference).await?)
    }

    async fn delete_pending_upgrade(&self, reference: &str) -> Result<bool, StoreError> {
        Ok(PendingUpgrade::delete(&self.pool, reference).await?)
    }

    async fn consume_pending_upgrades(&self, user_id: Uuid) -> Result<u64, StoreError> {
        Ok(PendingUpgrade::consume_for_user(&self.pool, user_id).await?)
    }
}
