//! In-memory store
//!
//! Keeps everything in process-local maps behind `RwLock`s. Used by the
//! integration tests and when no `DATABASE_URL` is configured.

use super::{Store, StoreError, UpgradeOutcome};
use crate::models::pending_upgrade::PendingUpgrade;
use crate::models::task::{CreateTask, Task, TaskInsert, TaskStatus, UpdateTask};
use crate::models::user::{CreateUser, Plan, UpdateProfile, User};
use crate::plan_gate::PlanGate;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    /// Insertion order, so listing can return newest first
    tasks: RwLock<Vec<Task>>,
    pending: RwLock<HashMap<String, PendingUpgrade>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            tasks: RwLock::new(Vec::new()),
            pending: RwLock::new(HashMap::new()),
        }
    }

    /// Inserts a user as-is (any plan). Test seeding helper.
    pub fn insert_user(&self, user: User) -> Result<(), StoreError> {
        write(&self.users)?.insert(user.id, user);
        Ok(())
    }
}

fn build_task(data: CreateTask) -> Task {
    let now = Utc::now();
    Task {
        id: Uuid::new_v4(),
        user_id: data.user_id,
        title: data.title,
        description: data.description,
        status: TaskStatus::Pending,
        created_at: now,
        updated_at: now,
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StoreError> {
    lock.read().map_err(|_| StoreError::Poisoned)
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, StoreError> {
    lock.write().map_err(|_| StoreError::Poisoned)
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError> {
        let mut users = write(&self.users)?;

        if users.values().any(|u| u.email == data.email) {
            return Err(StoreError::Conflict("email already registered".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: data.name,
            email: data.email,
            plan: Plan::Free,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(read(&self.users)?.get(&id).cloned())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        data: UpdateProfile,
    ) -> Result<Option<User>, StoreError> {
        let mut users = write(&self.users)?;

        if let Some(email) = &data.email {
            if users.values().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::Conflict("email already registered".to_string()));
            }
        }

        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = data.name {
            user.name = name;
        }
        if let Some(email) = data.email {
            user.email = email;
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn upgrade_to_pro(&self, id: Uuid) -> Result<UpgradeOutcome, StoreError> {
        let mut users = write(&self.users)?;

        let Some(user) = users.get_mut(&id) else {
            return Ok(UpgradeOutcome::NotFound);
        };

        if user.plan.is_pro() {
            return Ok(UpgradeOutcome::AlreadyPro(user.clone()));
        }

        user.plan = Plan::Pro;
        user.updated_at = Utc::now();

        Ok(UpgradeOutcome::Upgraded(user.clone()))
    }

    async fn create_task(&self, data: CreateTask) -> Result<Task, StoreError> {
        if !read(&self.users)?.contains_key(&data.user_id) {
            return Err(StoreError::NotFound(format!("user {}", data.user_id)));
        }

        let task = build_task(data);
        write(&self.tasks)?.push(task.clone());

        Ok(task)
    }

    async fn create_task_gated(&self, data: CreateTask) -> Result<TaskInsert, StoreError> {
        // Users before tasks; the owner's plan must not change mid-insert
        let users = read(&self.users)?;
        let Some(owner) = users.get(&data.user_id) else {
            return Err(StoreError::NotFound(format!("user {}", data.user_id)));
        };

        let mut tasks = write(&self.tasks)?;
        let count = tasks.iter().filter(|t| t.user_id == data.user_id).count() as u64;

        let check = PlanGate::check(owner.plan, count);
        if !check.allowed {
            return Ok(TaskInsert::LimitReached(check));
        }

        let task = build_task(data);
        tasks.push(task.clone());

        Ok(TaskInsert::Created(task))
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(read(&self.tasks)?.iter().find(|t| t.id == id).cloned())
    }

    async fn list_tasks(&self, user_id: Uuid) -> Result<Vec<Task>, StoreError> {
        Ok(read(&self.tasks)?
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn count_tasks(&self, user_id: Uuid) -> Result<u64, StoreError> {
        Ok(read(&self.tasks)?
            .iter()
            .filter(|t| t.user_id == user_id)
            .count() as u64)
    }

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> Result<Option<Task>, StoreError> {
        let mut tasks = write(&self.tasks)?;

        let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };

        if let Some(title) = data.title {
            task.title = title;
        }
        if let Some(description) = data.description {
            task.description = description;
        }
        if let Some(status) = data.status {
            task.status = status;
        }
        task.updated_at = Utc::now();

        Ok(Some(task.clone()))
    }

    async fn toggle_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let mut tasks = write(&self.tasks)?;

        let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };

        task.status = task.status.toggled();
        task.updated_at = Utc::now();

        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tasks = write(&self.tasks)?;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);

        Ok(tasks.len() < before)
    }

    async fn save_pending_upgrade(&self, record: &PendingUpgrade) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut pending = write(&self.pending)?;
        pending.retain(|_, r| r.user_id != record.user_id || !r.is_stale_at(now));
        pending.insert(record.reference.clone(), record.clone());
        Ok(())
    }

    async fn find_pending_upgrade(
        &self,
        reference: &str,
    ) -> Result<Option<PendingUpgrade>, StoreError> {
        Ok(read(&self.pending)?.get(reference).cloned())
    }

    async fn delete_pending_upgrade(&self, reference: &str) -> Result<bool, StoreError> {
        Ok(write(&self.pending)?.remove(reference).is_some())
    }

    async fn consume_pending_upgrades(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut consumed = 0;

        for record in write(&self.pending)?.values_mut() {
            if record.user_id == user_id && !record.is_consumed() {
                record.consumed_at = Some(now);
                consumed += 1;
            }
        }

        Ok(consumed)
    }
}
