/// Database models for Organizit
///
/// This module contains the domain models and their PostgreSQL queries.
///
/// # Models
///
/// - `user`: User accounts and their plan
/// - `task`: To-do items owned by a user
/// - `pending_upgrade`: Payment references awaiting verification
///
/// # Example
///
/// ```no_run
/// use organizit_shared::models::user::{CreateUser, User};
/// use organizit_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     name: "Ada Lovelace".to_string(),
///     email: "ada@example.com".to_string(),
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod pending_upgrade;
pub mod task;
pub mod user;
