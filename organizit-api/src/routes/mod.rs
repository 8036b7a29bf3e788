/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `tasks`: Task CRUD, gated by plan on create
/// - `user`: Plan summary and profile
/// - `payment`: Pro upgrade (initialize, verify, webhook)

pub mod health;
pub mod payment;
pub mod tasks;
pub mod user;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use organizit_shared::{auth::middleware::AuthContext, models::user::User};

/// Loads the acting user named by the token
///
/// A valid token for a user that no longer exists is treated as unauthenticated.
pub(crate) async fn current_user(state: &AppState, auth: &AuthContext) -> ApiResult<User> {
    state
        .store
        .find_user(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))
}
