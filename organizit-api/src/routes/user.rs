/// Account endpoints
///
/// # Endpoints
///
/// - `GET /api/user/plan` - Plan and task usage
/// - `GET /api/user/profile` - Profile with plan summary
/// - `PUT /api/user/profile` - Update name and/or email

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::current_user,
};
use axum::{extract::State, Extension, Json};
use organizit_shared::{
    auth::middleware::AuthContext,
    models::user::{Plan, UpdateProfile, User},
    plan_gate::PlanGate,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Plan summary response
#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub plan: Plan,
    pub is_pro: bool,

    /// `null` on the pro plan
    pub task_limit: Option<u32>,

    pub current_tasks: u64,

    /// `null` on the pro plan
    pub remaining_tasks: Option<u64>,
}

/// Profile response
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub plan: Plan,
    pub is_pro: bool,
    pub task_limit: Option<u32>,
    pub current_tasks: u64,
}

/// Update profile request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

/// Update profile response
#[derive(Debug, Serialize)]
pub struct UpdateProfileResponse {
    pub message: String,
    pub user: User,
}

/// Get plan
///
/// # Endpoint
///
/// ```text
/// GET /api/user/plan
/// Authorization: Bearer <jwt_token>
/// ```
///
/// # Response
///
/// ```json
/// {
///   "plan": "free",
///   "is_pro": false,
///   "task_limit": 5,
///   "current_tasks": 2,
///   "remaining_tasks": 3
/// }
/// ```
pub async fn get_plan(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<PlanResponse>> {
    let user = current_user(&state, &auth).await?;
    let check = PlanGate::check(user.plan, state.store.count_tasks(user.id).await?);

    Ok(Json(PlanResponse {
        plan: user.plan,
        is_pro: user.is_pro(),
        task_limit: check.limit,
        current_tasks: check.current,
        remaining_tasks: check.remaining,
    }))
}

/// Get profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ProfileResponse>> {
    let user = current_user(&state, &auth).await?;
    let current_tasks = state.store.count_tasks(user.id).await?;

    Ok(Json(ProfileResponse {
        plan: user.plan,
        is_pro: user.is_pro(),
        task_limit: user.plan.task_limit(),
        current_tasks,
        user,
    }))
}

/// Update profile
///
/// # Endpoint
///
/// ```text
/// PUT /api/user/profile
/// Authorization: Bearer <jwt_token>
/// Content-Type: application/json
///
/// { "name": "Ada Lovelace", "email": "ada@example.com" }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Email already registered to another user
/// - `422 Unprocessable Entity`: Validation failed
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(mut req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UpdateProfileResponse>> {
    req.name = req.name.map(|n| n.trim().to_string());
    req.email = req.email.map(|e| e.trim().to_lowercase());
    req.validate()?;

    let changes = UpdateProfile {
        name: req.name,
        email: req.email,
    };

    let user = if changes.is_empty() {
        current_user(&state, &auth).await?
    } else {
        state
            .store
            .update_profile(auth.user_id, changes)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?
    };

    tracing::info!(user_id = %user.id, "Profile updated");

    Ok(Json(UpdateProfileResponse {
        message: "Profile updated successfully".to_string(),
        user,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_profile_validation() {
        let bad_email = UpdateProfileRequest {
            name: None,
            email: Some("not-an-email".to_string()),
        };
        assert!(bad_email.validate().is_err());

        let blank_name = UpdateProfileRequest {
            name: Some(String::new()),
            email: None,
        };
        assert!(blank_name.validate().is_err());

        let ok = UpdateProfileRequest {
            name: Some("Ada".to_string()),
            email: Some("ada@example.com".to_string()),
        };
        assert!(ok.validate().is_ok());

        let empty = UpdateProfileRequest {
            name: None,
            email: None,
        };
        assert!(empty.validate().is_ok());
    }
}
