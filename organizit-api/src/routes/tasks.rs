/// Task endpoints
///
/// All endpoints require JWT authentication and act on the caller's own
/// tasks. Another user's task yields `403 Forbidden`; a missing one `404`.
///
/// # Endpoints
///
/// - `GET /api/tasks` - List tasks (newest first) with plan usage
/// - `POST /api/tasks` - Create task (plan gated)
/// - `GET /api/tasks/:id` - Show task
/// - `PUT /api/tasks/:id` - Update task
/// - `DELETE /api/tasks/:id` - Delete task
/// - `PATCH /api/tasks/:id/toggle` - Flip pending/completed

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::current_user,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use organizit_shared::{
    auth::middleware::AuthContext,
    models::task::{CreateTask, Task, TaskInsert, TaskStatus, UpdateTask},
    plan_gate::PlanGate,
};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    /// Missing titles fail validation rather than deserialization, so the
    /// plan gate still answers first
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    pub description: Option<String>,
}

/// Update task request
///
/// Absent fields are left unchanged; `"description": null` clears it.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub status: Option<TaskStatus>,
}

/// Distinguishes an absent field (`None`) from an explicit null (`Some(None)`)
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Task list response
#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<Task>,

    pub total_tasks: u64,

    /// `null` on the pro plan
    pub task_limit: Option<u32>,

    /// `null` on the pro plan
    pub remaining_tasks: Option<u64>,
}

/// Single task response
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub task: Task,
}

/// Task response with a status message
#[derive(Debug, Serialize)]
pub struct TaskMessageResponse {
    pub message: String,
    pub task: Task,
}

/// Message-only response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Fetches a task and checks the caller owns it
async fn owned_task(state: &AppState, auth: &AuthContext, id: Uuid) -> ApiResult<Task> {
    let task = state
        .store
        .find_task(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if !task.is_owned_by(auth.user_id) {
        tracing::warn!(user_id = %auth.user_id, task_id = %id, "Task access denied");
        return Err(ApiError::Forbidden("Unauthorized".to_string()));
    }

    Ok(task)
}

/// Trims and drops blank descriptions
fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

/// List tasks
///
/// # Endpoint
///
/// ```text
/// GET /api/tasks
/// Authorization: Bearer <jwt_token>
/// ```
///
/// # Response
///
/// ```json
/// {
///   "tasks": [{ "id": "uuid", "title": "Write report", "status": "pending", ... }],
///   "total_tasks": 3,
///   "task_limit": 5,
///   "remaining_tasks": 2
/// }
/// ```
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<TaskListResponse>> {
    let user = current_user(&state, &auth).await?;
    let tasks = state.store.list_tasks(user.id).await?;
    let check = PlanGate::check(user.plan, tasks.len() as u64);

    Ok(Json(TaskListResponse {
        total_tasks: check.current,
        task_limit: check.limit,
        remaining_tasks: check.remaining,
        tasks,
    }))
}

/// Create task
///
/// The plan gate runs before the body is validated: a free user at the limit
/// gets `upgrade_required` whatever they sent.
///
/// # Endpoint
///
/// ```text
/// POST /api/tasks
/// Authorization: Bearer <jwt_token>
/// Content-Type: application/json
///
/// { "title": "Write report", "description": "Quarterly numbers" }
/// ```
///
/// # Errors
///
/// - `403 Forbidden` with `"error": "upgrade_required"`: free plan limit reached
/// - `422 Unprocessable Entity`: Validation failed
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(mut req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskMessageResponse>)> {
    let user = current_user(&state, &auth).await?;
    let count = state.store.count_tasks(user.id).await?;

    let check = PlanGate::check(user.plan, count);
    if !check.allowed {
        tracing::info!(
            user_id = %user.id,
            current = check.current,
            "Task limit reached, upgrade required"
        );
        return Err(ApiError::UpgradeRequired);
    }

    req.title = req.title.trim().to_string();
    req.validate()?;

    // The check above answers early; this insert re-checks under the store's lock
    let task = match state
        .store
        .create_task_gated(CreateTask {
            user_id: user.id,
            title: req.title,
            description: clean_description(req.description),
        })
        .await?
    {
        TaskInsert::Created(task) => task,
        TaskInsert::LimitReached(check) => {
            tracing::info!(
                user_id = %user.id,
                current = check.current,
                "Task limit reached by a concurrent create"
            );
            return Err(ApiError::UpgradeRequired);
        }
    };

    tracing::info!(user_id = %user.id, task_id = %task.id, "Task created");

    Ok((
        StatusCode::CREATED,
        Json(TaskMessageResponse {
            message: "Task created successfully".to_string(),
            task,
        }),
    ))
}

/// Show task
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let task = owned_task(&state, &auth, id).await?;
    Ok(Json(TaskResponse { task }))
}

/// Update task
///
/// # Endpoint
///
/// ```text
/// PUT /api/tasks/:id
/// Authorization: Bearer <jwt_token>
/// Content-Type: application/json
///
/// { "title": "New title", "description": null, "status": "completed" }
/// ```
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(mut req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<TaskMessageResponse>> {
    owned_task(&state, &auth, id).await?;

    req.title = req.title.map(|t| t.trim().to_string());
    req.validate()?;

    let task = state
        .store
        .update_task(
            id,
            UpdateTask {
                title: req.title,
                description: req.description.map(clean_description),
                status: req.status,
            },
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    tracing::debug!(user_id = %auth.user_id, task_id = %id, "Task updated");

    Ok(Json(TaskMessageResponse {
        message: "Task updated successfully".to_string(),
        task,
    }))
}

/// Delete task
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    owned_task(&state, &auth, id).await?;

    if !state.store.delete_task(id).await? {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    tracing::info!(user_id = %auth.user_id, task_id = %id, "Task deleted");

    Ok(Json(MessageResponse {
        message: "Task deleted successfully".to_string(),
    }))
}

/// Toggle task status between pending and completed
pub async fn toggle_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskMessageResponse>> {
    owned_task(&state, &auth, id).await?;

    let task = state
        .store
        .toggle_task(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(TaskMessageResponse {
        message: "Task status updated".to_string(),
        task,
    }))
}
