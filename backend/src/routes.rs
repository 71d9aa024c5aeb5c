use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::Json,
    routing::{get, patch},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared::{FieldError, GroupedTasks, Task, TaskId, TaskPage, TaskPatchRequest, TaskRequest};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::PagingConfig;
use crate::error::{TaskError, TaskResult};
use crate::middleware::{request_id, request_span};
use crate::service::TaskService;
use crate::store::{PageRequest, TaskFilter};

#[derive(Clone)]
pub struct AppState {
    pub tasks: TaskService,
    pub paging: PagingConfig,
}

impl AppState {
    pub fn new(tasks: TaskService, paging: PagingConfig) -> Self {
        Self { tasks, paging }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/grouped-by-completion", get(grouped_by_completion))
        .route(
            "/api/tasks/:id",
            get(get_task)
                .put(replace_task)
                .patch(patch_task)
                .delete(delete_task),
        )
        .route("/api/tasks/:id/complete", patch(complete_task))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(axum::middleware::from_fn(request_id))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    pub completed: Option<bool>,
    pub due_date_from: Option<NaiveDate>,
    pub due_date_to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl TaskQuery {
    fn into_parts(self, paging: PagingConfig) -> TaskResult<(TaskFilter, PageRequest)> {
        let size = self.size.unwrap_or(paging.default_size);
        if size == 0 || size > paging.max_size {
            return Err(TaskError::Validation(vec![FieldError::new(
                "size",
                format!("Page size must be between 1 and {}", paging.max_size),
            )]));
        }
        let filter = TaskFilter {
            completed: self.completed,
            due_from: self.due_date_from,
            due_to: self.due_date_to,
        };
        Ok((filter, PageRequest::new(self.page.unwrap_or(0), size)))
    }
}

async fn create_task(
    State(state): State<AppState>,
    body: Result<Json<TaskRequest>, JsonRejection>,
) -> TaskResult<(StatusCode, Json<Task>)> {
    let Json(request) = body?;
    let task = state.tasks.create(request).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn replace_task(
    State(state): State<AppState>,
    id: Result<Path<TaskId>, PathRejection>,
    body: Result<Json<TaskRequest>, JsonRejection>,
) -> TaskResult<Json<Task>> {
    let Path(id) = id?;
    let Json(request) = body?;
    Ok(Json(state.tasks.replace(id, request).await?))
}

async fn complete_task(
    State(state): State<AppState>,
    id: Result<Path<TaskId>, PathRejection>,
) -> TaskResult<Json<Task>> {
    let Path(id) = id?;
    Ok(Json(state.tasks.complete(id).await?))
}

async fn patch_task(
    State(state): State<AppState>,
    id: Result<Path<TaskId>, PathRejection>,
    body: Result<Json<TaskPatchRequest>, JsonRejection>,
) -> TaskResult<Json<Task>> {
    let Path(id) = id?;
    let Json(patch) = body?;
    Ok(Json(state.tasks.partial_update(id, patch).await?))
}

async fn delete_task(
    State(state): State<AppState>,
    id: Result<Path<TaskId>, PathRejection>,
) -> TaskResult<StatusCode> {
    let Path(id) = id?;
    state.tasks.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_task(
    State(state): State<AppState>,
    id: Result<Path<TaskId>, PathRejection>,
) -> TaskResult<Json<Task>> {
    let Path(id) = id?;
    Ok(Json(state.tasks.get_by_id(id).await?))
}

async fn list_tasks(
    State(state): State<AppState>,
    query: Result<Query<TaskQuery>, QueryRejection>,
) -> TaskResult<Json<TaskPage>> {
    let Query(query) = query?;
    let (filter, page) = query.into_parts(state.paging)?;
    Ok(Json(state.tasks.get_filtered(filter, page).await?))
}

async fn grouped_by_completion(State(state): State<AppState>) -> TaskResult<Json<GroupedTasks>> {
    Ok(Json(state.tasks.group_by_completion().await?))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}
