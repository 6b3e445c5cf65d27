use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{
    application::task_service::TaskService,
    domain::{
        task::{NewTask, Task, TaskChanges, TaskId},
        view::{Criteria, TaskStats},
    },
    http::types::ApiError,
};

use super::AppState;

pub fn router<S: TaskService + Clone>(state: AppState<S>) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks::<S>).post(create_task::<S>))
        .route("/tasks/stats", get(task_stats::<S>))
        .route("/tasks/:id", get(get_task::<S>).put(update_task::<S>).delete(delete_task::<S>))
        .route("/tasks/:id/toggle", post(toggle_task::<S>))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    search: Option<String>,
    status: Option<String>,
    priority: Option<String>,
}

impl ListQuery {
    fn into_criteria(self) -> Result<Criteria, ApiError> {
        Ok(Criteria {
            search_text: self.search.unwrap_or_default(),
            status_filter: self.status.as_deref().unwrap_or("all").parse().map_err(ApiError::bad_request)?,
            priority_filter: self.priority.as_deref().unwrap_or("all").parse().map_err(ApiError::bad_request)?,
        })
    }
}

#[derive(Serialize)]
struct ListResponse {
    items: Vec<Task>,
    stats: TaskStats,
}

async fn list_tasks<S: TaskService>(State(state): State<AppState<S>>, Query(query): Query<ListQuery>) -> Result<Json<ListResponse>, ApiError> {
    let criteria = query.into_criteria()?;
    let snapshot = state.service.snapshot(criteria).await?;
    Ok(Json(ListResponse { items: snapshot.items, stats: snapshot.stats }))
}

async fn task_stats<S: TaskService>(State(state): State<AppState<S>>) -> Result<Json<TaskStats>, ApiError> {
    Ok(Json(state.service.stats().await?))
}

async fn create_task<S: TaskService>(State(state): State<AppState<S>>, Json(payload): Json<NewTask>) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = state.service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task<S: TaskService>(State(state): State<AppState<S>>, Path(id): Path<String>) -> Result<Json<Task>, ApiError> {
    Ok(Json(state.service.get(TaskId(id)).await?))
}

async fn update_task<S: TaskService>(State(state): State<AppState<S>>, Path(id): Path<String>, Json(payload): Json<TaskChanges>) -> Result<Json<Task>, ApiError> {
    Ok(Json(state.service.update(TaskId(id), payload).await?))
}

async fn toggle_task<S: TaskService>(State(state): State<AppState<S>>, Path(id): Path<String>) -> Result<Json<Task>, ApiError> {
    Ok(Json(state.service.toggle(TaskId(id)).await?))
}

async fn delete_task<S: TaskService>(State(state): State<AppState<S>>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    state.service.delete(TaskId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
