use axum::{extract::State, routing::get, Json, Router};
use http::StatusCode;

use crate::{application::task_service::TaskService, domain::identity::User, http::types::ApiError};

use super::AppState;

pub fn router<S: TaskService + Clone>(state: AppState<S>) -> Router {
    Router::new()
        .route("/session", get(current_user::<S>).post(sign_in::<S>).delete(sign_out::<S>))
        .with_state(state)
}

async fn current_user<S: TaskService>(State(state): State<AppState<S>>) -> Result<Json<User>, ApiError> {
    state
        .service
        .current_user()
        .await
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "no user is signed in"))
}

async fn sign_in<S: TaskService>(State(state): State<AppState<S>>, Json(user): Json<User>) -> Result<Json<User>, ApiError> {
    if user.uid.trim().is_empty() {
        return Err(ApiError::bad_request("uid must not be empty"));
    }
    let user = state.service.sign_in(user).await?;
    Ok(Json(user))
}

async fn sign_out<S: TaskService>(State(state): State<AppState<S>>) -> Result<StatusCode, ApiError> {
    state.service.sign_out().await?;
    Ok(StatusCode::NO_CONTENT)
}
