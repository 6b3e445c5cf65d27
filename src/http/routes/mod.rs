pub mod session;
pub mod tasks;

use axum::Router;

use crate::application::task_service::TaskService;

#[derive(Clone)]
pub struct AppState<S: TaskService> { pub service: S }

/// Session and task routes over one shared service.
pub fn router<S: TaskService + Clone>(state: AppState<S>) -> Router {
    Router::new()
        .merge(session::router(state.clone()))
        .merge(tasks::router(state))
}
