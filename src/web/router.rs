use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};

use crate::{modules, web::AppState};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .merge(modules::resources::router())
        .merge(modules::users::router())
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}
