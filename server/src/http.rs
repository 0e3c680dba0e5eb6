//! HTTP side of the controller: login

use crate::config::ControllerConfig;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use krushinova_shared::{LoginRequest, LoginResponse};
use std::sync::Arc;
use tracing::{info, warn};

pub fn router(config: Arc<ControllerConfig>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/login", post(login))
        .with_state(config)
}

async fn index() -> &'static str {
    "Rover controller online"
}

/// `POST /api/login`: 200 with the token, or 401 `{"success": false}`
pub async fn login(
    State(config): State<Arc<ControllerConfig>>,
    Json(request): Json<LoginRequest>,
) -> (StatusCode, Json<LoginResponse>) {
    if request.username == config.username && request.password == config.password {
        info!("Login granted for {}", request.username);
        (StatusCode::OK, Json(LoginResponse::granted(config.token.clone())))
    } else {
        warn!("Login refused for {}", request.username);
        (StatusCode::UNAUTHORIZED, Json(LoginResponse::denied()))
    }
}
