//! REST endpoints driving the onboarding flow.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::{info, warn};

use super::completion::CompletionHandler;
use super::controller::{FlowController, FlowStatus, Navigation};
use super::model::AnswersPatch;

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub controller: Arc<FlowController>,
    pub completion: Arc<dyn CompletionHandler>,
}

#[derive(Debug, Serialize)]
struct NavigationResponse {
    navigation: Navigation,
    status: FlowStatus,
}

async fn respond(controller: &FlowController, navigation: Navigation) -> Json<NavigationResponse> {
    Json(NavigationResponse {
        navigation,
        status: controller.status().await,
    })
}

fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/onboarding/status
async fn get_status(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    Json(state.controller.status().await)
}

/// POST /api/onboarding/answers
///
/// Merges the posted fields into the answers. Unknown fields are rejected
/// by the extractor.
async fn post_answers(
    State(state): State<OnboardingRouteState>,
    Json(patch): Json<AnswersPatch>,
) -> impl IntoResponse {
    state.controller.update_data(patch).await;
    Json(state.controller.status().await)
}

async fn post_next(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    let navigation = state.controller.next_step().await;
    respond(&state.controller, navigation).await
}

async fn post_back(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    let navigation = state.controller.previous_step().await;
    respond(&state.controller, navigation).await
}

async fn post_jump(
    State(state): State<OnboardingRouteState>,
    Path(index): Path<usize>,
) -> impl IntoResponse {
    let navigation = state.controller.jump_to_step(index).await;
    respond(&state.controller, navigation).await
}

async fn post_reset(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    let navigation = state.controller.reset_flow().await;
    respond(&state.controller, navigation).await
}

/// POST /api/onboarding/save
///
/// Accepted immediately; the write happens in the background.
async fn post_save(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    drop(state.controller.save_progress().await);
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "status": "saving" })),
    )
}

/// POST /api/onboarding/complete
///
/// Finalizes the flow, hands the answers to the completion handler and
/// starts a fresh session once the handler has stored them.
async fn post_complete(State(state): State<OnboardingRouteState>) -> axum::response::Response {
    let Some(answers) = state.controller.finalize().await else {
        return error_response(StatusCode::CONFLICT, "Onboarding is not at its final step");
    };

    if let Err(e) = state.completion.on_complete(answers.clone()).await {
        warn!(error = %e, "Completion handler failed");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to complete onboarding: {e}"),
        );
    }

    info!("Onboarding completed");
    if state.controller.reset_flow().await == Navigation::Busy {
        warn!("Reset after completion refused, finished session stays stored");
    }
    Json(answers).into_response()
}

/// Build the health and onboarding routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/onboarding/status", get(get_status))
        .route("/api/onboarding/answers", post(post_answers))
        .route("/api/onboarding/next", post(post_next))
        .route("/api/onboarding/back", post(post_back))
        .route("/api/onboarding/jump/{index}", post(post_jump))
        .route("/api/onboarding/reset", post(post_reset))
        .route("/api/onboarding/save", post(post_save))
        .route("/api/onboarding/complete", post(post_complete))
        .with_state(state)
}
