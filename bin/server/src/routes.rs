//! Workflow API routes.
//!
//! Thin adapters: each handler parses its body, calls one orchestrator
//! operation and wraps the resulting state.

use crate::error::ApiError;
use adpipe_core::SessionId;
use adpipe_integration::Avatar;
use adpipe_workflow::{Orchestrator, StepId, StepInput, WorkflowState};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

/// Builds the `/api/workflow` router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/workflow/session", post(create_session))
        .route("/api/workflow/scrape", post(scrape))
        .route("/api/workflow/analyze", post(analyze))
        .route("/api/workflow/generate_scripts", post(generate_scripts))
        .route("/api/workflow/select_script", post(select_script))
        .route("/api/workflow/refine_script", post(refine_script))
        .route("/api/workflow/generate_images", post(generate_images))
        .route("/api/workflow/refine_images", post(refine_images))
        .route("/api/workflow/generate_audio", post(generate_audio))
        .route("/api/workflow/select_avatar", post(select_avatar))
        .route("/api/workflow/generate_video", post(generate_video))
        .route("/api/workflow/video/poll", post(poll_video))
        .route("/api/workflow/select_ad_account", post(select_ad_account))
        .route("/api/workflow/select_media", post(select_media))
        .route("/api/workflow/preview_campaign", post(preview_campaign))
        .route("/api/workflow/publish_campaign", post(publish_campaign))
        .route("/api/workflow/navigate", post(navigate))
        .route("/api/workflow/chat", post(chat))
        .route("/api/workflow/state/{session_id}", get(get_state))
        .route("/api/workflow/avatars/{session_id}", get(list_avatars))
        .with_state(state)
}

/// Success body for state-returning operations.
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub session_id: String,
    pub state: WorkflowState,
}

impl From<WorkflowState> for StateResponse {
    fn from(state: WorkflowState) -> Self {
        Self {
            session_id: state.session_id.to_string(),
            state,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AvatarsResponse {
    pub session_id: String,
    pub avatars: Vec<Avatar>,
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn parse_session_id(raw: &str) -> Result<SessionId, ApiError> {
    raw.parse().map_err(|e: adpipe_core::ParseIdError| ApiError::InvalidSessionId {
        raw: raw.to_string(),
        reason: e.reason,
    })
}

fn parse_optional(raw: Option<&str>) -> Result<Option<SessionId>, ApiError> {
    raw.map(parse_session_id).transpose()
}

#[derive(Debug, Deserialize)]
pub struct NewSessionRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub session_id: String,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelectScriptRequest {
    pub session_id: String,
    /// Zero-based.
    pub index: usize,
}

#[derive(Debug, Deserialize)]
pub struct SelectAvatarRequest {
    pub session_id: String,
    pub avatar_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectAdAccountRequest {
    pub session_id: String,
    pub account_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectMediaRequest {
    pub session_id: String,
    pub uri: String,
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub session_id: String,
    pub intent: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
}

async fn run(
    app: &AppState,
    session_id: &str,
    step: StepId,
    input: StepInput,
) -> ApiResult<StateResponse> {
    let session_id = parse_session_id(session_id)?;
    let state = app.orchestrator.run_step(session_id, step, input).await?;
    Ok(Json(state.into()))
}

async fn create_session(
    State(app): State<AppState>,
    Json(req): Json<NewSessionRequest>,
) -> ApiResult<StateResponse> {
    let session_id = parse_optional(req.session_id.as_deref())?;
    let state = app.orchestrator.create_session(session_id).await?;
    Ok(Json(state.into()))
}

async fn scrape(
    State(app): State<AppState>,
    Json(req): Json<ScrapeRequest>,
) -> ApiResult<StateResponse> {
    let session_id = parse_optional(req.session_id.as_deref())?;
    let state = app.orchestrator.scrape(session_id, &req.url).await?;
    Ok(Json(state.into()))
}

async fn analyze(
    State(app): State<AppState>,
    Json(req): Json<FeedbackRequest>,
) -> ApiResult<StateResponse> {
    let input = StepInput::from_feedback(req.feedback);
    run(&app, &req.session_id, StepId::Analyze, input).await
}

async fn generate_scripts(
    State(app): State<AppState>,
    Json(req): Json<FeedbackRequest>,
) -> ApiResult<StateResponse> {
    let input = StepInput::from_feedback(req.feedback);
    run(&app, &req.session_id, StepId::GenerateScripts, input).await
}

async fn select_script(
    State(app): State<AppState>,
    Json(req): Json<SelectScriptRequest>,
) -> ApiResult<StateResponse> {
    let input = StepInput::ScriptIndex(req.index);
    run(&app, &req.session_id, StepId::SelectScript, input).await
}

async fn refine_script(
    State(app): State<AppState>,
    Json(req): Json<FeedbackRequest>,
) -> ApiResult<StateResponse> {
    let input = StepInput::from_feedback(req.feedback);
    run(&app, &req.session_id, StepId::RefineScript, input).await
}

async fn generate_images(
    State(app): State<AppState>,
    Json(req): Json<FeedbackRequest>,
) -> ApiResult<StateResponse> {
    let input = StepInput::from_feedback(req.feedback);
    run(&app, &req.session_id, StepId::GenerateImages, input).await
}

async fn refine_images(
    State(app): State<AppState>,
    Json(req): Json<FeedbackRequest>,
) -> ApiResult<StateResponse> {
    let input = StepInput::from_feedback(req.feedback);
    run(&app, &req.session_id, StepId::RefineImages, input).await
}

async fn generate_audio(
    State(app): State<AppState>,
    Json(req): Json<SessionRequest>,
) -> ApiResult<StateResponse> {
    run(&app, &req.session_id, StepId::GenerateAudio, StepInput::None).await
}

async fn select_avatar(
    State(app): State<AppState>,
    Json(req): Json<SelectAvatarRequest>,
) -> ApiResult<StateResponse> {
    let input = StepInput::AvatarId(req.avatar_id);
    run(&app, &req.session_id, StepId::SelectAvatar, input).await
}

async fn generate_video(
    State(app): State<AppState>,
    Json(req): Json<SessionRequest>,
) -> ApiResult<StateResponse> {
    run(&app, &req.session_id, StepId::GenerateVideo, StepInput::None).await
}

async fn poll_video(
    State(app): State<AppState>,
    Json(req): Json<SessionRequest>,
) -> ApiResult<StateResponse> {
    let session_id = parse_session_id(&req.session_id)?;
    let state = app.orchestrator.poll_video(session_id).await?;
    Ok(Json(state.into()))
}

async fn select_ad_account(
    State(app): State<AppState>,
    Json(req): Json<SelectAdAccountRequest>,
) -> ApiResult<StateResponse> {
    let input = StepInput::AdAccountId(req.account_id);
    run(&app, &req.session_id, StepId::SelectAdAccount, input).await
}

async fn select_media(
    State(app): State<AppState>,
    Json(req): Json<SelectMediaRequest>,
) -> ApiResult<StateResponse> {
    let input = StepInput::MediaUri(req.uri);
    run(&app, &req.session_id, StepId::SelectMedia, input).await
}

async fn preview_campaign(
    State(app): State<AppState>,
    Json(req): Json<FeedbackRequest>,
) -> ApiResult<StateResponse> {
    let input = StepInput::from_feedback(req.feedback);
    run(&app, &req.session_id, StepId::PreviewCampaign, input).await
}

async fn publish_campaign(
    State(app): State<AppState>,
    Json(req): Json<SessionRequest>,
) -> ApiResult<StateResponse> {
    run(&app, &req.session_id, StepId::PublishCampaign, StepInput::None).await
}

async fn navigate(
    State(app): State<AppState>,
    Json(req): Json<NavigateRequest>,
) -> ApiResult<StateResponse> {
    let session_id = parse_session_id(&req.session_id)?;
    let state = app.orchestrator.navigate(session_id, &req.intent).await?;
    Ok(Json(state.into()))
}

async fn chat(
    State(app): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<StateResponse> {
    let session_id = parse_optional(req.session_id.as_deref())?;
    let state = app.orchestrator.chat(session_id, &req.message).await?;
    Ok(Json(state.into()))
}

async fn get_state(
    State(app): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<StateResponse> {
    let session_id = parse_session_id(&session_id)?;
    let state = app.orchestrator.get_state(session_id).await?;
    Ok(Json(state.into()))
}

async fn list_avatars(
    State(app): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<AvatarsResponse> {
    let parsed = parse_session_id(&session_id)?;
    let avatars = app.orchestrator.list_avatars(parsed).await?;
    Ok(Json(AvatarsResponse {
        session_id: parsed.to_string(),
        avatars,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use adpipe_integration::Collaborators;
    use adpipe_workflow::{EngineConfig, InMemorySessionStore};
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app() -> Router {
        let orchestrator = Orchestrator::new(
            Arc::new(InMemorySessionStore::new()),
            Collaborators::offline(),
            &EngineConfig::default(),
        );
        router(AppState {
            orchestrator: Arc::new(orchestrator),
        })
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("request");

        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    async fn post(app: &Router, path: &str, body: Value) -> (StatusCode, Value) {
        send(app, "POST", path, Some(body)).await
    }

    #[tokio::test]
    async fn scrape_then_analyze() {
        let app = app();
        let (status, body) = post(
            &app,
            "/api/workflow/scrape",
            json!({ "url": "https://shop.example/widget" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let session_id = body["session_id"].as_str().expect("session id").to_string();
        assert!(session_id.starts_with("sess_"));
        assert_eq!(body["state"]["current_step"], "scrape");

        let (status, body) = post(
            &app,
            "/api/workflow/analyze",
            json!({ "session_id": session_id, "feedback": "focus on Gen Z" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"]["current_step"], "analyze");
        assert_eq!(body["state"]["analysis_feedback"], json!(["focus on Gen Z"]));

        let (status, body) = send(
            &app,
            "GET",
            &format!("/api/workflow/state/{session_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"]["iteration_count"]["analyze"], 1);
    }

    #[tokio::test]
    async fn step_not_ready_is_conflict() {
        let app = app();
        let (_, body) = post(&app, "/api/workflow/session", json!({})).await;
        let session_id = body["session_id"].clone();

        let (status, body) = post(
            &app,
            "/api/workflow/generate_scripts",
            json!({ "session_id": session_id }),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "step_not_ready");
        assert!(body["message"].as_str().is_some_and(|m| m.contains("product_data")));
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let app = app();
        let (status, body) = send(
            &app,
            "GET",
            &format!("/api/workflow/state/{}", SessionId::new()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "not_found");
    }

    #[tokio::test]
    async fn malformed_session_id_is_rejected() {
        let app = app();
        let (status, body) = send(&app, "GET", "/api/workflow/state/banana", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "validation");
    }

    #[tokio::test]
    async fn chat_and_navigation_errors() {
        let app = app();
        let (status, body) = post(
            &app,
            "/api/workflow/chat",
            json!({ "message": "https://shop.example/widget" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let session_id = body["session_id"].clone();

        let (status, body) = post(
            &app,
            "/api/workflow/navigate",
            json!({ "session_id": session_id, "intent": "somewhere nice" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "ambiguous_navigation");

        let (status, body) = post(
            &app,
            "/api/workflow/navigate",
            json!({ "session_id": session_id, "intent": "go to video" }),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "prerequisite_not_met");
    }

    #[tokio::test]
    async fn avatars_are_listed() {
        let app = app();
        let (_, body) = post(&app, "/api/workflow/session", json!({})).await;
        let session_id = body["session_id"].as_str().expect("id").to_string();

        let (status, body) = send(
            &app,
            "GET",
            &format!("/api/workflow/avatars/{session_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["avatars"].as_array().map(Vec::len), Some(3));
    }
}
