//! HTTP request handlers

use super::types::{
    CapabilityInfo, CommandResponse, DescribeRequest, ErrorResponse, GenerateRequest,
    MergeRequest, PushImageRequest, ReloadResponse, StatisticsResponse, SuccessResponse,
    SummarizeRequest, TransformRequest, TransformSource, UserStatRow,
};
use super::AppState;
use crate::ai::{AiRequest, Outcome, Payload};
use crate::ledger::ChatUser;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine as _;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/commands/describe", post(describe))
        .route("/commands/generate", post(generate))
        .route("/commands/transform", post(transform))
        .route("/commands/merge", post(merge))
        .route("/commands/summarize", post(summarize))
        // The transport pushes incoming chat images here.
        .route("/images", post(push_image))
        .route("/balance", get(balance))
        .route("/statistics", get(statistics))
        .route("/reload", post(reload))
        .with_state(state)
}

const DESCRIBE_PROMPT: &str = "Describe this image. If it shows a meme, try to understand and \
     explain it. If it shows recognizable characters, try to identify them; do not mention memes \
     or characters when there are none. Keep the answer under 2000 characters.";

const SUMMARY_SYSTEM_PROMPT: &str = "You are an assistant that writes detailed, structured \
     summaries of video transcripts. Highlight the main topics and key points, skip any \
     advertising you notice, and silently correct obvious transcription mistakes.";

enum AppError {
    BadRequest(String),
    NotFound(String),
    /// Provider-side failure surfaced to the caller.
    Upstream(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}

fn decode_image(b64: &str) -> Result<Vec<u8>, AppError> {
    base64::engine::general_purpose::STANDARD
        .decode(b64)
        .map_err(|e| AppError::BadRequest(format!("invalid image payload: {e}")))
}

/// Common settlement path: spawn the cost write for any billed generation,
/// cache generated images, then map the outcome onto the response.
fn settle(
    state: &AppState,
    chat_id: i64,
    user: &ChatUser,
    command: &'static str,
    outcome: Outcome,
) -> Result<Json<CommandResponse>, AppError> {
    // Billed failures still get their ledger write; cost tracking is
    // decoupled from whether the call succeeded.
    if let Some(generation_id) = outcome.generation_id.clone() {
        let tracker = state.tracker.clone();
        let user = user.clone();
        tokio::spawn(async move {
            tracker.track(&generation_id, &user, command).await;
        });
    }

    let generation_id = outcome.generation_id;
    match outcome.payload {
        Payload::Text { body } => Ok(Json(CommandResponse::Text {
            body,
            generation_id,
        })),
        Payload::Image { bytes, format } => {
            state.sessions.remember_generated(chat_id, bytes.clone());
            Ok(Json(CommandResponse::Image {
                image_b64: base64::engine::general_purpose::STANDARD.encode(bytes),
                format,
                generation_id,
            }))
        }
        Payload::ImageRef { url } => Ok(Json(CommandResponse::ImageUrl {
            url,
            generation_id,
        })),
        Payload::Failure { message, .. } => Err(AppError::Upstream(message)),
    }
}

async fn describe(
    State(state): State<AppState>,
    Json(req): Json<DescribeRequest>,
) -> Result<Json<CommandResponse>, AppError> {
    let image = match &req.image_b64 {
        Some(b64) => decode_image(b64)?,
        None => state.sessions.last_image(req.chat_id).ok_or_else(|| {
            AppError::NotFound("no image has been seen in this chat yet".to_string())
        })?,
    };
    let prompt = req.prompt.as_deref().unwrap_or(DESCRIBE_PROMPT);
    let request = AiRequest::text("describe", prompt).with_image(image);
    let outcome = state.orchestrator.run(&request).await;
    settle(&state, req.chat_id, &req.user, "describe", outcome)
}

async fn generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<CommandResponse>, AppError> {
    let (capability, command) = match req.capability.as_deref() {
        None | Some("imagegen") => ("imagegen", "imagegen"),
        Some("abcgen") => ("abcgen", "abcgen"),
        Some(other) => {
            return Err(AppError::BadRequest(format!(
                "unsupported generation capability: {other}"
            )))
        }
    };
    let request = AiRequest::text(capability, &req.prompt).wanting_image();
    let outcome = state.orchestrator.run(&request).await;
    settle(&state, req.chat_id, &req.user, command, outcome)
}

async fn transform(
    State(state): State<AppState>,
    Json(req): Json<TransformRequest>,
) -> Result<Json<CommandResponse>, AppError> {
    let (image, capability, command) = match req.source {
        TransformSource::Last => (
            state.sessions.last_image(req.chat_id),
            "imagechange",
            "imagechange",
        ),
        TransformSource::Generated => (
            state.sessions.last_generated(req.chat_id),
            "changelast",
            "changelast",
        ),
    };
    let image = image.ok_or_else(|| {
        AppError::NotFound("no source image available for this chat".to_string())
    })?;
    let request = AiRequest::text(capability, &req.prompt)
        .with_image(image)
        .wanting_image();
    let outcome = state.orchestrator.run(&request).await;
    settle(&state, req.chat_id, &req.user, command, outcome)
}

async fn merge(
    State(state): State<AppState>,
    Json(req): Json<MergeRequest>,
) -> Result<Json<CommandResponse>, AppError> {
    let album = state.sessions.album(req.chat_id);
    if album.is_empty() {
        return Err(AppError::NotFound(
            "no image album available for this chat".to_string(),
        ));
    }
    let request = AiRequest::text("mergeimage", &req.prompt)
        .with_images(album)
        .wanting_image();
    let outcome = state.orchestrator.run(&request).await;
    settle(&state, req.chat_id, &req.user, "mergeimage", outcome)
}

async fn summarize(
    State(state): State<AppState>,
    Json(req): Json<SummarizeRequest>,
) -> Result<Json<CommandResponse>, AppError> {
    let request = match (&req.text, &req.file_uri) {
        (Some(text), _) => AiRequest::text(
            "summary",
            format!("Create a structured summary of the following transcript:\n\n{text}"),
        )
        .with_system(SUMMARY_SYSTEM_PROMPT),
        (None, Some(file_uri)) => AiRequest::text(
            "summary",
            "Create a structured summary of this video, highlighting the main topics and key points.",
        )
        .with_file_uri(file_uri),
        (None, None) => {
            return Err(AppError::BadRequest(
                "either text or file_uri is required".to_string(),
            ))
        }
    };
    let outcome = state.orchestrator.run(&request).await;
    // Summaries are not tied to a chat image cache; chat id 0 is unused.
    settle(&state, 0, &req.user, "summary", outcome)
}

async fn push_image(
    State(state): State<AppState>,
    Json(req): Json<PushImageRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let bytes = decode_image(&req.image_b64)?;
    state
        .sessions
        .remember_image(req.chat_id, bytes, req.new_album);
    Ok(Json(SuccessResponse { success: true }))
}

async fn balance(State(state): State<AppState>) -> Result<Json<crate::ledger::Balance>, AppError> {
    state
        .tracker
        .balance()
        .await
        .map(Json)
        .map_err(|e| AppError::Upstream(e.to_string()))
}

async fn statistics(
    State(state): State<AppState>,
) -> Result<Json<StatisticsResponse>, AppError> {
    let users = state
        .ledger
        .user_statistics()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let total_spent: f64 = users.iter().map(|u| u.total_spent).sum();
    let rows = users
        .iter()
        .enumerate()
        .map(|(idx, u)| UserStatRow {
            rank: idx + 1,
            user_id: u.user_id,
            display_name: u.display_name(),
            total_spent: u.total_spent,
            total_requests: u.total_requests,
        })
        .collect::<Vec<_>>();

    Ok(Json(StatisticsResponse {
        user_count: rows.len(),
        users: rows,
        total_spent,
    }))
}

async fn reload(State(state): State<AppState>) -> Result<Json<ReloadResponse>, AppError> {
    state
        .config
        .reload()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let capabilities = state
        .config
        .active_providers()
        .into_iter()
        .map(|(capability, provider, model)| CapabilityInfo {
            capability,
            provider,
            model,
        })
        .collect();

    Ok(Json(ReloadResponse {
        reloaded: true,
        capabilities,
    }))
}
