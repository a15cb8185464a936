//! HTTP API: routes, request bodies, error mapping.
//!
//! Every core call is blocking and runs on `spawn_blocking`.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{SecondsFormat, Utc};
use podcastify_core::{
    draft_script, render_transcript, script::normalize_turns, transcript_filename,
    AudioAvailability, Cast, DialogueTurn, ElevenLabsClient, EpisodeRequest, EpisodeSynthesizer,
    HttpArticleFetcher, OpenAiScriptGenerator, PodcastError, ProgressSink, ScriptStyle,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{debug, info, warn};

use crate::state::SharedState;

const X_PODCAST_FORMAT: HeaderName = HeaderName::from_static("x-podcast-format");
const X_PODCAST_STRATEGY: HeaderName = HeaderName::from_static("x-podcast-strategy");

pub fn create_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/api/health", get(health))
        .route("/api/voices", post(voices))
        .route("/api/voice-preview", post(voice_preview))
        .route("/api/generate-script", post(generate_script))
        .route("/api/generate-audio", post(generate_audio))
        .route("/api/transcript", post(transcript))
        .layer(cors);

    let dist = state
        .settings
        .frontend_dist
        .clone()
        .filter(|dir| dir.is_dir());
    let router = match dist {
        Some(dir) => {
            info!(dir = %dir.display(), "serving frontend");
            let index = ServeFile::new(dir.join("index.html"));
            api.fallback_service(ServeDir::new(dir).fallback(index))
        }
        None => api.fallback(frontend_missing),
    };

    router
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<String>,
}

impl ApiError {
    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: message.to_string(),
            details: None,
        }
    }

    fn internal(message: String) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: message,
            details: None,
        }
    }
}

impl From<PodcastError> for ApiError {
    fn from(e: PodcastError) -> Self {
        match e {
            PodcastError::InvalidInput(message) => Self::bad_request(&message),
            PodcastError::RemoteSynthesis { status, body } => Self {
                status: StatusCode::BAD_GATEWAY,
                error: format!("ElevenLabs error {status}"),
                details: Some(body),
            },
            other => match other.provider_status() {
                Some(status) => Self {
                    status: StatusCode::BAD_GATEWAY,
                    error: format!("ElevenLabs error {status}"),
                    details: Some(other.to_string()),
                },
                None => Self::internal(other.to_string()),
            },
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::internal(format!("worker task failed: {e}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = self.status.as_u16(), error = %self.error, "request failed");
        }
        let body = ErrorBody {
            error: self.error,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "time": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "audio": AudioAvailability::detect(state.settings.elevenlabs_api_key.as_deref()),
        "episodes": state.episode_stats(),
    }))
}

#[derive(Debug, Default, Deserialize)]
struct VoicesBody {
    elevenlabs_api_key: Option<String>,
    #[serde(default)]
    refresh: bool,
}

async fn voices(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Option<Json<VoicesBody>>,
) -> ApiResult<Json<Value>> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let header_key = headers.get("xi-api-key").and_then(|v| v.to_str().ok());
    let supplied = body.elevenlabs_api_key.as_deref().or(header_key);
    let key = state
        .elevenlabs_key(supplied)
        .ok_or_else(|| ApiError::bad_request("Missing ElevenLabs API key"))?;

    if !body.refresh {
        if let Some(voices) = state.cached_voices(&key) {
            debug!(count = voices.len(), "voice catalog served from cache");
            return Ok(Json(json!({ "voices": voices })));
        }
    }

    let config = state.elevenlabs_config();
    let fetch_key = key.clone();
    let voices = tokio::task::spawn_blocking(move || {
        ElevenLabsClient::new(config)?.list_voices(&fetch_key)
    })
    .await??;

    state.cache_voices(&key, voices.clone());
    Ok(Json(json!({ "voices": voices })))
}

#[derive(Debug, Deserialize)]
struct PreviewBody {
    elevenlabs_api_key: Option<String>,
    voice_id: Option<String>,
    text: Option<String>,
}

async fn voice_preview(
    State(state): State<SharedState>,
    Json(body): Json<PreviewBody>,
) -> ApiResult<Response> {
    let missing = || ApiError::bad_request("Missing elevenlabs_api_key or voice_id");
    let key = state
        .elevenlabs_key(body.elevenlabs_api_key.as_deref())
        .ok_or_else(missing)?;
    let voice_id = body
        .voice_id
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(missing)?;

    let config = state.elevenlabs_config();
    let text = body.text;
    let audio = tokio::task::spawn_blocking(move || {
        ElevenLabsClient::new(config)?.preview_voice(&key, &voice_id, text.as_deref())
    })
    .await??;

    Ok((
        [
            (header::CONTENT_TYPE, "audio/mpeg".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "inline; filename=\"preview.mp3\"".to_string(),
            ),
        ],
        audio,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
struct ScriptBody {
    url: Option<String>,
    openai_api_key: Option<String>,
    host_name: Option<String>,
    guest_name: Option<String>,
    aussie: Option<bool>,
    model: Option<String>,
}

async fn generate_script(
    State(state): State<SharedState>,
    Json(body): Json<ScriptBody>,
) -> ApiResult<Json<Value>> {
    let missing = || ApiError::bad_request("Missing 'url' or 'openai_api_key'");
    let url = body
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(missing)?;
    let key = state
        .openai_key(body.openai_api_key.as_deref())
        .ok_or_else(missing)?;

    let cast = Cast::new(body.host_name.as_deref(), body.guest_name.as_deref());
    let style = ScriptStyle::from_flag(body.aussie.unwrap_or(true));
    let openai = state.openai_config(body.model.as_deref());
    let fetcher = state.fetcher_config();
    info!(url = %url, model = %openai.model, "generating script");

    let draft = tokio::task::spawn_blocking(move || {
        let source = HttpArticleFetcher::new(fetcher)?;
        let generator = OpenAiScriptGenerator::new(key, openai)?;
        draft_script(&source, &generator, &url, &cast, style)
    })
    .await??;

    Ok(Json(json!({
        "article": { "title": draft.article.title, "url": draft.url },
        "script": draft.script,
    })))
}

#[derive(Debug, Deserialize)]
struct AudioBody {
    script: Option<Value>,
    pause_ms: Option<i64>,
    elevenlabs_api_key: Option<String>,
    host_voice_id: Option<String>,
    guest_voice_id: Option<String>,
}

async fn generate_audio(
    State(state): State<SharedState>,
    Json(body): Json<AudioBody>,
) -> ApiResult<Response> {
    let missing = || {
        ApiError::bad_request(
            "Missing one of required fields: script, elevenlabs_api_key, host_voice_id, guest_voice_id",
        )
    };
    let script = required_script(body.script).ok_or_else(missing)?;
    let key = state
        .elevenlabs_key(body.elevenlabs_api_key.as_deref())
        .ok_or_else(missing)?;
    let host = non_blank(body.host_voice_id).ok_or_else(missing)?;
    let guest = non_blank(body.guest_voice_id).ok_or_else(missing)?;
    let script = normalize_turns(script, &Cast::default())?;
    let pause_ms = body.pause_ms.unwrap_or(state.settings.default_pause_ms);

    let config = state.elevenlabs_config();
    let synthesis = state.synthesis_config();
    let outcome = tokio::task::spawn_blocking(move || {
        let client = ElevenLabsClient::new(config)?;
        let synthesizer = EpisodeSynthesizer::new(synthesis);
        let request = EpisodeRequest::new(script, pause_ms, &host, &guest, &key);
        let mut log_progress = |percent: u8, message: &str| {
            debug!(percent, step = message, "episode progress");
        };
        synthesizer.synthesize(&client, &request, Some(&mut log_progress as &mut dyn ProgressSink))
    })
    .await?;

    let artifact = match outcome {
        Ok(artifact) => artifact,
        Err(e) => {
            state.record_failure();
            return Err(e.into());
        }
    };
    state.record_episode(artifact.strategy);

    Ok((
        [
            (header::CONTENT_TYPE, artifact.mime_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", artifact.suggested_filename),
            ),
            (X_PODCAST_FORMAT, artifact.format_label),
            (X_PODCAST_STRATEGY, artifact.strategy.as_str().to_string()),
        ],
        artifact.bytes,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
struct TranscriptBody {
    script: Option<Value>,
    title: Option<String>,
}

async fn transcript(Json(body): Json<TranscriptBody>) -> ApiResult<Response> {
    let script = required_script(body.script).ok_or_else(|| ApiError::bad_request("Missing 'script'"))?;
    let script: Vec<DialogueTurn> = normalize_turns(script, &Cast::default())?;
    let title = body.title.unwrap_or_default();

    let text = render_transcript(&script, &title, chrono::Local::now().naive_local());
    let filename = transcript_filename(&title);
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        text,
    )
        .into_response())
}

async fn frontend_missing() -> Json<Value> {
    Json(json!({ "message": "Frontend not built. API is running." }))
}

/// A script field counts as present only when it is a non-empty list.
fn required_script(script: Option<Value>) -> Option<Value> {
    script.filter(|s| s.as_array().is_some_and(|turns| !turns.is_empty()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{settings::AppSettings, state::AppState};
    use axum::body::Body;
    use axum::http::Request;
    use std::path::PathBuf;
    use tower::ServiceExt;

    fn test_router(elevenlabs_base_url: &str) -> (Router, SharedState) {
        let settings = AppSettings {
            elevenlabs_base_url: elevenlabs_base_url.to_string(),
            line_delay_ms: 0,
            ..AppSettings::default()
        };
        let state = AppState::new(settings, PathBuf::from("settings.json")).shared();
        (create_router(state.clone()), state)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn sample_script() -> Value {
        json!([
            {"id": 1, "speaker": "Host", "name": "Alex", "text": "Welcome to the show."},
            {"id": 2, "speaker": "guest", "name": "Sam", "text": "Thanks for having me."}
        ])
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _) = test_router("http://127.0.0.1:9");
        let response = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["audio"]["credential_present"], false);
        assert_eq!(json["episodes"]["failed"], 0);
    }

    #[tokio::test]
    async fn missing_fields_are_bad_requests() {
        let cases = [
            ("/api/voices", json!({}), "Missing ElevenLabs API key"),
            (
                "/api/voice-preview",
                json!({"elevenlabs_api_key": "k"}),
                "Missing elevenlabs_api_key or voice_id",
            ),
            (
                "/api/generate-script",
                json!({"url": "https://example.com"}),
                "Missing 'url' or 'openai_api_key'",
            ),
            (
                "/api/generate-audio",
                json!({"script": [], "elevenlabs_api_key": "k", "host_voice_id": "h", "guest_voice_id": "g"}),
                "Missing one of required fields: script, elevenlabs_api_key, host_voice_id, guest_voice_id",
            ),
            ("/api/transcript", json!({"title": "x"}), "Missing 'script'"),
        ];
        for (uri, body, message) in cases {
            let (app, _) = test_router("http://127.0.0.1:9");
            let response = app.oneshot(post_json(uri, body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body_json(response).await["error"], message, "{uri}");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn voices_are_cached_per_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/voices")
            .match_header("xi-api-key", "key-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"voices":[{"name":"Ava","voice_id":"v-ava"}]}"#)
            .expect(1)
            .create_async()
            .await;

        let (app, state) = test_router(&server.url());
        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(post_json("/api/voices", json!({"elevenlabs_api_key": "key-1"})))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let json = body_json(response).await;
            assert_eq!(json["voices"][0]["voice_id"], "v-ava");
        }
        mock.assert_async().await;
        assert_eq!(state.voice_cache.read().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rejected_credential_maps_to_bad_gateway() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", mockito::Matcher::Regex(r"^/v1/text-to-speech/".into()))
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .with_body(r#"{"detail":"invalid_api_key"}"#)
            .expect_at_least(1)
            .create_async()
            .await;

        let (app, state) = test_router(&server.url());
        let response = app
            .oneshot(post_json(
                "/api/generate-audio",
                json!({
                    "script": sample_script(),
                    "pause_ms": 300,
                    "elevenlabs_api_key": "bad",
                    "host_voice_id": "h",
                    "guest_voice_id": "g"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(response).await;
        assert_eq!(json["error"], "ElevenLabs error 401");
        assert!(json["details"].as_str().unwrap().contains("401"));
        mock.assert_async().await;
        assert_eq!(state.episode_stats().failed, 1);
    }

    #[tokio::test]
    async fn oversized_pause_is_rejected_before_synthesis() {
        // unroutable provider; reaching synthesis would give a transport error, not 400
        let (app, state) = test_router("http://127.0.0.1:9");
        for pause in [json!(10_001), json!(i64::MAX), json!(1_000_000_000_000_000_000i64)] {
            let response = app
                .clone()
                .oneshot(post_json(
                    "/api/generate-audio",
                    json!({
                        "script": sample_script(),
                        "pause_ms": pause,
                        "elevenlabs_api_key": "k",
                        "host_voice_id": "h",
                        "guest_voice_id": "g"
                    }),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let json = body_json(response).await;
            assert!(json["error"].as_str().unwrap().contains("pause_ms"));
        }
        assert_eq!(state.episode_stats().failed, 3);
    }

    #[tokio::test]
    async fn transcript_is_a_text_attachment() {
        let (app, _) = test_router("http://127.0.0.1:9");
        let response = app
            .oneshot(post_json(
                "/api/transcript",
                json!({"script": sample_script(), "title": "Deep Sea Mining"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.starts_with("attachment; filename=\"podcast_script_"));
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("Welcome to the show."));
        assert!(text.contains("Thanks for having me."));
    }

    #[tokio::test]
    async fn unknown_path_without_frontend() {
        let (app, _) = test_router("http://127.0.0.1:9");
        let response = app
            .oneshot(Request::builder().uri("/some/page").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["message"],
            "Frontend not built. API is running."
        );
    }
}
