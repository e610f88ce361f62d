pub mod config;
pub mod error;
pub mod validation;

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine as _;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use speech_client::SpeechSynthesizer;
use studio_core::{
    ascii_file_name, decode_pcm_base64, pcm_duration_ms, pcm_to_wav, ScriptLine, VoiceOption,
    SAMPLE_RATE, VOICE_OPTIONS, WAV_MIME_TYPE,
};
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, key_extractor::GlobalKeyExtractor, GovernorLayer};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::validation::{validate_file_name, validate_tts_request};

/// Characters left as-is in an RFC 5987 `filename*` value.
const FILENAME_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'.').remove(b'-').remove(b'_');

/// Process-wide counters reported by `/metrics`.
#[derive(Debug)]
pub struct Metrics {
    /// Every request that reached the router, whatever its route or outcome.
    pub request_count: AtomicU64,
    pub wav_bytes_encoded: AtomicU64,
    started_at: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            request_count: AtomicU64::new(0),
            wav_bytes_encoded: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub metrics: Arc<Metrics>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(speech: Arc<dyn SpeechSynthesizer>, config: ServerConfig) -> Self {
        Self {
            speech,
            metrics: Arc::new(Metrics::default()),
            config,
        }
    }
}

#[derive(Deserialize)]
pub struct WavRequest {
    audio_base64: String,
    file_name: Option<String>,
}

/// A script row in its browser shape plus its position in the table.
#[derive(Deserialize)]
pub struct TtsRequest {
    #[serde(flatten)]
    line: ScriptLine,
    /// Zero-based row position, used for the download name.
    #[serde(default)]
    index: usize,
}

#[derive(Serialize)]
pub struct TtsResponse {
    audio_base64: String,
    /// The submitted row with `audioData` set to the generated PCM.
    line: ScriptLine,
    mime_type: &'static str,
    sample_rate: u32,
    duration_ms: u64,
    file_name: String,
}

#[derive(Serialize)]
pub struct MetricsResponse {
    pub request_count: u64,
    pub wav_bytes_encoded: u64,
    pub uptime_seconds: u64,
}

/// Routes only, mounted at the root and under `/api`.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route("/voices", get(list_voices))
        .route("/metrics", get(metrics_endpoint))
        .route("/wav", post(wav_endpoint))
        .route("/tts", post(tts_endpoint))
        .route("/tts/download", post(tts_download_endpoint));

    let body_limit = state.config.max_body_bytes;

    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn_with_state(state.clone(), track_request))
        .with_state(state)
}

/// Full application: routes plus tracing, rate limiting, timeout and CORS.
pub fn app(state: AppState) -> anyhow::Result<Router> {
    let config = state.config.clone();

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(config.rate_limit_period().as_millis() as u64)
            .burst_size(config.rate_limit_per_minute.max(1))
            .key_extractor(GlobalKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limit configuration"))?,
    );
    info!("Rate limiting: {} requests per minute", config.rate_limit_per_minute);

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer::new(governor_conf))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(cors_layer(&config))
        .into_inner();

    Ok(router(state).layer(middleware_stack))
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any)
        .expose_headers([header::CONTENT_DISPOSITION])
        .allow_credentials(false);

    let Some(allowed_origins) = config.cors_allowed_origins.as_ref() else {
        warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (development mode)");
        return base.allow_origin(tower_http::cors::Any);
    };

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    if origins.is_empty() {
        warn!("CORS_ALLOWED_ORIGINS is empty, falling back to permissive CORS");
        base.allow_origin(tower_http::cors::Any)
    } else {
        info!("CORS configured for {} origin(s)", origins.len());
        base.allow_origin(tower_http::cors::AllowOrigin::list(origins))
    }
}

// Request ID and request counting for every route
async fn track_request(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    state.metrics.request_count.fetch_add(1, Ordering::Relaxed);

    let request_id = uuid::Uuid::new_v4().to_string();
    let Ok(value) = HeaderValue::from_str(&request_id) else {
        return next.run(request).await;
    };
    request.headers_mut().insert("x-request-id", value.clone());
    let mut response = next.run(request).await;
    response.headers_mut().insert("x-request-id", value);
    response
}

pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn list_voices() -> Json<&'static [VoiceOption]> {
    Json(VOICE_OPTIONS)
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Json<MetricsResponse> {
    let metrics = &state.metrics;
    Json(MetricsResponse {
        request_count: metrics.request_count.load(Ordering::Relaxed),
        wav_bytes_encoded: metrics.wav_bytes_encoded.load(Ordering::Relaxed),
        uptime_seconds: metrics.started_at.elapsed().as_secs(),
    })
}

/// Wrap client supplied base64 PCM in a WAV container.
pub async fn wav_endpoint(
    State(state): State<AppState>,
    Json(req): Json<WavRequest>,
) -> Result<Response, ApiError> {
    if let Some(name) = req.file_name.as_deref() {
        validate_file_name(name)?;
    }

    let pcm = decode_pcm_base64(&req.audio_base64)?;
    let wav = pcm_to_wav(&pcm)?;
    state
        .metrics
        .wav_bytes_encoded
        .fetch_add(wav.len() as u64, Ordering::Relaxed);

    let disposition = match req.file_name.as_deref() {
        Some(name) => attachment_disposition(name),
        None => "inline".to_string(),
    };
    wav_response(wav, &disposition)
}

/// Synthesize one script line and return the WAV as base64 JSON.
pub async fn tts_endpoint(
    State(state): State<AppState>,
    Json(req): Json<TtsRequest>,
) -> Result<Json<TtsResponse>, ApiError> {
    let synthesized = synthesize_line(&state, req).await?;

    Ok(Json(TtsResponse {
        audio_base64: base64::engine::general_purpose::STANDARD.encode(&synthesized.wav),
        line: synthesized.line,
        mime_type: WAV_MIME_TYPE,
        sample_rate: SAMPLE_RATE,
        duration_ms: synthesized.duration_ms,
        file_name: synthesized.file_name,
    }))
}

/// Synthesize one script line and return it as a WAV attachment.
pub async fn tts_download_endpoint(
    State(state): State<AppState>,
    Json(req): Json<TtsRequest>,
) -> Result<Response, ApiError> {
    let synthesized = synthesize_line(&state, req).await?;

    let disposition = attachment_disposition(&synthesized.file_name);
    wav_response(synthesized.wav, &disposition)
}

struct SynthesizedLine {
    line: ScriptLine,
    wav: Vec<u8>,
    duration_ms: u64,
    file_name: String,
}

async fn synthesize_line(state: &AppState, req: TtsRequest) -> Result<SynthesizedLine, ApiError> {
    let TtsRequest { mut line, index } = req;
    validate_tts_request(&line)?;

    info!(
        provider = state.speech.provider_name(),
        line_id = line.id,
        voice = %line.voice,
        chars = line.script.chars().count(),
        has_notes = !line.notes.trim().is_empty(),
        "Generating speech for line {}",
        index.saturating_add(1)
    );
    let start_time = Instant::now();

    let timeout = state.config.speech_timeout();
    let pcm_base64 = tokio::time::timeout(timeout, state.speech.generate_speech(&line.script, &line.voice))
        .await
        .map_err(|_| ApiError::Timeout(timeout.as_secs()))??;

    let pcm = decode_pcm_base64(&pcm_base64)?;
    let wav = pcm_to_wav(&pcm)?;
    state
        .metrics
        .wav_bytes_encoded
        .fetch_add(wav.len() as u64, Ordering::Relaxed);

    let duration_ms = pcm_duration_ms(pcm.len());
    info!(
        "Speech generated in {:.2}s ({} ms of audio)",
        start_time.elapsed().as_secs_f64(),
        duration_ms
    );

    let file_name = line.file_name(index);
    line.audio_data = Some(pcm_base64);

    Ok(SynthesizedLine {
        line,
        wav,
        duration_ms,
        file_name,
    })
}

/// `attachment` disposition with an ASCII fallback name and the UTF-8 name
/// in RFC 5987 form.
pub fn attachment_disposition(file_name: &str) -> String {
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_file_name(file_name),
        utf8_percent_encode(file_name, FILENAME_ESCAPE)
    )
}

fn wav_response(wav: Vec<u8>, disposition: &str) -> Result<Response, ApiError> {
    let disposition = HeaderValue::from_str(disposition)
        .map_err(|e| ApiError::InternalError(format!("invalid Content-Disposition: {e}")))?;
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(WAV_MIME_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        wav,
    )
        .into_response())
}
