//! Common utilities for integration tests

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use server::{app, config::ServerConfig, router, AppState};
use speech_client::{SpeechError, SpeechSynthesizer};
use tower::ServiceExt;

/// What the stub speech service does when called.
#[derive(Clone)]
pub enum StubBehavior {
    /// Return this base64 PCM payload.
    Audio(String),
    Fail(fn() -> SpeechError),
    /// Never answer within the test timeout.
    Hang,
}

pub struct StubSpeech {
    pub behavior: StubBehavior,
    pub calls: AtomicUsize,
}

#[async_trait]
impl SpeechSynthesizer for StubSpeech {
    async fn generate_speech(&self, _text: &str, _voice: &str) -> Result<String, SpeechError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            StubBehavior::Audio(pcm) => Ok(pcm.clone()),
            StubBehavior::Fail(make) => Err(make()),
            StubBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(SpeechError::NoAudio)
            }
        }
    }

    fn provider_name(&self) -> &str {
        "stub"
    }
}

/// Base64 of four bytes of PCM: two 16-bit samples.
pub const PCM_BASE64: &str = "AQIDBA==";

fn stub_speech(behavior: StubBehavior) -> Arc<StubSpeech> {
    Arc::new(StubSpeech {
        behavior,
        calls: AtomicUsize::new(0),
    })
}

/// Create a test app instance backed by a stub speech service
pub fn create_test_app(behavior: StubBehavior) -> (Router, Arc<StubSpeech>) {
    let speech = stub_speech(behavior);
    let config = ServerConfig {
        speech_timeout_secs: 1,
        ..ServerConfig::default()
    };
    let state = AppState::new(speech.clone(), config);
    (router(state), speech)
}

/// Create the full middleware stack (rate limit, timeout, CORS) around the routes
pub fn create_full_app(config: ServerConfig, behavior: StubBehavior) -> Router {
    let state = AppState::new(stub_speech(behavior), config);
    app(state).unwrap()
}

pub fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
