// Configuration constants for the server

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub rate_limit_per_minute: u32,
    pub speech_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_body_bytes: usize,
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8085,
            rate_limit_per_minute: 60,
            speech_timeout_secs: 60,
            request_timeout_secs: 90,
            max_body_bytes: 16 * 1024 * 1024,
            cors_allowed_origins: None,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            });

        Self {
            port: env_or("PORT", defaults.port),
            rate_limit_per_minute: env_or("RATE_LIMIT_PER_MINUTE", defaults.rate_limit_per_minute),
            speech_timeout_secs: env_or("SPEECH_TIMEOUT_SECS", defaults.speech_timeout_secs),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            max_body_bytes: env_or("MAX_BODY_BYTES", defaults.max_body_bytes),
            cors_allowed_origins,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn speech_timeout(&self) -> Duration {
        Duration::from_secs(self.speech_timeout_secs)
    }

    /// Interval after which one request of the rate-limit quota is replenished.
    pub fn rate_limit_period(&self) -> Duration {
        let per_minute = self.rate_limit_per_minute.max(1) as u64;
        Duration::from_millis((60_000 / per_minute).max(1))
    }
}
