//! Environment-derived runtime configuration.
//!
//! Read once at startup into an explicit `Settings` struct and passed by
//! reference into the gateway, validator, and server. Upstream credentials
//! are validated lazily at first use, not at startup.

use crate::error::AppError;
use std::env;

/// Sentinel value shipped in `.env` templates; treated the same as a missing key.
pub const PLACEHOLDER_API_KEY: &str = "PUT_YOUR_API_KEY_HERE";

const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
    "http://localhost:5174",
];

/// Runtime settings for the service.
#[derive(Debug, Clone)]
pub struct Settings {
    /// API key for the generative endpoint.
    pub gemini_api_key: String,
    /// Base URL of the generative API (e.g. `https://.../v1beta`).
    pub gemini_api_base_url: Option<String>,
    /// Model identifier appended to the base URL.
    pub gemini_model: Option<String>,
    /// Base64-encoded PEM public key for access tokens.
    pub access_token_public_key: Option<String>,
    /// Base64-encoded PEM public key for refresh tokens.
    pub refresh_token_public_key: Option<String>,
    /// Bind host for the HTTP server.
    pub host: String,
    /// Bind port for the HTTP server.
    pub port: u16,
    /// Origins allowed by the CORS layer.
    pub allowed_origins: Vec<String>,
}

impl Settings {
    /// Builds settings from the process environment.
    ///
    /// Missing values stay `None` (or fall back to defaults); they are only
    /// an error once the code path that needs them runs.
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5000);

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| {
                DEFAULT_ALLOWED_ORIGINS
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            });

        Settings {
            gemini_api_key: env::var("GEMINI_API_KEY")
                .unwrap_or_else(|_| PLACEHOLDER_API_KEY.to_string()),
            gemini_api_base_url: env::var("GEMINI_API_BASE_URL").ok(),
            gemini_model: env::var("GEMINI_MODEL").ok(),
            access_token_public_key: env::var("ACCESS_TOKEN_PUBLIC_KEY").ok(),
            refresh_token_public_key: env::var("REFRESH_TOKEN_PUBLIC_KEY").ok(),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port,
            allowed_origins,
        }
    }

    /// Complete generateContent URL, without the key query parameter.
    pub fn gemini_api_url(&self) -> Result<String, AppError> {
        let base = self
            .gemini_api_base_url
            .as_deref()
            .ok_or_else(|| AppError::Config("GEMINI_API_BASE_URL is not set".to_string()))?;
        let model = self
            .gemini_model
            .as_deref()
            .ok_or_else(|| AppError::Config("GEMINI_MODEL is not set".to_string()))?;
        Ok(format!(
            "{}/models/{}:generateContent",
            base.trim_end_matches('/'),
            model
        ))
    }
}
