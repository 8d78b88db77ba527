//! Test Module
//!
//! Cross-module test suite for the payment schedule service.
//!
//! ## Test Categories
//! - `pipeline_tests`: validation gate + generation + normalization against a mocked upstream
//! - `server_tests`: router-level auth, status mapping, and response shaping
//!
//! Pure logic (normalizer arithmetic, validator heuristics, classification
//! parsing, token decoding) is tested inline next to each module.

pub mod pipeline_tests;

use crate::config::Settings;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use serde_json::{json, Value};
use std::sync::Arc;

/// Settings wired to a mock upstream, with a decodable public key in place.
pub fn test_settings(base_url: &str) -> Arc<Settings> {
    Arc::new(Settings {
        gemini_api_key: "test-key".to_string(),
        gemini_api_base_url: Some(base_url.to_string()),
        gemini_model: Some("gemini-test".to_string()),
        access_token_public_key: Some(STANDARD.encode("-----BEGIN PUBLIC KEY-----\n...")),
        refresh_token_public_key: None,
        host: "127.0.0.1".to_string(),
        port: 0,
        allowed_origins: vec!["http://localhost:3000".to_string()],
    })
}

/// Wraps text in the upstream generateContent response envelope.
pub fn gemini_envelope(text: &str) -> Value {
    json!({
        "candidates": [
            { "content": { "parts": [{ "text": text }] } }
        ]
    })
}

/// A classification response the way the model returns it: JSON wrapped in prose.
pub fn classification_text(category: &str, confidence: f64, reasoning: &str) -> String {
    format!(
        "Here is the classification:\n{}",
        json!({
            "category": category,
            "confidence": confidence,
            "reasoning": reasoning
        })
    )
}

/// A compact JWT with the given claims and a junk signature segment.
pub fn unsigned_token(claims: &Value) -> String {
    let header =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&json!({"alg": "RS256", "typ": "JWT"})).unwrap());
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
    format!("{}.{}.unchecked-signature", header, payload)
}
