//! Intent classification over the generative gateway.
//!
//! The model is asked for a single strict JSON object; in practice it often
//! wraps it in prose or code fences, so the first greedy outermost-brace
//! match is extracted before parsing.

use crate::error::AppError;
use crate::gateway::GeminiClient;
use crate::models::{ClassificationResult, IntentCategory};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::info;

static JSON_OBJECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{.*\}").expect("Invalid regex: JSON object pattern")
});

const REQUIRED_FIELDS: &[&str] = &["category", "confidence", "reasoning"];

/// Classifies prompts by asking the model itself whether the input is
/// payment-schedule-related.
#[derive(Clone)]
pub struct IntentClassifier {
    gateway: GeminiClient,
}

impl IntentClassifier {
    pub fn new(gateway: GeminiClient) -> Self {
        Self { gateway }
    }

    /// One classification round trip. Gateway failures propagate as-is;
    /// unusable response text becomes `AppError::Classification`.
    pub async fn classify(&self, prompt: &str) -> Result<ClassificationResult, AppError> {
        let raw = self.gateway.classify_intent_text(prompt).await?;
        let result = parse_classification(&raw)?;
        info!(
            category = ?result.category,
            confidence = result.confidence,
            "prompt classified"
        );
        Ok(result)
    }
}

/// Extracts and validates the classification object from raw model text.
pub fn parse_classification(text_output: &str) -> Result<ClassificationResult, AppError> {
    let matched = JSON_OBJECT_RE.find(text_output).ok_or_else(|| {
        AppError::Classification("No JSON found in classification response".to_string())
    })?;

    let value: Value = serde_json::from_str(matched.as_str()).map_err(|_| {
        AppError::Classification("Invalid classification response structure".to_string())
    })?;

    for field in REQUIRED_FIELDS {
        if value.get(field).is_none() {
            return Err(AppError::Classification(format!(
                "Missing required field in classification: {}",
                field
            )));
        }
    }

    let category = IntentCategory::parse(value["category"].as_str().unwrap_or_default());
    let confidence = coerce_confidence(&value["confidence"]);
    let reasoning = value["reasoning"]
        .as_str()
        .unwrap_or("No reasoning provided")
        .to_string();

    Ok(ClassificationResult {
        category,
        confidence,
        reasoning,
    })
}

/// Confidence may come back as a number or a numeric string; anything else
/// counts as zero, which the validator treats as too ambiguous to accept.
fn coerce_confidence(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}
