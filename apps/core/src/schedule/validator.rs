//! Two-tier prompt gate.
//!
//! The classifier verdict is the primary strategy; when the classification
//! call fails for any non-validation reason the deterministic heuristic
//! takes over. The heuristic is stricter and faster but has lower recall.

use crate::error::AppError;
use crate::models::{ClassificationResult, IntentCategory};
use crate::schedule::classifier::IntentClassifier;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

/// Classifications below this confidence are rejected as ambiguous,
/// regardless of category.
pub const CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Lowercase-letters-and-spaces only, short enough to look like stray typing.
static SHORT_RANDOM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z\s]{1,15}$").expect("Invalid regex: short random text pattern")
});

/// Conversational or off-topic fragments that never describe a payment schedule.
const UNRELATED_PHRASES: &[&str] = &[
    "what is your name",
    "who are you",
    "hello",
    "hi there",
    "how are you",
    "what can you do",
    "help me",
    "test",
    "testing",
    "can you hear me",
    "good morning",
    "good afternoon",
    "good evening",
    "goodbye",
    "bye",
    "weather",
    "time",
    "date",
    "news",
    "joke",
    "story",
];

/// Accept/reject outcome of the prompt gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    /// Rejection with the message surfaced to the caller.
    Reject(String),
}

/// Pure decision function over a prompt and an optional classifier result.
/// `None` means the classifier was unavailable and the heuristic applies.
pub fn evaluate_prompt(prompt: &str, classification: Option<&ClassificationResult>) -> Verdict {
    match classification {
        Some(result) => {
            if result.category == IntentCategory::Unrelated {
                return Verdict::Reject(format!(
                    "Invalid prompt: The request '{}' is not related to payment schedules. {}",
                    prompt, result.reasoning
                ));
            }
            if result.confidence < CONFIDENCE_THRESHOLD {
                return Verdict::Reject(format!(
                    "Unclear prompt: The request '{}' is ambiguous. Please provide clearer payment schedule instructions.",
                    prompt
                ));
            }
            Verdict::Accept
        }
        None => fallback_verdict(prompt),
    }
}

fn fallback_verdict(prompt: &str) -> Verdict {
    let prompt_lower = prompt.trim().to_lowercase();

    if UNRELATED_PHRASES
        .iter()
        .any(|phrase| prompt_lower.contains(phrase))
    {
        return Verdict::Reject(format!(
            "Invalid prompt: The request '{}' is not related to payment schedules. Please provide instructions for creating payment schedules.",
            prompt
        ));
    }

    if prompt.trim().len() < 3 || SHORT_RANDOM_RE.is_match(&prompt_lower) {
        return Verdict::Reject(format!(
            "Invalid prompt: The text '{}' appears to be incomplete or random. Please provide clear payment schedule instructions.",
            prompt
        ));
    }

    Verdict::Accept
}

/// Runs the gate end to end: empty check, classification, fallback.
pub struct PromptValidator {
    classifier: IntentClassifier,
}

impl PromptValidator {
    pub fn new(classifier: IntentClassifier) -> Self {
        Self { classifier }
    }

    /// Rejects with `AppError::Validation`; never fails the request for a
    /// flaky classifier alone.
    pub async fn validate(&self, prompt: &str) -> Result<(), AppError> {
        if prompt.trim().is_empty() {
            return Err(AppError::Validation("Prompt cannot be empty".to_string()));
        }

        let verdict = match self.classifier.classify(prompt).await {
            Ok(result) => evaluate_prompt(prompt, Some(&result)),
            Err(e) => {
                warn!("intent classification unavailable, using fallback heuristic: {}", e);
                evaluate_prompt(prompt, None)
            }
        };

        match verdict {
            Verdict::Accept => Ok(()),
            Verdict::Reject(message) => Err(AppError::Validation(message)),
        }
    }
}
