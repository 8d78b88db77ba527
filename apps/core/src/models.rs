use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Incoming body of `POST /parse-payment-schedule`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleRequest {
    /// Free-text payment instruction.
    pub prompt: String,
    /// Optional total amount as a decimal string. Unparsable values are
    /// silently treated as absent.
    #[serde(default)]
    pub unit_total_amount: Option<String>,
}

/// Category assigned to a prompt by the intent classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    /// The prompt asks for a payment schedule, installments, or a financial plan.
    PaymentSchedule,
    /// Greetings, questions about the assistant, random text, non-payment topics.
    Unrelated,
    /// Anything the model answered outside the two-category scheme.
    /// Passes the category gate; only `Unrelated` rejects.
    Other,
}

impl IntentCategory {
    /// Normalizes a raw model-supplied category string. Matching is
    /// case-insensitive so "Unrelated" still counts as unrelated.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "payment_schedule" => IntentCategory::PaymentSchedule,
            "unrelated" => IntentCategory::Unrelated,
            _ => IntentCategory::Other,
        }
    }
}

/// Result of one intent-classification call. Produced once per request and
/// discarded after the validation decision.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationResult {
    /// Normalized category.
    pub category: IntentCategory,
    /// Model-reported confidence in [0, 1].
    pub confidence: f64,
    /// Brief model-supplied explanation for the category choice.
    pub reasoning: String,
}

/// One line of a normalized payment schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEntry {
    /// ISO-8601 payment date.
    pub date: String,
    /// Payment amount; always > 0 after normalization.
    pub amount: f64,
    /// Share of the total in percent, rounded to 2 decimals when recomputed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_percent: Option<f64>,
    /// Free-text label for the payment.
    pub note: String,
    /// Any other keys the model included on this entry, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
