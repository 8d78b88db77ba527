//! Schedule extraction and normalization.
//!
//! Takes the raw generation text, pulls out the first greedy `[...]`
//! substring, enforces required fields, drops non-positive entries, and
//! repairs near-equal splits so the amounts reconstruct the supplied total
//! exactly.

use crate::config::Settings;
use crate::error::AppError;
use crate::gateway::GeminiClient;
use crate::models::PaymentEntry;
use crate::schedule::classifier::IntentClassifier;
use crate::schedule::validator::PromptValidator;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::sync::LazyLock;
use tracing::{info, warn};

static JSON_ARRAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\[.*\]").expect("Invalid regex: JSON array pattern")
});

/// Entries all within this relative deviation from their mean are treated
/// as an equal split eligible for exact remainder correction.
const EQUAL_DIVISION_TOLERANCE: f64 = 0.1;

/// Absolute tolerance for the aggregate-vs-total comparison.
const SUM_TOLERANCE: f64 = 1.0;

/// The full pipeline: validate, generate, normalize.
pub struct ScheduleService {
    gateway: GeminiClient,
    validator: PromptValidator,
}

impl ScheduleService {
    pub fn new(settings: Arc<Settings>) -> Self {
        let gateway = GeminiClient::new(settings);
        let validator = PromptValidator::new(IntentClassifier::new(gateway.clone()));
        Self { gateway, validator }
    }

    /// Generates a payment schedule from a free-text instruction.
    ///
    /// The prompt is gated first, so rejected prompts never reach the
    /// generation call. An unparsable total is treated as absent.
    pub async fn generate(
        &self,
        prompt: &str,
        unit_total_amount: Option<&str>,
    ) -> Result<Vec<PaymentEntry>, AppError> {
        self.validator.validate(prompt).await?;

        // A zero total imposes no constraint.
        let total = unit_total_amount
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|t| *t != 0.0);

        let text_output = self.gateway.generate_schedule_text(prompt, total).await?;
        let schedule = normalize(&text_output, total)?;
        info!(entries = schedule.len(), "payment schedule generated");
        Ok(schedule)
    }
}

/// Turns raw generation text into a validated schedule.
pub fn normalize(text_output: &str, total: Option<f64>) -> Result<Vec<PaymentEntry>, AppError> {
    let items = extract_json_array(text_output)?;
    let mut entries = filter_schedule(&items)?;

    if let Some(total) = total {
        if entries.len() > 1 {
            fix_equal_divisions(&mut entries, total);
        }
    }

    if entries.is_empty() {
        return Err(AppError::Schedule(
            "No valid payment schedule generated".to_string(),
        ));
    }

    if let Some(total) = total {
        let sum: f64 = entries.iter().map(|e| e.amount).sum();
        if (sum - total).abs() > SUM_TOLERANCE {
            // Tolerated: the schedule is still returned as-is.
            warn!(
                expected = total,
                actual = sum,
                "schedule total deviates from the requested amount"
            );
        }
    }

    Ok(entries)
}

fn extract_json_array(text_output: &str) -> Result<Vec<Value>, AppError> {
    let matched = JSON_ARRAY_RE.find(text_output).ok_or_else(|| {
        AppError::Schedule("No valid JSON array found in the response".to_string())
    })?;

    let parsed: Value = serde_json::from_str(matched.as_str())
        .map_err(|_| AppError::Schedule("Failed to parse JSON from model output".to_string()))?;

    match parsed {
        Value::Array(items) => Ok(items),
        _ => Err(AppError::Schedule(
            "Payment schedule must be a list".to_string(),
        )),
    }
}

/// Enforces required fields on every element, then keeps only entries with a
/// coercible positive amount. A missing field aborts the whole request; a
/// bad amount only drops that entry.
fn filter_schedule(items: &[Value]) -> Result<Vec<PaymentEntry>, AppError> {
    let mut filtered = Vec::with_capacity(items.len());

    for item in items {
        let obj = item.as_object().ok_or_else(|| {
            AppError::Schedule("Each payment item must be an object".to_string())
        })?;

        for field in ["date", "amount", "note"] {
            if !obj.contains_key(field) {
                return Err(AppError::Schedule(format!(
                    "Missing required field: {}",
                    field
                )));
            }
        }

        let Some(amount) = coerce_number(&obj["amount"]) else {
            continue;
        };
        if amount <= 0.0 {
            continue;
        }

        filtered.push(entry_from_object(obj, amount));
    }

    Ok(filtered)
}

fn entry_from_object(obj: &Map<String, Value>, amount: f64) -> PaymentEntry {
    let mut entry = PaymentEntry {
        date: String::new(),
        amount,
        amount_percent: None,
        note: String::new(),
        extra: Map::new(),
    };

    for (key, value) in obj {
        match key.as_str() {
            "date" => entry.date = text_of(value),
            "note" => entry.note = text_of(value),
            "amount" => {}
            "amount_percent" => entry.amount_percent = coerce_number(value),
            _ => {
                entry.extra.insert(key.clone(), value.clone());
            }
        }
    }

    entry
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Detects a near-equal split and redistributes exact integer shares.
///
/// `share = trunc(total / n)`, remainder on the last entry, so the amounts
/// always sum back to the total regardless of model rounding drift.
/// Percentages are recomputed from the corrected amounts. Entry order is
/// preserved.
fn fix_equal_divisions(entries: &mut [PaymentEntry], unit_total_amount: f64) {
    let count = entries.len();
    let mean = entries.iter().map(|e| e.amount).sum::<f64>() / count as f64;

    let is_equal_division = entries
        .iter()
        .all(|e| (e.amount - mean).abs() / mean < EQUAL_DIVISION_TOLERANCE);
    if !is_equal_division {
        return;
    }

    let share = (unit_total_amount / count as f64).trunc();
    let remainder = (unit_total_amount % count as f64).trunc();

    for (i, entry) in entries.iter_mut().enumerate() {
        entry.amount = if i == count - 1 {
            share + remainder
        } else {
            share
        };
        entry.amount_percent = Some(round2(entry.amount / unit_total_amount * 100.0));
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
