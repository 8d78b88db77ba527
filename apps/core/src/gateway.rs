//! Outbound gateway to the generative API.
//!
//! Two call shapes: schedule generation and intent classification. Both wrap
//! the caller's prompt in a natural-language instruction, POST it to
//! `{base}/models/{model}:generateContent?key={key}` and unwrap the
//! `candidates[0].content.parts[0].text` envelope. Exactly one attempt per
//! call, no retries.

use crate::config::{Settings, PLACEHOLDER_API_KEY};
use crate::error::AppError;
use chrono::Local;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::info;

/// Upper bound for one outbound generation or classification call.
/// A hung upstream must not hold a request open forever.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the generative endpoint. Cheap to clone; the underlying
/// connection pool is shared.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    settings: Arc<Settings>,
}

impl GeminiClient {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    /// Asks the model to turn a payment instruction into a JSON schedule.
    /// When a total amount is supplied it is embedded with an explicit
    /// directive to prefer it over any amount mentioned in the free text.
    pub async fn generate_schedule_text(
        &self,
        prompt: &str,
        unit_total_amount: Option<f64>,
    ) -> Result<String, AppError> {
        let today = Local::now().date_naive().to_string();
        let instruction = build_schedule_instruction(prompt, unit_total_amount, &today);
        self.generate(&instruction, "Generation").await
    }

    /// Asks the model to classify a prompt as payment-related or not.
    /// Returns the raw response text; parsing is the classifier's job.
    pub async fn classify_intent_text(&self, prompt: &str) -> Result<String, AppError> {
        let instruction = build_classification_instruction(prompt);
        self.generate(&instruction, "Classification").await
    }

    fn request_url(&self) -> Result<String, AppError> {
        let key = &self.settings.gemini_api_key;
        if key.is_empty() || key == PLACEHOLDER_API_KEY {
            return Err(AppError::Config(
                "GEMINI_API_KEY is missing or not set properly".to_string(),
            ));
        }
        Ok(format!("{}?key={}", self.settings.gemini_api_url()?, key))
    }

    async fn generate(&self, instruction: &str, label: &str) -> Result<String, AppError> {
        let url = self.request_url()?;

        let payload = json!({
            "contents": [
                {
                    "parts": [{ "text": instruction }]
                }
            ]
        });

        info!(label, "issuing generateContent call");
        let request_future = self.client.post(&url).json(&payload).send();
        let res = timeout(REQUEST_TIMEOUT, request_future).await??;

        let status = res.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "{} request failed with status {}",
                label, status
            )));
        }

        let body: Value = res
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Invalid JSON from {} call: {}", label, e)))?;

        body["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::Upstream(format!("Invalid response structure from {} call", label))
            })
    }
}

/// Formats an amount as a comma-grouped currency string, e.g. `$1,234,567.89`.
pub fn format_currency(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped: Vec<u8> = Vec::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, b) in int_part.bytes().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(b',');
        }
        grouped.push(b);
    }
    grouped.reverse();
    let int_grouped = String::from_utf8(grouped).unwrap_or_else(|_| int_part.to_string());

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{}${}.{}", sign, int_grouped, frac_part)
}

fn build_schedule_instruction(prompt: &str, unit_total_amount: Option<f64>, today: &str) -> String {
    let mut prompt_context = format!("Prompt: \"{}\"", prompt);
    if let Some(total) = unit_total_amount {
        let formatted = format_currency(total);
        prompt_context.push_str(&format!(
            "\nUnit Total Amount: {} (ALWAYS use this as the total amount)",
            formatted
        ));
        prompt_context.push_str(&format!(
            "\nIMPORTANT: If the prompt mentions any different total amount, IGNORE it and use the Unit Total Amount of {} instead.",
            formatted
        ));
    }

    format!(
        r#"You are a smart assistant helping real estate companies.

Convert this payment instruction into a JSON payment schedule.

{prompt_context}

Use today's date: {today}

CRITICAL Instructions:
- ALWAYS use the Unit Total Amount provided above as the total amount for calculations
- If the prompt mentions any different total amount, IGNORE it completely
- Calculate individual payment amounts based on percentages of the Unit Total Amount only
- If percentages aren't specified, create a reasonable payment schedule
- For equal divisions, divide the Unit Total Amount evenly
- DO NOT include any payment entries with 0 amount
- Only include payments with positive amounts greater than 0

CALCULATION RULES:
- For equal divisions: amount_per_payment = total_amount / number_of_payments
- Keep amounts equal for all payments in equal divisions
- Example: 900000 / 3 = 300000 each payment
- Calculate percentages: percentage = (amount / total_amount) * 100

Output format:
[
  {{
    "date": "YYYY-MM-DD",
    "amount_percent": 33.33,
    "amount": 300000,
    "note": "1st payment"
  }},
  {{
    "date": "YYYY-MM-DD",
    "amount_percent": 33.33,
    "amount": 300000,
    "note": "2nd payment"
  }},
  {{
    "date": "YYYY-MM-DD",
    "amount_percent": 33.34,
    "amount": 300000,
    "note": "final payment"
  }}
]

Make sure amounts are calculated correctly with the Unit Total Amount.
IMPORTANT: Skip any payment entries where the calculated amount is 0."#
    )
}

fn build_classification_instruction(prompt: &str) -> String {
    format!(
        r#"You are a text classifier. Analyze the following user input and classify it into one of these categories:

CATEGORIES:
1. "payment_schedule" - Requests related to creating, splitting, or managing payment schedules, installments, or financial plans
2. "unrelated" - Everything else (greetings, questions about you, random text, non-payment topics)

USER INPUT: "{prompt}"

EXAMPLES:
- "Split into 3 equal payments" -> payment_schedule
- "Create monthly installments" -> payment_schedule
- "Pay 30% upfront, rest later" -> payment_schedule
- "What is your name?" -> unrelated
- "Hello there" -> unrelated
- "hjwbdjhhv diubiwd" -> unrelated
- "Tell me a joke" -> unrelated

Respond with ONLY a JSON object in this exact format:
{{
    "category": "payment_schedule" or "unrelated",
    "confidence": 0.95,
    "reasoning": "Brief explanation of why this category was chosen"
}}"#
    )
}
