//! Pipeline tests: the full validate -> generate -> normalize flow against
//! a mocked upstream. The classification and generation calls hit the same
//! endpoint; they are told apart by distinctive fragments of their
//! instructions.

use super::{classification_text, gemini_envelope, test_settings};
use crate::error::AppError;
use crate::schedule::ScheduleService;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/models/gemini-test:generateContent";

/// Matches the classification call.
fn classify_call() -> wiremock::MockBuilder {
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(body_string_contains("You are a text classifier"))
}

/// Matches the schedule-generation call.
fn generate_call() -> wiremock::MockBuilder {
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(body_string_contains("Convert this payment instruction"))
}

#[tokio::test]
async fn test_accepted_prompt_yields_corrected_schedule() {
    let mock_server = MockServer::start().await;

    classify_call()
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_envelope(
            &classification_text("payment_schedule", 0.95, "Asks for an equal split"),
        )))
        .mount(&mock_server)
        .await;

    generate_call()
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_envelope(
            r#"[
                {"date": "2024-01-01", "amount": 333, "note": "1st payment"},
                {"date": "2024-02-01", "amount": 333, "note": "2nd payment"},
                {"date": "2024-03-01", "amount": 333, "note": "final payment"}
            ]"#,
        )))
        .mount(&mock_server)
        .await;

    let service = ScheduleService::new(test_settings(&mock_server.uri()));
    let schedule = service
        .generate("Split into 3 equal payments", Some("1000"))
        .await
        .unwrap();

    let amounts: Vec<f64> = schedule.iter().map(|e| e.amount).collect();
    assert_eq!(amounts, vec![333.0, 333.0, 334.0]);
    assert_eq!(amounts.iter().sum::<f64>(), 1000.0);
    assert_eq!(schedule[0].note, "1st payment");
}

#[tokio::test]
async fn test_unrelated_prompt_blocks_before_generation() {
    let mock_server = MockServer::start().await;

    classify_call()
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_envelope(
            &classification_text("unrelated", 0.98, "This is a greeting"),
        )))
        .mount(&mock_server)
        .await;

    // The generation call must never be issued for a rejected prompt.
    generate_call()
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_envelope("[]")))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = ScheduleService::new(test_settings(&mock_server.uri()));
    let result = service.generate("Hello there, how are you?", None).await;

    match result {
        Err(AppError::Validation(msg)) => {
            assert!(msg.contains("not related to payment schedules"));
            assert!(msg.contains("This is a greeting"));
        }
        other => panic!("Expected AppError::Validation, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn test_low_confidence_blocks_before_generation() {
    let mock_server = MockServer::start().await;

    classify_call()
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_envelope(
            &classification_text("payment_schedule", 0.4, "Hard to tell"),
        )))
        .mount(&mock_server)
        .await;

    generate_call()
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_envelope("[]")))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = ScheduleService::new(test_settings(&mock_server.uri()));
    let result = service.generate("do the thing with money maybe", None).await;

    match result {
        Err(AppError::Validation(msg)) => assert!(msg.contains("Unclear prompt")),
        other => panic!("Expected AppError::Validation, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn test_classifier_outage_falls_back_and_rejects_greeting() {
    let mock_server = MockServer::start().await;

    classify_call()
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&mock_server)
        .await;

    generate_call()
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_envelope("[]")))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = ScheduleService::new(test_settings(&mock_server.uri()));
    let result = service.generate("hello", None).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_classifier_outage_falls_back_and_accepts_payment_prompt() {
    let mock_server = MockServer::start().await;

    classify_call()
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&mock_server)
        .await;

    generate_call()
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_envelope(
            r#"[{"date": "2024-01-01", "amount": 900000, "note": "full payment"}]"#,
        )))
        .mount(&mock_server)
        .await;

    let service = ScheduleService::new(test_settings(&mock_server.uri()));
    let schedule = service
        .generate("Split 900000 into 1 payment", None)
        .await
        .unwrap();
    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule[0].amount, 900000.0);
}

#[tokio::test]
async fn test_unusable_classification_text_falls_back() {
    let mock_server = MockServer::start().await;

    // 200 from upstream, but no JSON object anywhere in the text.
    classify_call()
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(gemini_envelope("I am not able to classify this input.")),
        )
        .mount(&mock_server)
        .await;

    generate_call()
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_envelope("[]")))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = ScheduleService::new(test_settings(&mock_server.uri()));
    let result = service.generate("weather", None).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_empty_prompt_rejects_without_any_call() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_envelope("[]")))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = ScheduleService::new(test_settings(&mock_server.uri()));
    for prompt in ["", "   ", "\n\t"] {
        match service.generate(prompt, Some("1000")).await {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "Prompt cannot be empty"),
            other => panic!("Expected AppError::Validation, got {:?}", other.err()),
        }
    }
}

#[tokio::test]
async fn test_unparsable_total_is_treated_as_absent() {
    let mock_server = MockServer::start().await;

    classify_call()
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_envelope(
            &classification_text("payment_schedule", 0.9, "ok"),
        )))
        .mount(&mock_server)
        .await;

    generate_call()
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_envelope(
            r#"[
                {"date": "2024-01-01", "amount": 333, "note": "1st"},
                {"date": "2024-02-01", "amount": 333, "note": "2nd"},
                {"date": "2024-03-01", "amount": 333, "note": "3rd"}
            ]"#,
        )))
        .mount(&mock_server)
        .await;

    let service = ScheduleService::new(test_settings(&mock_server.uri()));
    let schedule = service
        .generate("Split into 3 equal payments", Some("around a grand"))
        .await
        .unwrap();

    // No total constraint, so no equal-division correction.
    let amounts: Vec<f64> = schedule.iter().map(|e| e.amount).collect();
    assert_eq!(amounts, vec![333.0, 333.0, 333.0]);
}

#[tokio::test]
async fn test_generation_without_array_is_schedule_error() {
    let mock_server = MockServer::start().await;

    classify_call()
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_envelope(
            &classification_text("payment_schedule", 0.9, "ok"),
        )))
        .mount(&mock_server)
        .await;

    generate_call()
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(gemini_envelope("I cannot help with that")),
        )
        .mount(&mock_server)
        .await;

    let service = ScheduleService::new(test_settings(&mock_server.uri()));
    let result = service.generate("Split into 3 equal payments", None).await;
    assert!(matches!(result, Err(AppError::Schedule(_))));
}
