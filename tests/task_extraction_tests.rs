use std::time::Duration;

use httpmock::prelude::*;
use lifetrack_app_lib::error::{AiErrorCode, AppError, AppResult};
use lifetrack_app_lib::services::task_extraction::{
    AnthropicExtractor, ExtractionConfig, ExtractionSource, TaskExtractionService, TaskExtractor,
};
use serde_json::json;

const UPDATE: &str = "Good week. Need to renew the car insurance. Also should book a dentist visit!";

fn config_for(server: &MockServer) -> ExtractionConfig {
    ExtractionConfig {
        api_key: Some("test-key".to_string()),
        base_url: server.base_url(),
        model: "test-model".to_string(),
        http_timeout: Duration::from_secs(5),
    }
}

fn message_body(text: &str) -> serde_json::Value {
    json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "content": [{ "type": "text", "text": text }]
    })
}

#[tokio::test]
async fn model_output_is_used_when_the_call_succeeds() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/messages")
                .header("x-api-key", "test-key")
                .header("anthropic-version", "2023-06-01")
                .body_contains("\"model\":\"test-model\"")
                .body_contains("renew the car insurance");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(message_body(
                    "[\"Renew car insurance\", \"Book dentist appointment\"]",
                ));
        })
        .await;

    let service = TaskExtractionService::new(config_for(&server)).expect("service");
    assert!(service.has_remote());

    let extracted = service.extract(UPDATE).await.expect("extraction");
    mock.assert_async().await;
    assert_eq!(extracted.source, ExtractionSource::Ai);
    assert_eq!(
        extracted.tasks,
        vec!["Renew car insurance", "Book dentist appointment"]
    );
}

#[tokio::test]
async fn empty_model_array_is_a_valid_answer() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/messages");
            then.status(200).json_body(message_body("[]"));
        })
        .await;

    let service = TaskExtractionService::new(config_for(&server)).expect("service");
    let extracted = service.extract(UPDATE).await.expect("extraction");
    assert_eq!(extracted.source, ExtractionSource::Ai);
    assert!(extracted.tasks.is_empty());
}

#[tokio::test]
async fn provider_errors_fall_back_to_patterns() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/messages");
            then.status(500).body("upstream exploded");
        })
        .await;

    let service = TaskExtractionService::new(config_for(&server)).expect("service");
    let extracted = service.extract(UPDATE).await.expect("extraction");
    mock.assert_hits_async(1).await;
    assert_eq!(extracted.source, ExtractionSource::Pattern);
    assert_eq!(
        extracted.tasks,
        vec!["renew the car insurance", "book a dentist visit"]
    );
}

#[tokio::test]
async fn chatter_without_an_array_falls_back_to_patterns() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/messages");
            then.status(200)
                .json_body(message_body("I could not find any tasks in that update."));
        })
        .await;

    let service = TaskExtractionService::new(config_for(&server)).expect("service");
    let extracted = service
        .extract("Plan:\n- clean the garage\n- sell old bike")
        .await
        .expect("extraction");
    assert_eq!(extracted.source, ExtractionSource::Pattern);
    assert_eq!(extracted.tasks, vec!["clean the garage", "sell old bike"]);
}

async fn status_error(status: u16) -> Option<AiErrorCode> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/messages");
            then.status(status);
        })
        .await;

    let extractor =
        AnthropicExtractor::try_new(&config_for(&server), "test-key".to_string()).expect("client");
    let err = extractor.extract(UPDATE).await.unwrap_err();
    mock.assert_async().await;
    err.ai_code()
}

#[tokio::test]
async fn http_statuses_map_to_error_codes() {
    assert_eq!(status_error(429).await, Some(AiErrorCode::RateLimited));
    assert_eq!(status_error(401).await, Some(AiErrorCode::MissingApiKey));
    assert_eq!(status_error(403).await, Some(AiErrorCode::Forbidden));
    assert_eq!(status_error(503).await, Some(AiErrorCode::ProviderUnavailable));
}

#[tokio::test]
async fn no_key_means_patterns_only() {
    let service = TaskExtractionService::new(ExtractionConfig::default()).expect("service");
    assert!(!service.has_remote());

    let extracted = service
        .extract("groceries, laundry, car wash")
        .await
        .expect("extraction");
    assert_eq!(extracted.source, ExtractionSource::Pattern);
    assert_eq!(extracted.tasks, vec!["groceries", "laundry", "car wash"]);
}

struct FixedExtractor(Option<Vec<String>>);

#[async_trait::async_trait]
impl TaskExtractor for FixedExtractor {
    async fn extract(&self, _text: &str) -> AppResult<Vec<String>> {
        self.0
            .clone()
            .ok_or_else(|| AppError::other("offline"))
    }
}

#[tokio::test]
async fn custom_remote_extractors_are_consulted_first() {
    let answering = TaskExtractionService::with_remote(Box::new(FixedExtractor(Some(vec![
        "Call the plumber".to_string(),
    ]))))
    .expect("service");
    let extracted = answering.extract(UPDATE).await.expect("extraction");
    assert_eq!(extracted.source, ExtractionSource::Ai);
    assert_eq!(extracted.tasks, vec!["Call the plumber"]);

    let failing =
        TaskExtractionService::with_remote(Box::new(FixedExtractor(None))).expect("service");
    let extracted = failing.extract(UPDATE).await.expect("extraction");
    assert_eq!(extracted.source, ExtractionSource::Pattern);
    assert_eq!(
        extracted.tasks,
        vec!["renew the car insurance", "book a dentist visit"]
    );
}
