//! Chat-completions judge against a mock endpoint

use kaibench::validator::ValidatorConfig;
use kaibench::{AnswerValidator, BenchError, ChatCompletionValidator, Question, ReferenceDataset, Verdict};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> ValidatorConfig {
    ValidatorConfig {
        endpoint: format!("{}/v1/chat/completions", server.uri()),
        model: "judge-test".into(),
        api_key_env: "KAIBENCH_TEST_UNUSED_KEY".into(),
        timeout_secs: 5,
    }
}

fn question() -> Question {
    Question {
        key: "Q5".into(),
        question: "What is the top device?".into(),
        notes: None,
    }
}

fn reference() -> ReferenceDataset {
    ReferenceDataset::new("Devices", vec![[("Device", "X")].into_iter().collect()])
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
}

#[tokio::test]
async fn accurate_verdict_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_string_contains("judge-test"))
        .and(body_string_contains("The top device is X"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"isAccurate": true, "reason": "matches"}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let validator = ChatCompletionValidator::with_api_key(&config(&server), Some("test-key".into())).unwrap();
    let verdict = validator
        .validate(&question(), "The top device is X", &reference())
        .await
        .unwrap();

    assert_eq!(verdict, Verdict::accurate("matches"));
}

#[tokio::test]
async fn fenced_verdict_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            "```json\n{\"isAccurate\": false, \"reason\": \"X is second\"}\n```",
        )))
        .mount(&server)
        .await;

    let validator = ChatCompletionValidator::with_api_key(&config(&server), None).unwrap();
    let verdict = validator
        .validate(&question(), "The top device is Y", &reference())
        .await
        .unwrap();

    assert!(!verdict.is_accurate);
    assert_eq!(verdict.reason, "X is second");
}

#[tokio::test]
async fn server_error_is_a_validator_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let validator = ChatCompletionValidator::with_api_key(&config(&server), None).unwrap();
    let err = validator
        .validate(&question(), "The top device is X", &reference())
        .await
        .unwrap_err();

    match err {
        BenchError::Validator(msg) => assert!(msg.contains("503"), "{msg}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn missing_content_is_a_validator_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let validator = ChatCompletionValidator::with_api_key(&config(&server), None).unwrap();
    let err = validator
        .validate(&question(), "The top device is X", &reference())
        .await
        .unwrap_err();

    assert!(matches!(err, BenchError::Validator(_)));
    assert!(!err.is_fatal());
}
