//! Wire-level tests for the remote embedding provider.
//!
//! The provider uses a blocking HTTP client, so each call runs on a
//! `spawn_blocking` thread while wiremock serves from the async runtime.

#![cfg(feature = "remote")]

use kindred_model::{create_embedding_model, EmbeddingConfig, ModelError};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer, key_env: &str, dim: usize) -> EmbeddingConfig {
    EmbeddingConfig {
        api_key_env: key_env.to_string(),
        timeout_secs: 5,
        ..EmbeddingConfig::default()
    }
    .with_endpoint(format!("{}/v1/embeddings", server.uri()))
    .with_dimension(dim)
}

#[tokio::test]
async fn test_embed_sends_model_and_input() {
    let server = MockServer::start().await;
    std::env::set_var("KINDRED_TEST_KEY_OK", "sk-test");

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "text-embedding-ada-002",
            "input": ["a lighthouse keeper's diary"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": [0.5, 0.25, -0.25]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server, "KINDRED_TEST_KEY_OK", 3);
    let vector = tokio::task::spawn_blocking(move || {
        let model = create_embedding_model(&config).unwrap();
        model.embed_one("a lighthouse keeper's diary")
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(vector, vec![0.5, 0.25, -0.25]);
}

#[tokio::test]
async fn test_rate_limit_surfaces_status() {
    let server = MockServer::start().await;
    std::env::set_var("KINDRED_TEST_KEY_429", "sk-test");

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let config = config_for(&server, "KINDRED_TEST_KEY_429", 3);
    let err = tokio::task::spawn_blocking(move || {
        let model = create_embedding_model(&config).unwrap();
        model.embed_one("anything")
    })
    .await
    .unwrap()
    .unwrap_err();

    assert!(matches!(err, ModelError::Status { status: 429, .. }));
    assert!(err.is_rejection());
}

#[tokio::test]
async fn test_missing_key_never_reaches_server() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = config_for(&server, "KINDRED_TEST_KEY_NEVER_SET", 3);
    let err = tokio::task::spawn_blocking(move || {
        let model = create_embedding_model(&config).unwrap();
        model.embed_one("anything")
    })
    .await
    .unwrap()
    .unwrap_err();

    assert!(matches!(err, ModelError::MissingApiKey { .. }));
}

#[tokio::test]
async fn test_wrong_dimension_is_rejected() {
    let server = MockServer::start().await;
    std::env::set_var("KINDRED_TEST_KEY_DIM", "sk-test");

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": [0.5, 0.25]}]
        })))
        .mount(&server)
        .await;

    let config = config_for(&server, "KINDRED_TEST_KEY_DIM", 3);
    let err = tokio::task::spawn_blocking(move || {
        let model = create_embedding_model(&config).unwrap();
        model.embed_one("anything")
    })
    .await
    .unwrap()
    .unwrap_err();

    assert!(matches!(
        err,
        ModelError::DimensionMismatch {
            expected: 3,
            actual: 2,
            ..
        }
    ));
}
