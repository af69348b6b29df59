//! Wire-level tests for the RPC neighbor backend.
//!
//! The backend uses a blocking HTTP client, so each query runs on a
//! `spawn_blocking` thread while wiremock serves from the async runtime.

use kindred_db::{
    DbError, NeighborBackend, NeighborBackendConfig, NeighborQuery, RpcNeighborBackend, WorkKind,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(key_env: &str) -> NeighborBackendConfig {
    NeighborBackendConfig {
        api_key_env: key_env.to_string(),
        timeout_secs: 5,
        ..NeighborBackendConfig::default()
    }
}

async fn run_query(
    server: &MockServer,
    key_env: &'static str,
    embedding: Vec<f32>,
) -> Result<Vec<kindred_db::NeighborMatch>, DbError> {
    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        let backend = RpcNeighborBackend::new(&uri, &config(key_env))?;
        backend.query(&NeighborQuery::new(&embedding, 0.7, 10))
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_query_sends_literal_and_parses_rows() {
    let server = MockServer::start().await;
    std::env::set_var("KINDRED_TEST_RPC_KEY_OK", "service-key");

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/search_similar_works"))
        .and(header("apikey", "service-key"))
        .and(header("authorization", "Bearer service-key"))
        .and(body_json(json!({
            "query_embedding": "[0.5,-0.25,1]",
            "similarity_threshold": 0.7,
            "result_limit": 10
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "w-1",
                "title": "Salt and Ash",
                "description": "A lighthouse keeper",
                "type": "webtoon",
                "thumbnail_url": "https://cdn.example.com/w-1.png",
                "view_count": 120,
                "vote_count": 7,
                "similarity": 0.93
            },
            {
                "id": "w-2",
                "title": "Tidewater",
                "description": null,
                "type": "novel",
                "thumbnail_url": null,
                "view_count": 3,
                "vote_count": 0,
                "similarity": 0.71
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let matches = run_query(&server, "KINDRED_TEST_RPC_KEY_OK", vec![0.5, -0.25, 1.0])
        .await
        .unwrap();

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].work.id.as_str(), "w-1");
    assert_eq!(matches[0].work.kind, Some(WorkKind::Webtoon));
    assert_eq!(matches[0].work.view_count, 120);
    assert!((matches[0].similarity - 0.93).abs() < 1e-6);
    assert_eq!(matches[1].work.description, None);
}

#[tokio::test]
async fn test_missing_function_is_call_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/search_similar_works"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "PGRST202",
            "message": "Could not find the function"
        })))
        .mount(&server)
        .await;

    let err = run_query(&server, "KINDRED_TEST_RPC_KEY_UNSET_404", vec![1.0])
        .await
        .unwrap_err();
    assert!(err.is_call_not_found());
}

#[tokio::test]
async fn test_server_error_is_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/search_similar_works"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = run_query(&server, "KINDRED_TEST_RPC_KEY_UNSET_500", vec![1.0])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::RpcStatus { status: 500, .. }));
}

#[tokio::test]
async fn test_unexpected_body_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/search_similar_works"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rows": []})))
        .mount(&server)
        .await;

    let err = run_query(&server, "KINDRED_TEST_RPC_KEY_UNSET_BODY", vec![1.0])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::RpcMalformed { .. }));
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let err = tokio::task::spawn_blocking(move || {
        let backend =
            RpcNeighborBackend::new(&uri, &config("KINDRED_TEST_RPC_KEY_UNSET_DOWN")).unwrap();
        backend.query(&NeighborQuery::new(&[1.0], 0.7, 10))
    })
    .await
    .unwrap()
    .unwrap_err();
    assert!(matches!(err, DbError::Rpc { .. }));
}
