use portalconf::{AdapterConfig, RetryPolicy};
use serde_json::json;
use sources::RiksdagenProvider;
use std::sync::Arc;
use std::time::Duration;
use switchboard::{FailureKind, Gateway, InvocationRequest, Registry, Stage};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        initial_backoff_ms: 1,
        max_backoff_ms: 1,
    }
}

fn gateway(config: AdapterConfig) -> Gateway {
    let provider = RiksdagenProvider::new(config).unwrap();
    let mut builder = Registry::builder();
    builder.register_provider(&provider).unwrap();
    Gateway::new(Arc::new(builder.build()))
}

fn document_list() -> serde_json::Value {
    json!({
        "dokumentlista": {
            "@traffar": "2",
            "@sida": "1",
            "@sidor": "1",
            "@datum": "2024-03-01 10:00:00",
            "dokument": [
                {
                    "dok_id": "HB01FiU1",
                    "rm": "2023/24",
                    "doktyp": "bet",
                    "organ": "FiU",
                    "titel": "Statens budget 2024",
                    "score": 12.5
                },
                {
                    "dok_id": "HB01FiU2",
                    "rm": "2023/24",
                    "doktyp": "bet",
                    "organ": "FiU",
                    "titel": "Vårändringsbudget",
                    "score": "3.1"
                }
            ]
        }
    })
}

#[tokio::test]
async fn test_list_documents_sends_filters_and_normalizes_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dokumentlista/"))
        .and(query_param("avd", "dokument"))
        .and(query_param("doktyp", "bet"))
        .and(query_param("org", "FiU"))
        .and(query_param("sort", "rel"))
        .and(query_param("sortorder", "desc"))
        .and(query_param("utformat", "json"))
        .and(query_param("p", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(document_list()))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway(AdapterConfig::new(server.uri()));
    let result = gateway
        .invoke(InvocationRequest::new(
            "riksdagen.list_documents",
            json!({"doktyp": "bet", "organ": "FiU", "p": "2"}),
        ))
        .await;

    let payload = result.payload().expect("success");
    assert_eq!(payload["@traffar"], json!(2));
    assert_eq!(payload["dokument"].as_array().unwrap().len(), 2);
    assert_eq!(payload["dokument"][0]["score"], json!("12.5"));
    assert_eq!(payload["dokument"][1]["titel"], json!("Vårändringsbudget"));
}

#[tokio::test]
async fn test_single_hit_is_returned_as_a_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dokumentlista/"))
        .and(query_param("avd", "ledamot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dokumentlista": {
                "@traffar": "1",
                "dokument": {
                    "id": "0980681250613",
                    "tilltalsnamn": "Magdalena",
                    "efternamn": "Andersson",
                    "parti": "S",
                    "fodd_ar": 1967,
                    "personuppdrag": {
                        "uppdrag": {"organ_kod": "kam", "roll_kod": "Riksdagsledamot"}
                    }
                }
            }
        })))
        .mount(&server)
        .await;

    let gateway = gateway(AdapterConfig::new(server.uri()));
    let result = gateway
        .invoke(InvocationRequest::new(
            "riksdagen.list_members",
            json!({"sok": "Andersson"}),
        ))
        .await;

    let payload = result.payload().expect("success");
    let members = payload["dokument"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["fodd_ar"], json!("1967"));
    assert!(members[0]["personuppdrag"]["uppdrag"].is_array());
}

#[tokio::test]
async fn test_null_member_details_become_empty_lists() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dokumentlista/"))
        .and(query_param("avd", "ledamot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dokumentlista": {
                "@traffar": "1",
                "dokument": [{
                    "id": "0980681250613",
                    "efternamn": "Andersson",
                    "personuppgift": {"uppgift": null},
                    "personuppdrag": {"uppdrag": null}
                }]
            }
        })))
        .mount(&server)
        .await;

    let gateway = gateway(AdapterConfig::new(server.uri()));
    let result = gateway
        .invoke(InvocationRequest::new(
            "riksdagen.list_members",
            json!({"sok": "Andersson"}),
        ))
        .await;

    let payload = result.payload().expect("success");
    let member = &payload["dokument"][0];
    assert_eq!(member["personuppgift"]["uppgift"], json!([]));
    assert_eq!(member["personuppdrag"]["uppdrag"], json!([]));
}

#[tokio::test]
async fn test_empty_result_has_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dokumentlista/"))
        .and(query_param("avd", "kalender"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dokumentlista": {"@traffar": "0", "@sida": "1", "dokument": null}
        })))
        .mount(&server)
        .await;

    let gateway = gateway(AdapterConfig::new(server.uri()));
    let result = gateway
        .invoke(InvocationRequest::new(
            "riksdagen.list_calendar",
            json!({"sok": "ingenting"}),
        ))
        .await;

    let payload = result.payload().expect("success");
    assert_eq!(payload["dokument"], json!([]));
    assert_eq!(payload["@traffar"], json!(0));
}

#[tokio::test]
async fn test_missing_envelope_is_a_schema_violation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dokumentlista/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"fel": "okänd"})))
        .mount(&server)
        .await;

    let gateway = gateway(AdapterConfig::new(server.uri()));
    let result = gateway
        .invoke(InvocationRequest::new("riksdagen.list_documents", json!({})))
        .await;

    let failure = result.failure().expect("failure");
    assert_eq!(failure.kind, FailureKind::SchemaViolation);
    assert_eq!(failure.stage, Stage::Validating);
    assert_eq!(failure.field(), Some("dokument"));
}

#[tokio::test]
async fn test_fetch_document_as_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dokument/HB01FiU1.text"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Finansutskottets betänkande"))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway(AdapterConfig::new(server.uri()));
    let result = gateway
        .invoke(InvocationRequest::new(
            "riksdagen.fetch_document",
            json!({"dok_id_or_url": "HB01FiU1"}),
        ))
        .await;

    let payload = result.payload().expect("success");
    assert_eq!(payload["format"], json!("text"));
    assert_eq!(payload["text"], json!("Finansutskottets betänkande"));
    assert_eq!(payload["url"], json!(format!("{}/dokument/HB01FiU1.text", server.uri())));
    assert!(payload["document"].is_null());
}

#[tokio::test]
async fn test_fetch_document_as_json_rewrites_extension() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dokument/HB01FiU1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dokumentstatus": {"dokument": {"dok_id": "HB01FiU1"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway(AdapterConfig::new(server.uri()));
    let result = gateway
        .invoke(InvocationRequest::new(
            "riksdagen.fetch_document",
            json!({"dok_id_or_url": "/dokument/HB01FiU1.html", "fmt": "json"}),
        ))
        .await;

    let payload = result.payload().expect("success");
    assert_eq!(
        payload["document"]["dokumentstatus"]["dokument"]["dok_id"],
        json!("HB01FiU1")
    );
    assert!(payload["text"].is_null());
}

#[tokio::test]
async fn test_foreign_host_is_rejected_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let gateway = gateway(AdapterConfig::new(server.uri()));
    let result = gateway
        .invoke(InvocationRequest::new(
            "riksdagen.fetch_document",
            json!({"dok_id_or_url": "https://example.org/dokument/HB01FiU1.text"}),
        ))
        .await;

    let failure = result.failure().expect("failure");
    assert_eq!(failure.kind, FailureKind::InvalidRequest);
    assert_eq!(failure.stage, Stage::Invoking);
}

#[tokio::test]
async fn test_not_found_is_an_invalid_request_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway(AdapterConfig::new(server.uri()).with_retry(fast_retry()));
    let result = gateway
        .invoke(InvocationRequest::new(
            "riksdagen.fetch_document",
            json!({"dok_id_or_url": "NOPE"}),
        ))
        .await;

    let failure = result.failure().expect("failure");
    assert_eq!(failure.kind, FailureKind::InvalidRequest);
    assert!(!failure.retriable);
    assert_eq!(failure.message, "upstream rejected the request: HTTP 404 Not Found");
}

#[tokio::test]
async fn test_server_error_is_retried_then_reported_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dokumentlista/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let gateway = gateway(AdapterConfig::new(server.uri()).with_retry(fast_retry()));
    let result = gateway
        .invoke(InvocationRequest::new("riksdagen.list_documents", json!({})))
        .await;

    let failure = result.failure().expect("failure");
    assert_eq!(failure.kind, FailureKind::UpstreamUnavailable);
    assert!(failure.retriable);
    assert_eq!(failure.stage, Stage::Invoking);
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(document_list())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let config = AdapterConfig::new(server.uri())
        .with_timeout(Duration::from_millis(100))
        .with_retry(RetryPolicy::none());
    let gateway = gateway(config);
    let result = gateway
        .invoke(InvocationRequest::new("riksdagen.list_documents", json!({})))
        .await;

    let failure = result.failure().expect("failure");
    assert_eq!(failure.kind, FailureKind::UpstreamTimeout);
    assert!(failure.retriable);
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer hemlig"))
        .respond_with(ResponseTemplate::new(200).set_body_json(document_list()))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway(AdapterConfig::new(server.uri()).with_token("hemlig"));
    let result = gateway
        .invoke(InvocationRequest::new("riksdagen.list_documents", json!({})))
        .await;

    assert!(result.is_success());
}

#[tokio::test]
async fn test_invalid_page_never_reaches_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(document_list()))
        .expect(0)
        .mount(&server)
        .await;

    let gateway = gateway(AdapterConfig::new(server.uri()));
    let result = gateway
        .invoke(InvocationRequest::new(
            "riksdagen.list_documents",
            json!({"p": 0}),
        ))
        .await;

    let failure = result.failure().expect("failure");
    assert_eq!(failure.kind, FailureKind::InvalidArguments);
    assert_eq!(failure.field(), Some("p"));
}
