//! Black-box tests of the remote-facing operations against a mocked HTTP
//! origin, mirroring `govctl`'s `tests/` convention of exercising the
//! public surface end to end rather than internals.

use masklink::config::MaskLinkConfig;
use masklink::mask::{mask as build_mask, MaskArgs};
use masklink::remote::MaskRemoteArgs;
use masklink::transport::{Connection, HttpTransport};
use masklink::{mask_remote_resource_as_new_resource, verify_remote};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn connection_to(server: &MockServer, config: &MaskLinkConfig) -> Connection {
    let transport = HttpTransport::new(&server.uri(), "test-token", config.http_timeout)
        .expect("building an HttpTransport against a mock server never fails");
    Connection::new(server.uri(), Box::new(transport))
}

#[tokio::test]
async fn verify_remote_round_trips_a_single_mask() {
    let server = MockServer::start().await;
    let config = MaskLinkConfig::default();

    let original = json!({"here": "here"});
    Mock::given(method("GET"))
        .and(path("/resources/1/location"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&original))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/resources/1/_meta/nonce"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("abcdefg")))
        .mount(&server)
        .await;

    let mask_value = build_mask(MaskArgs {
        original: &original,
        url: format!("{}/resources/1/location", server.uri()),
        nonce: Some("abcdefg".to_string()),
        nonceurl: format!("{}/resources/1/_meta/nonce", server.uri()),
    })
    .expect("nonceurl is non-empty")
    .mask;

    let conn = connection_to(&server, &config).await;
    let result = verify_remote(&mask_value, &conn).await;
    assert!(result.valid);
    assert!(result.r#match);
    assert_eq!(result.original, Some(original));
}

#[tokio::test]
async fn verify_remote_detects_tampered_original() {
    let server = MockServer::start().await;
    let config = MaskLinkConfig::default();

    let original = json!({"here": "here"});
    let mask_value = build_mask(MaskArgs {
        original: &original,
        url: format!("{}/resources/1/location", server.uri()),
        nonce: Some("abcdefg".to_string()),
        nonceurl: format!("{}/resources/1/_meta/nonce", server.uri()),
    })
    .expect("nonceurl is non-empty")
    .mask;

    // The remote original has since been edited.
    Mock::given(method("GET"))
        .and(path("/resources/1/location"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"here": "elsewhere"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/resources/1/_meta/nonce"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("abcdefg")))
        .mount(&server)
        .await;

    let conn = connection_to(&server, &config).await;
    let result = verify_remote(&mask_value, &conn).await;
    assert!(result.valid);
    assert!(!result.r#match);
}

#[tokio::test]
async fn verify_remote_fails_on_404() {
    let server = MockServer::start().await;
    let config = MaskLinkConfig::default();

    let original = json!({"here": "here"});
    let mask_value = build_mask(MaskArgs {
        original: &original,
        url: format!("{}/resources/1/location", server.uri()),
        nonce: Some("abcdefg".to_string()),
        nonceurl: format!("{}/resources/1/_meta/nonce", server.uri()),
    })
    .expect("nonceurl is non-empty")
    .mask;

    // No mocks registered: both fetches 404.
    let conn = connection_to(&server, &config).await;
    let result = verify_remote(&mask_value, &conn).await;
    assert!(!result.valid);
    assert!(!result.r#match);
}

#[tokio::test]
async fn mask_remote_resource_persists_a_new_masked_copy() {
    let server = MockServer::start().await;
    let config = MaskLinkConfig::default();

    let resource = json!({
        "_id": "1",
        "_type": "application/json",
        "location": {"here": "here"},
    });

    Mock::given(method("GET"))
        .and(path("/resources/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&resource))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/resources/1/_meta/nonce"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/resources/1/_meta/nonce"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/resources"))
        .respond_with(
            ResponseTemplate::new(201).insert_header("content-location", "/resources/2"),
        )
        .mount(&server)
        .await;

    let conn = connection_to(&server, &config).await;
    let new_id = mask_remote_resource_as_new_resource(MaskRemoteArgs {
        url: &format!("{}/resources/1", server.uri()),
        paths: &["/location".to_string()],
        conn: &conn,
        config: &config,
        signature_callback: None,
    })
    .await
    .expect("mock server satisfies the full masking protocol");

    assert_eq!(new_id, "resources/2");
}

#[tokio::test]
async fn mask_remote_resource_rejects_empty_paths() {
    let server = MockServer::start().await;
    let config = MaskLinkConfig::default();
    let conn = connection_to(&server, &config).await;
    let err = mask_remote_resource_as_new_resource(MaskRemoteArgs {
        url: &format!("{}/resources/1", server.uri()),
        paths: &[],
        conn: &conn,
        config: &config,
        signature_callback: None,
    })
    .await
    .unwrap_err();
    assert!(matches!(err, masklink::Error::InvalidArgument(_)));
}
