mod common;

use common::{JWK_HEADER, KID_HEADER, TestCert, TestMount};
use pki_acme::acme::{Account, AccountStatus, IssuedCertEntry};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use time::OffsetDateTime;

async fn post(client: &Client, addr: &str, header: (&str, String), payload: Value) -> reqwest::Response {
    client
        .post(format!("{addr}/acme/revoke-cert"))
        .header("content-type", "application/jose+json")
        .header(header.0, header.1)
        .body(payload.to_string())
        .send()
        .await
        .unwrap()
}

async fn problem_type(response: reqwest::Response) -> String {
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/problem+json"
    );
    let body: Value = response.json().await.unwrap();
    body["type"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_revoke_with_certificate_key() {
    let mount = TestMount::new();
    let cert = TestCert::new(&[0x1f, 0x2a, 0x03]);
    let presented = mount.issue(&cert).await;
    let addr = common::spawn_server(mount.service.clone()).await;
    let client = Client::new();

    let response = post(
        &client,
        &addr,
        (JWK_HEADER, cert.encoded_key()),
        json!({ "certificate": cert.encoded(), "reason": 0 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "");

    let record = mount
        .service
        .store()
        .fetch_revocation(presented.serial())
        .await
        .unwrap()
        .expect("revocation record");
    assert_eq!(record.serial_number.as_str(), "1f:2a:03");
    assert_eq!(mount.rebuilder.calls(), vec![1]);

    // A second attempt is reported, not applied
    let response = post(
        &client,
        &addr,
        (JWK_HEADER, cert.encoded_key()),
        json!({ "certificate": cert.encoded() }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        problem_type(response).await,
        "urn:ietf:params:acme:error:alreadyRevoked"
    );
}

#[tokio::test]
async fn test_revoke_expired_certificate() {
    let mount = TestMount::new();
    let cert = TestCert::expired(&[0x05]);
    mount.issue(&cert).await;
    let addr = common::spawn_server(mount.service.clone()).await;

    let response = post(
        &Client::new(),
        &addr,
        (JWK_HEADER, cert.encoded_key()),
        json!({ "certificate": cert.encoded() }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        problem_type(response).await,
        "urn:ietf:params:acme:error:malformed"
    );
}

#[tokio::test]
async fn test_revoke_with_reason() {
    let mount = TestMount::new();
    let cert = TestCert::new(&[0x06]);
    mount.issue(&cert).await;
    let addr = common::spawn_server(mount.service.clone()).await;

    let response = post(
        &Client::new(),
        &addr,
        (JWK_HEADER, cert.encoded_key()),
        json!({ "certificate": cert.encoded(), "reason": 1 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        problem_type(response).await,
        "urn:ietf:params:acme:error:badRevocationReason"
    );
}

#[tokio::test]
async fn test_revoke_with_account() {
    let mount = TestMount::new();
    let cert = TestCert::new(&[0x07, 0x01]);
    let presented = mount.issue(&cert).await;
    for (kid, status) in [("owner", AccountStatus::Valid), ("stale", AccountStatus::Deactivated)] {
        mount
            .accounts
            .save_account(&Account {
                kid: kid.to_string(),
                status,
                contact: vec![format!("mailto:{kid}@example.org")],
                created_at: OffsetDateTime::now_utc(),
            })
            .await
            .unwrap();
        mount
            .accounts
            .track_issued_cert(&IssuedCertEntry {
                account_id: kid.to_string(),
                serial_number: presented.serial().clone(),
                order_id: None,
            })
            .await
            .unwrap();
    }
    let addr = common::spawn_server(mount.service.clone()).await;
    let client = Client::new();
    let payload = json!({ "certificate": cert.encoded() });

    let response = post(&client, &addr, (KID_HEADER, "stale".into()), payload.clone()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        problem_type(response).await,
        "urn:ietf:params:acme:error:unauthorized"
    );

    let response = post(&client, &addr, (KID_HEADER, "owner".into()), payload).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        mount
            .service
            .store()
            .is_revoked(presented.serial())
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_revoke_with_foreign_key() {
    let mount = TestMount::new();
    let cert = TestCert::new(&[0x08]);
    let other = TestCert::new(&[0x09]);
    mount.issue(&cert).await;
    let addr = common::spawn_server(mount.service.clone()).await;

    let response = post(
        &Client::new(),
        &addr,
        (JWK_HEADER, other.encoded_key()),
        json!({ "certificate": cert.encoded() }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        problem_type(response).await,
        "urn:ietf:params:acme:error:malformed"
    );
}
