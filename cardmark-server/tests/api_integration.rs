//! API integration tests for cardmark-server.
//!
//! These tests drive the router with realistic multipart requests, covering
//! the register -> download -> verify flow through the REST endpoints.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use cardmark_core::{CredentialLedger, InMemoryLedger};
use cardmark_server::{create_router, AppState, ArtifactStore, Config};
use image::{DynamicImage, ImageBuffer, Rgb};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "----TestBoundary7MA4YWxkTrZu0gW";
const HOLDER: &str = "0x1111111111111111111111111111111111111111";
const ISSUER: &str = "0x2222222222222222222222222222222222222222";

/// Helper to create a multipart body with an image and optional wallet address
fn card_multipart(
    image: &[u8],
    content_type: &str,
    wallet_address: Option<&str>,
) -> (String, Vec<u8>) {
    let mut body = Vec::new();

    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"image\"; filename=\"photo.jpg\"\r\n",
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(image);
    body.extend_from_slice(b"\r\n");

    if let Some(address) = wallet_address {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"walletAddress\"\r\n\r\n");
        body.extend_from_slice(address.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

/// Multipart body with only a wallet address
fn wallet_only_multipart(wallet_address: &str) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"walletAddress\"\r\n\r\n");
    body.extend_from_slice(wallet_address.as_bytes());
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

fn create_test_jpeg() -> Vec<u8> {
    let img = ImageBuffer::from_fn(320, 240, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Jpeg)
        .unwrap();
    buf.into_inner()
}

/// Test app plus the temp dir backing its artifact store
struct TestApp {
    router: Router,
    _artifacts: TempDir,
}

async fn create_test_app(ledger: Option<Arc<dyn CredentialLedger>>) -> TestApp {
    let dir = TempDir::new().unwrap();
    let config = Config {
        ledger_issuer_address: Some(ISSUER.to_string()),
        ledger_timeout_secs: 2,
        ..Config::default()
    };
    let store = ArtifactStore::open(dir.path(), Duration::from_secs(60))
        .await
        .unwrap();
    let state = AppState::new(&config, ledger, Arc::new(store)).unwrap();

    TestApp {
        router: create_router(state),
        _artifacts: dir,
    }
}

fn in_memory_ledger() -> Arc<dyn CredentialLedger> {
    Arc::new(InMemoryLedger::new(ISSUER))
}

async fn post_multipart(app: &Router, uri: &str, (content_type, body): (String, Vec<u8>)) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn card_bytes(register_json: &Value) -> Vec<u8> {
    let data_url = register_json["membershipCard"]["imageData"].as_str().unwrap();
    let encoded = data_url.strip_prefix("data:image/jpeg;base64,").unwrap();
    BASE64.decode(encoded).unwrap()
}

// ============================================================================
// Health & Readiness Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let app = create_test_app(Some(in_memory_ledger())).await;

    let response = app
        .router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "cardmark-server");
    assert_eq!(json["ledgerConfigured"], true);
}

#[tokio::test]
async fn test_ready_endpoint_returns_ok() {
    let app = create_test_app(None).await;

    let response = app
        .router
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ============================================================================
// Register / Verify Flow
// ============================================================================

#[tokio::test]
async fn test_register_then_verify_with_ownership() {
    let app = create_test_app(Some(in_memory_ledger())).await;

    let (status, registered) = post_multipart(
        &app.router,
        "/api/register",
        card_multipart(&create_test_jpeg(), "image/jpeg", Some(HOLDER)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{registered}");
    assert_eq!(registered["walletAddress"], HOLDER);
    assert_eq!(registered["anchor"]["status"], "anchored");
    assert_eq!(registered["hashPrefix"].as_str().unwrap().len(), 16);
    assert_eq!(registered["saltPrefix"].as_str().unwrap().len(), 16);

    let user_id = registered["userId"].as_str().unwrap();
    assert_eq!(
        registered["membershipCard"]["filename"],
        format!("member-{}.jpg", user_id)
    );

    let verification_data = BASE64
        .decode(registered["membershipCard"]["verificationData"].as_str().unwrap())
        .unwrap();
    let embedded: Value = serde_json::from_slice(&verification_data).unwrap();
    assert_eq!(embedded["userId"], user_id);
    assert_eq!(embedded["hash"], registered["hashPrefix"]);

    let card = card_bytes(&registered);
    let (status, verified) = post_multipart(
        &app.router,
        "/api/verify",
        card_multipart(&card, "image/jpeg", Some(HOLDER)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["valid"], true);
    assert_eq!(verified["outcome"], "valid");
    assert_eq!(verified["ownershipVerified"], true);
    assert_eq!(verified["data"], embedded);
}

#[tokio::test]
async fn test_verify_without_wallet_skips_ownership() {
    let app = create_test_app(Some(in_memory_ledger())).await;

    let (_, registered) = post_multipart(
        &app.router,
        "/api/register",
        card_multipart(&create_test_jpeg(), "image/jpeg", Some(HOLDER)),
    )
    .await;

    let (status, verified) = post_multipart(
        &app.router,
        "/api/verify",
        card_multipart(&card_bytes(&registered), "image/jpeg", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["valid"], true);
    assert_eq!(verified["ownershipVerified"], false);
    assert_eq!(verified["ownership"]["status"], "not_requested");
    assert!(verified["walletAddress"].is_null());
}

#[tokio::test]
async fn test_verify_plain_photo_is_invalid_not_error() {
    let app = create_test_app(None).await;

    let (status, verified) = post_multipart(
        &app.router,
        "/api/verify",
        card_multipart(&create_test_jpeg(), "image/jpeg", Some(HOLDER)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["valid"], false);
    assert_eq!(verified["outcome"], "absent");
    assert_eq!(verified["ownershipVerified"], false);
}

#[tokio::test]
async fn test_unreachable_ledger_degrades_gracefully() {
    let ledger = Config {
        ledger_url: Some("http://127.0.0.1:9".into()),
        ledger_timeout_secs: 2,
        ..Config::default()
    }
    .build_ledger()
    .unwrap();
    let app = create_test_app(ledger).await;

    let (status, registered) = post_multipart(
        &app.router,
        "/api/register",
        card_multipart(&create_test_jpeg(), "image/jpeg", Some(HOLDER)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{registered}");
    assert_eq!(registered["anchor"]["status"], "failed");

    let (status, verified) = post_multipart(
        &app.router,
        "/api/verify",
        card_multipart(&card_bytes(&registered), "image/jpeg", Some(HOLDER)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["valid"], true);
    assert_eq!(verified["ownershipVerified"], false);
    assert_eq!(verified["ownership"]["status"], "unavailable");
}

#[tokio::test]
async fn test_register_without_ledger_is_skipped() {
    let app = create_test_app(None).await;

    let (status, registered) = post_multipart(
        &app.router,
        "/api/register",
        card_multipart(&create_test_jpeg(), "image/png", Some(HOLDER)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(registered["anchor"]["status"], "skipped");
}

#[tokio::test]
async fn test_storage_failure_leaves_ledger_untouched() {
    let dir = TempDir::new().unwrap();
    let cards_dir = dir.path().join("cards");
    let store = ArtifactStore::open(&cards_dir, Duration::from_secs(60))
        .await
        .unwrap();
    let ledger = Arc::new(InMemoryLedger::new(ISSUER));
    let config = Config {
        ledger_issuer_address: Some(ISSUER.to_string()),
        ledger_timeout_secs: 2,
        ..Config::default()
    };
    let state = AppState::new(&config, Some(ledger.clone()), Arc::new(store)).unwrap();
    let router = create_router(state);

    std::fs::remove_dir_all(&cards_dir).unwrap();

    let (status, body) = post_multipart(
        &router,
        "/api/register",
        card_multipart(&create_test_jpeg(), "image/jpeg", Some(HOLDER)),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "STORAGE_ERROR");
    assert!(ledger.is_empty(), "no credential may be issued for a lost card");
}

// ============================================================================
// Card Download
// ============================================================================

#[tokio::test]
async fn test_card_download_while_alive() {
    let app = create_test_app(None).await;

    let (_, registered) = post_multipart(
        &app.router,
        "/api/register",
        card_multipart(&create_test_jpeg(), "image/jpeg", Some(HOLDER)),
    )
    .await;
    let artifact_id = registered["membershipCard"]["artifactId"].as_str().unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/cards/{}", artifact_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(body.to_vec(), card_bytes(&registered));
}

#[tokio::test]
async fn test_card_download_unknown_ids() {
    let app = create_test_app(None).await;

    for id in ["3f1c2a5e-8a8b-4c53-9a57-0a2b7c1d9e10", "not-a-uuid"] {
        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/cards/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "id {id}");
    }
}

// ============================================================================
// Input Validation
// ============================================================================

#[tokio::test]
async fn test_register_requires_wallet_address() {
    let app = create_test_app(None).await;

    let (status, json) = post_multipart(
        &app.router,
        "/api/register",
        card_multipart(&create_test_jpeg(), "image/jpeg", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_register_requires_image() {
    let app = create_test_app(None).await;

    let (status, json) =
        post_multipart(&app.router, "/api/register", wallet_only_multipart(HOLDER)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("image"));
}

#[tokio::test]
async fn test_register_rejects_undecodable_image() {
    let app = create_test_app(None).await;

    let (status, json) = post_multipart(
        &app.router,
        "/api/register",
        card_multipart(b"definitely not a jpeg", "image/jpeg", Some(HOLDER)),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "RENDER_FAILURE");
}

#[tokio::test]
async fn test_verify_rejects_non_image_content_type() {
    let app = create_test_app(None).await;

    let (status, json) = post_multipart(
        &app.router,
        "/api/verify",
        card_multipart(b"<html></html>", "text/html", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_INPUT");
}
