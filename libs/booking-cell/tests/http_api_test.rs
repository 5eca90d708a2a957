use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use booking_cell::router::booking_routes;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn test_config(mock_server: &MockServer) -> TestConfig {
    TestConfig {
        supabase_url: mock_server.uri(),
        ..TestConfig::default()
    }
}

fn create_test_app(config: &TestConfig) -> Router {
    booking_routes(Arc::new(config.to_app_config()))
}

#[tokio::test]
async fn requests_without_a_token_are_rejected() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let app = create_test_app(&config);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_tokens_are_rejected() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let app = create_test_app(&config);

    let user = TestUser::client("client@example.com");
    let token = JwtTestUtils::create_expired_token(&user, &config.jwt_secret);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/{}", Uuid::new_v4()))
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn availability_check_round_trips() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server);
    let app = create_test_app(&config);
    let user = TestUser::client("client@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, None);

    // 09:30 Addis Ababa local.
    let start = Utc.with_ymd_and_hms(2026, 9, 1, 6, 30, 0).unwrap();
    let uri = format!(
        "/availability/check?party_id={}&role=lawyer&start_time={}&duration_minutes=30",
        Uuid::new_v4(),
        start.format("%Y-%m-%dT%H:%M:%SZ")
    );

    let response = app
        .oneshot(
            Request::builder()
                .uri(uri)
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let check: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(check["available"], json!(true));
}

#[tokio::test]
async fn clients_cannot_book_for_other_accounts() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let app = create_test_app(&config);

    let user = TestUser::client("client@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, None);

    let body = json!({
        "client_id": Uuid::new_v4(),
        "lawyer_license_number": "LIC-001",
        "start_time": (Utc::now() + Duration::days(1)).to_rfc3339(),
        "duration_minutes": 30,
        "reason": "Contract review"
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn missing_appointment_returns_404() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server);
    let app = create_test_app(&config);
    let user = TestUser::client("client@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, None);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/{}", Uuid::new_v4()))
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn conflicting_booking_returns_409() {
    let mock_server = MockServer::start().await;
    let user = TestUser::client("client@example.com");
    let client_id = user.id.clone();
    let lawyer_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/lawyers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::lawyer_row(
                &lawyer_id.to_string(),
                "LIC-001",
                "Test Lawyer",
                "lawyer@example.com",
                true,
            )
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/clients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::client_row(&client_id, "Test Client", "client@example.com")
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/booking_locks"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::booking_lock_row(&lawyer_id.to_string(), "slot_test")
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/booking_locks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // Tomorrow 09:30 local, with a confirmed booking 15 minutes earlier.
    let date = (Utc::now() + Duration::days(1)).date_naive();
    let start = Utc.from_utc_datetime(&date.and_hms_opt(6, 30, 0).unwrap());
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                &lawyer_id.to_string(),
                start - Duration::minutes(15),
                30,
                "confirmed",
                "paid",
            )
        ])))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server);
    let app = create_test_app(&config);
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, None);

    let body = json!({
        "client_id": client_id,
        "lawyer_license_number": "LIC-001",
        "start_time": start.to_rfc3339(),
        "duration_minutes": 30,
        "reason": "Contract review"
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn clients_can_list_their_own_appointments() {
    let mock_server = MockServer::start().await;
    let user = TestUser::client("client@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                &Uuid::new_v4().to_string(),
                &user.id,
                &Uuid::new_v4().to_string(),
                Utc::now() + Duration::days(2),
                30,
                "pending",
                "unpaid",
            )
        ])))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server);
    let app = create_test_app(&config);
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, None);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/clients/{}", user.id))
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let other_app = create_test_app(&config);
    let response = other_app
        .oneshot(
            Request::builder()
                .uri(format!("/clients/{}", Uuid::new_v4()))
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
