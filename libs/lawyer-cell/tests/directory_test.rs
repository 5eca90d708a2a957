use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lawyer_cell::services::directory::LawyerDirectoryService;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn service_backed_by(mock_server: &MockServer) -> LawyerDirectoryService {
    let config = TestConfig {
        supabase_url: mock_server.uri(),
        ..TestConfig::default()
    }
    .to_app_config();
    LawyerDirectoryService::new(&config)
}

#[tokio::test]
async fn finds_lawyer_by_license_number() {
    let mock_server = MockServer::start().await;
    let lawyer_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/lawyers"))
        .and(query_param("license_number", "eq.LIC-001"))
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

    let service = service_backed_by(&mock_server);
    let lawyer = service
        .find_by_license("LIC-001", "token")
        .await
        .unwrap()
        .expect("lawyer should be found");

    assert_eq!(lawyer.id, lawyer_id);
    assert_eq!(lawyer.license_number, "LIC-001");
    assert!(lawyer.active);
}

#[tokio::test]
async fn unknown_license_yields_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/lawyers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = service_backed_by(&mock_server);
    let lawyer = service.find_by_license("LIC-999", "token").await.unwrap();
    assert!(lawyer.is_none());
}

#[tokio::test]
async fn active_lookup_filters_suspended_lawyers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/lawyers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::lawyer_row(
                &Uuid::new_v4().to_string(),
                "LIC-002",
                "Suspended Lawyer",
                "lawyer@example.com",
                false,
            )
        ])))
        .mount(&mock_server)
        .await;

    let service = service_backed_by(&mock_server);
    let lawyer = service
        .find_active_by_license("LIC-002", "token")
        .await
        .unwrap();
    assert!(lawyer.is_none());
}
