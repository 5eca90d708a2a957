use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub payment_gateway_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            payment_gateway_url: String::new(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            payment_gateway_url: self.payment_gateway_url.clone(),
            payment_poll_interval_seconds: 300,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn lawyer(email: &str) -> Self {
        Self::new(email, "lawyer")
    }

    pub fn client(email: &str) -> Self {
        Self::new(email, "client")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let claims = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("failed to sign test token")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned PostgREST rows for wiremock-backed tests.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn lawyer_row(id: &str, license: &str, name: &str, email: &str, active: bool) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "email": email,
            "phone": "+251911000000",
            "license_number": license,
            "active": active
        })
    }

    pub fn client_row(id: &str, name: &str, email: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "email": email
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn appointment_row(
        id: &str,
        client_id: &str,
        lawyer_id: &str,
        start_time: DateTime<Utc>,
        duration_minutes: i64,
        status: &str,
        payment_status: &str,
    ) -> serde_json::Value {
        let now = Utc::now();
        json!({
            "id": id,
            "client_id": client_id,
            "client_name": "Test Client",
            "client_email": "client@example.com",
            "lawyer_id": lawyer_id,
            "lawyer_name": "Test Lawyer",
            "lawyer_email": "lawyer@example.com",
            "lawyer_phone": "+251911000000",
            "lawyer_license_number": "LIC-001",
            "start_time": start_time.to_rfc3339(),
            "duration_minutes": duration_minutes,
            "reason": "Contract review",
            "notes": null,
            "status": status,
            "payment_status": payment_status,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        })
    }

    pub fn booking_lock_row(lawyer_id: &str, lock_key: &str) -> serde_json::Value {
        let now = Utc::now();
        json!({
            "id": Uuid::new_v4().to_string(),
            "lock_key": lock_key,
            "lawyer_id": lawyer_id,
            "acquired_at": now.to_rfc3339(),
            "expires_at": (now + Duration::seconds(30)).to_rfc3339(),
            "process_id": format!("booking_{}", Uuid::new_v4())
        })
    }
}
