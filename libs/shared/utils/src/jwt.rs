use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use tracing::debug;

use shared_models::auth::{JwtClaims, User};

/// Validate an HS256 bearer token and extract the authenticated user.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<User, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let mut validation = Validation::new(Algorithm::HS256);
    // Supabase tokens carry an audience we do not pin down here
    validation.validate_aud = false;

    let token_data = decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        debug!("Token validation failed: {}", e);
        format!("Invalid token: {}", e)
    })?;

    let claims = token_data.claims;

    Ok(User {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
        created_at: None,
    })
}
