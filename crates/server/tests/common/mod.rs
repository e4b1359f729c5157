//! Helpers shared by the integration tests.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use transcribe_server::auth::Claims;

/// HS256 token for `user_id`, valid for `ttl_secs`, signed with `secret`.
pub fn mint_token(secret: &str, user_id: i64, email: &str, ttl_secs: u64) -> String {
    let claims = Claims {
        user_id,
        email: email.to_string(),
        exp: chrono::Utc::now().timestamp() as u64 + ttl_secs,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("token encodes")
}
