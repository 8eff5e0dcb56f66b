use crate::config::JwtConfig;
use crate::models::{Role, User};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// HS256 token issuing and validation.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub company_id: Uuid,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub jti: String,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            expiry_hours: config.expiry_hours,
        }
    }

    /// Token lifetime in seconds.
    pub fn expires_in(&self) -> i64 {
        self.expiry_hours * 3600
    }

    pub fn issue(&self, user: &User, role: Role) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.user_id,
            email: user.email.clone(),
            role,
            company_id: user.company_id,
            exp: (now + Duration::hours(self.expiry_hours)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))
    }

    pub fn validate(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        decode::<Claims>(token, &self.decoding_key, &validation).map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn service(secret: &str, expiry_hours: i64) -> JwtService {
        JwtService::new(&JwtConfig {
            secret: Secret::new(secret.to_string()),
            expiry_hours,
        })
    }

    fn user() -> User {
        User {
            user_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            email: "owner@example.com".to_string(),
            name: "Owner".to_string(),
            password_hash: String::new(),
            role: "ADMIN".to_string(),
            created_utc: Utc::now(),
            updated_utc: Utc::now(),
        }
    }

    #[test]
    fn test_issue_and_validate() {
        let jwt = service("test-secret", 1);
        let user = user();

        let token = jwt.issue(&user, Role::Manager).unwrap();
        let claims = jwt.validate(&token).unwrap();

        assert_eq!(claims.sub, user.user_id);
        assert_eq!(claims.company_id, user.company_id);
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(jwt.expires_in(), 3600);
    }

    #[test]
    fn test_rejects_wrong_secret() {
        let token = service("secret-a", 1).issue(&user(), Role::Admin).unwrap();
        assert!(service("secret-b", 1).validate(&token).is_err());
    }

    #[test]
    fn test_rejects_expired_token() {
        let token = service("test-secret", -2).issue(&user(), Role::Admin).unwrap();
        assert!(service("test-secret", -2).validate(&token).is_err());
    }
}
