use std::sync::{Arc, OnceLock};

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::errors::CommentaryError;

const TOKEN_ACCESS: &str = "access";
const TOKEN_REFRESH: &str = "refresh";

/// Global cached JwtService instance
static JWT_SERVICE: OnceLock<Arc<JwtService>> = OnceLock::new();

/// Get the cached JwtService instance
///
/// Initialized once from `auth` config on first use.
pub fn get_jwt_service() -> Arc<JwtService> {
    JWT_SERVICE
        .get_or_init(|| Arc::new(JwtService::from_config()))
        .clone()
}

/// Access Token Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// 用户 ID
    pub sub: String,
    pub username: String,
    pub staff: bool,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub token_type: String,
}

impl AccessClaims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// Refresh Token Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub token_type: String,
}

impl RefreshClaims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// 签发给客户端的令牌对
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// JWT Service for generating and validating tokens
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_minutes: u64,
    refresh_token_days: u64,
}

impl JwtService {
    pub fn new(secret: &str, access_token_minutes: u64, refresh_token_days: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_minutes,
            refresh_token_days,
        }
    }

    /// Create JwtService from config
    pub fn from_config() -> Self {
        let auth = crate::config::get_config().auth.clone();

        // 未配置 secret 时随机生成，重启后旧 token 全部失效
        let jwt_secret = if auth.jwt_secret.is_empty() {
            tracing::warn!("JWT secret not configured, generating a random one");
            crate::utils::generate_random_code(64)
        } else {
            auth.jwt_secret
        };

        Self::new(
            &jwt_secret,
            auth.access_token_minutes,
            auth.refresh_token_days,
        )
    }

    /// Generate Access Token (short-lived)
    pub fn generate_access_token(
        &self,
        user_id: i64,
        username: &str,
        staff: bool,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user_id.to_string(),
            username: username.to_string(),
            staff,
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.access_token_minutes as i64)).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            token_type: TOKEN_ACCESS.to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
    }

    /// Generate Refresh Token (long-lived)
    pub fn generate_refresh_token(&self, user_id: i64) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(self.refresh_token_days as i64)).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            token_type: TOKEN_REFRESH.to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
    }

    pub fn token_pair(
        &self,
        user_id: i64,
        username: &str,
        staff: bool,
    ) -> Result<TokenPair, CommentaryError> {
        Ok(TokenPair {
            access: self.generate_access_token(user_id, username, staff)?,
            refresh: self.generate_refresh_token(user_id)?,
        })
    }

    /// Validate Access Token
    pub fn validate_access_token(
        &self,
        token: &str,
    ) -> Result<AccessClaims, jsonwebtoken::errors::Error> {
        let token_data = decode::<AccessClaims>(token, &self.decoding_key, &Validation::default())?;

        if token_data.claims.token_type != TOKEN_ACCESS {
            return Err(jsonwebtoken::errors::Error::from(
                jsonwebtoken::errors::ErrorKind::InvalidToken,
            ));
        }

        Ok(token_data.claims)
    }

    /// Validate Refresh Token
    pub fn validate_refresh_token(
        &self,
        token: &str,
    ) -> Result<RefreshClaims, jsonwebtoken::errors::Error> {
        let token_data =
            decode::<RefreshClaims>(token, &self.decoding_key, &Validation::default())?;

        if token_data.claims.token_type != TOKEN_REFRESH {
            return Err(jsonwebtoken::errors::Error::from(
                jsonwebtoken::errors::ErrorKind::InvalidToken,
            ));
        }

        Ok(token_data.claims)
    }
}

impl From<jsonwebtoken::errors::Error> for CommentaryError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                CommentaryError::unauthorized("Token is expired")
            }
            _ => CommentaryError::unauthorized("Token is invalid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> JwtService {
        JwtService::new("test_secret_key_32_bytes_long!!", 15, 7)
    }

    #[test]
    fn test_generate_and_validate_access_token() {
        let service = create_test_service();
        let token = service.generate_access_token(42, "alice", true).unwrap();
        let claims = service.validate_access_token(&token).unwrap();

        assert_eq!(claims.user_id(), Some(42));
        assert_eq!(claims.username, "alice");
        assert!(claims.staff);
        assert_eq!(claims.token_type, "access");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_pair_round_trip() {
        let service = create_test_service();
        let pair = service.token_pair(7, "bob", false).unwrap();
        assert_eq!(
            service.validate_refresh_token(&pair.refresh).unwrap().user_id(),
            Some(7)
        );
        assert!(!service.validate_access_token(&pair.access).unwrap().staff);
    }

    #[test]
    fn test_access_token_rejected_as_refresh() {
        let service = create_test_service();
        let access_token = service.generate_access_token(1, "a", false).unwrap();
        assert!(service.validate_refresh_token(&access_token).is_err());
    }

    #[test]
    fn test_refresh_token_rejected_as_access() {
        let service = create_test_service();
        let refresh_token = service.generate_refresh_token(1).unwrap();
        assert!(service.validate_access_token(&refresh_token).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let service1 = create_test_service();
        let service2 = JwtService::new("different_secret_key_32_bytes!!", 15, 7);

        let token = service1.generate_access_token(1, "a", false).unwrap();
        let err = service2.validate_access_token(&token).unwrap_err();
        assert!(matches!(
            CommentaryError::from(err),
            CommentaryError::Unauthorized(_)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = create_test_service();

        // 超过默认 leeway 的过期时间
        let now = chrono::Utc::now();
        let claims = AccessClaims {
            sub: "1".to_string(),
            username: "a".to_string(),
            staff: false,
            iat: (now - chrono::Duration::hours(2)).timestamp(),
            exp: (now - chrono::Duration::hours(1)).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            token_type: "access".to_string(),
        };

        let encoding_key =
            jsonwebtoken::EncodingKey::from_secret(b"test_secret_key_32_bytes_long!!");
        let token =
            jsonwebtoken::encode(&jsonwebtoken::Header::default(), &claims, &encoding_key).unwrap();

        let err = service.validate_access_token(&token).unwrap_err();
        assert_eq!(CommentaryError::from(err).message(), "Token is expired");
    }
}
