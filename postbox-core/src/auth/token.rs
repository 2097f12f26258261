//! Signed, time-limited session credentials
//!
//! Credentials are HS256 JWTs carrying the user id (`sub`) and email. They are
//! verified with zero leeway so a token is unusable the moment `exp` passes.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::AuthConfig;
use crate::model::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Token expired")]
    Expired,

    #[error("Failed to sign token: {0}")]
    Signing(String),

    #[error("Signing secret must not be empty")]
    InvalidSecret,
}

/// JWT claim set
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// Who a verified credential belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "userID")]
    pub user_id: UserId,
    pub email: String,
}

/// A freshly signed credential
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl: Duration,
}

impl TokenService {
    pub fn new(
        secret: &str,
        issuer: impl Into<String>,
        ttl: std::time::Duration,
    ) -> Result<Self, TokenError> {
        if secret.trim().is_empty() {
            return Err(TokenError::InvalidSecret);
        }
        let issuer = issuer.into();
        let ttl = Duration::from_std(ttl).map_err(|e| TokenError::Signing(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[issuer.clone()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            issuer,
            ttl,
        })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, TokenError> {
        Self::new(&config.jwt_secret, config.issuer.clone(), config.token_ttl)
    }

    /// How long issued credentials stay valid
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: &UserId, email: &str) -> Result<IssuedToken, TokenError> {
        self.issue_at(user_id, email, Utc::now())
    }

    /// Issue a credential as if signed at `issued_at`
    pub fn issue_at(
        &self,
        user_id: &UserId,
        email: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let expires_at = issued_at.checked_add_signed(self.ttl).ok_or_else(|| {
            TokenError::Signing(format!("expiry out of range for ttl {}", self.ttl))
        })?;
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Validate signature, issuer and expiry
    pub fn decode(&self, token: &str) -> Result<Identity, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed(e.to_string()),
            }
        })?;

        Ok(Identity {
            user_id: UserId(data.claims.sub),
            email: data.claims.email,
        })
    }

    /// [`TokenService::decode`] with failures downgraded to "no identity"
    pub fn verify(&self, token: &str) -> Option<Identity> {
        match self.decode(token) {
            Ok(identity) => Some(identity),
            Err(e) => {
                debug!(error = %e, "Rejected bearer credential");
                None
            }
        }
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: std::time::Duration = std::time::Duration::from_secs(3600);

    fn service() -> TokenService {
        TokenService::new("test-secret", "postbox", HOUR).unwrap()
    }

    #[test]
    fn test_issue_then_verify() {
        let tokens = service();
        let issued = tokens.issue(&UserId::new("u-a"), "a@x.com").unwrap();

        let identity = tokens.verify(&issued.token).expect("fresh token verifies");
        assert_eq!(identity.user_id, UserId::new("u-a"));
        assert_eq!(identity.email, "a@x.com");
    }

    #[test]
    fn test_expiry_is_one_ttl_after_issue() {
        let tokens = service();
        let at = Utc::now();
        let issued = tokens.issue_at(&UserId::new("u-a"), "a@x.com", at).unwrap();
        assert_eq!(issued.expires_at, at + Duration::hours(1));
    }

    #[test]
    fn test_expired_token_yields_no_identity() {
        let tokens = service();
        let two_hours_ago = Utc::now() - Duration::hours(2);
        let issued = tokens
            .issue_at(&UserId::new("u-a"), "a@x.com", two_hours_ago)
            .unwrap();

        assert_eq!(tokens.decode(&issued.token), Err(TokenError::Expired));
        assert!(tokens.verify(&issued.token).is_none());
    }

    #[test]
    fn test_unrepresentable_expiry_is_an_error() {
        let ttl = std::time::Duration::from_secs(300_000 * 365 * 24 * 3600);
        let tokens = TokenService::new("test-secret", "postbox", ttl).unwrap();

        assert!(matches!(
            tokens.issue(&UserId::new("u-a"), "a@x.com"),
            Err(TokenError::Signing(_))
        ));
    }

    #[test]
    fn test_token_just_inside_window_verifies() {
        let tokens = service();
        let almost_an_hour_ago = Utc::now() - Duration::minutes(59);
        let issued = tokens
            .issue_at(&UserId::new("u-a"), "a@x.com", almost_an_hour_ago)
            .unwrap();

        assert!(tokens.verify(&issued.token).is_some());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issued = TokenService::new("other-secret", "postbox", HOUR)
            .unwrap()
            .issue(&UserId::new("u-a"), "a@x.com")
            .unwrap();

        assert!(matches!(
            service().decode(&issued.token),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_wrong_issuer_is_rejected() {
        let issued = TokenService::new("test-secret", "someone-else", HOUR)
            .unwrap()
            .issue(&UserId::new("u-a"), "a@x.com")
            .unwrap();

        assert!(service().verify(&issued.token).is_none());
    }

    #[test]
    fn test_garbage_is_rejected_without_panicking() {
        let tokens = service();
        for garbage in ["", "not-a-jwt", "a.b.c", "Bearer xyz"] {
            assert!(tokens.verify(garbage).is_none(), "{garbage:?} must not verify");
        }
    }

    #[test]
    fn test_empty_secret_is_refused() {
        assert!(matches!(
            TokenService::new("  ", "postbox", HOUR),
            Err(TokenError::InvalidSecret)
        ));
    }

    #[test]
    fn test_debug_does_not_leak_keys() {
        let rendered = format!("{:?}", service());
        assert!(!rendered.contains("test-secret"));
    }
}
