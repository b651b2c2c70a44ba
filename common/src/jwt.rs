// common/src/jwt.rs
//! HS256 token issuance and validation.
//!
//! Validation checks, in order: signature, issuer, audience, expiry.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;
use crate::models::principal::{Principal, Role};

// JWT Claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // principal id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: Role,
    pub iss: String,
    pub aud: String,
    pub iat: u64,
    pub exp: u64,
}

impl Claims {
    pub fn principal(&self) -> Result<Principal, TokenError> {
        let id = self
            .sub
            .parse::<i64>()
            .map_err(|_| TokenError::InvalidSubject)?;

        Ok(Principal {
            id,
            name: self.name.clone(),
            role: self.role,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token issuer is not accepted")]
    InvalidIssuer,

    #[error("token audience is not accepted")]
    InvalidAudience,

    #[error("token has expired")]
    Expired,

    #[error("token subject is invalid")]
    InvalidSubject,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::InvalidIssuer => TokenError::InvalidIssuer,
            ErrorKind::InvalidAudience => TokenError::InvalidAudience,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSubject => TokenError::InvalidSubject,
            _ => TokenError::Malformed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Mints signed tokens with a fixed lifetime.
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    issuer: String,
    audience: String,
    /// `None` when the configured minutes do not fit a `Duration`
    lifetime: Option<Duration>,
}

impl TokenIssuer {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            key: EncodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            lifetime: Duration::try_minutes(config.lifetime_minutes),
        }
    }

    pub fn issue(&self, principal: &Principal) -> Result<IssuedToken, TokenError> {
        self.issue_at(principal, Utc::now())
    }

    pub fn issue_at(&self, principal: &Principal, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let expires_at = self
            .lifetime
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| TokenError::Signing("token lifetime is out of range".to_string()))?;

        let claims = Claims {
            sub: principal.id.to_string(),
            name: principal.name.clone(),
            role: principal.role,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: unix_seconds(now),
            exp: unix_seconds(expires_at),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }
}

/// Pure validation against the static secret, issuer and audience.
#[derive(Clone)]
pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
    leeway: u64,
}

impl TokenValidator {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        // expiry is checked after issuer and audience, in validate_at
        validation.validate_exp = false;

        Self {
            key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            leeway: config.leeway_seconds,
        }
    }

    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_at(token, unix_seconds(Utc::now()))
    }

    pub fn validate_at(&self, token: &str, now: u64) -> Result<Claims, TokenError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::Malformed);
        }

        let data = decode::<Claims>(token, &self.key, &self.validation)?;

        if data.claims.exp.saturating_add(self.leeway) <= now {
            return Err(TokenError::Expired);
        }

        data.claims.principal()?;
        Ok(data.claims)
    }
}

fn unix_seconds(at: DateTime<Utc>) -> u64 {
    at.timestamp().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "unit-test-secret".to_string(),
            issuer: "task-tracker".to_string(),
            audience: "task-tracker-web".to_string(),
            lifetime_minutes: 60,
            leeway_seconds: 0,
        }
    }

    fn staff() -> Principal {
        Principal::new(42, Role::Staff).with_name("Sam")
    }

    #[test]
    fn test_issue_then_validate() {
        let issued = TokenIssuer::new(&config()).issue(&staff()).unwrap();
        let claims = TokenValidator::new(&config()).validate(&issued.token).unwrap();

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.role, Role::Staff);
        assert_eq!(claims.iss, "task-tracker");
        assert_eq!(claims.aud, "task-tracker-web");
        assert_eq!(claims.principal().unwrap(), staff());
        assert_eq!(claims.exp, claims.iat + 3600);
    }

    #[test]
    fn test_oversized_lifetime_fails_instead_of_panicking() {
        let mut huge = config();
        huge.lifetime_minutes = 1_000_000_000_000;
        assert!(matches!(
            TokenIssuer::new(&huge).issue(&staff()),
            Err(TokenError::Signing(_))
        ));

        huge.lifetime_minutes = i64::MAX;
        assert!(matches!(
            TokenIssuer::new(&huge).issue(&staff()),
            Err(TokenError::Signing(_))
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let two_hours_ago = Utc::now() - Duration::hours(2);
        let issued = TokenIssuer::new(&config()).issue_at(&staff(), two_hours_ago).unwrap();

        let err = TokenValidator::new(&config()).validate(&issued.token).unwrap_err();
        assert_eq!(err, TokenError::Expired);
    }

    #[test]
    fn test_leeway_extends_expiry() {
        let mut lenient = config();
        lenient.leeway_seconds = 120;
        let issued = TokenIssuer::new(&config()).issue(&staff()).unwrap();
        let exp = TokenValidator::new(&config()).validate(&issued.token).unwrap().exp;

        assert!(TokenValidator::new(&lenient).validate_at(&issued.token, exp + 60).is_ok());
        assert_eq!(
            TokenValidator::new(&config()).validate_at(&issued.token, exp + 60),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_wrong_issuer_is_rejected() {
        let mut other = config();
        other.issuer = "someone-else".to_string();
        let issued = TokenIssuer::new(&other).issue(&staff()).unwrap();

        let err = TokenValidator::new(&config()).validate(&issued.token).unwrap_err();
        assert_eq!(err, TokenError::InvalidIssuer);
    }

    #[test]
    fn test_wrong_audience_is_rejected() {
        let mut other = config();
        other.audience = "mobile-app".to_string();
        let issued = TokenIssuer::new(&other).issue(&staff()).unwrap();

        let err = TokenValidator::new(&config()).validate(&issued.token).unwrap_err();
        assert_eq!(err, TokenError::InvalidAudience);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let mut other = config();
        other.secret = "another-secret".to_string();
        let issued = TokenIssuer::new(&other).issue(&staff()).unwrap();

        let err = TokenValidator::new(&config()).validate(&issued.token).unwrap_err();
        assert_eq!(err, TokenError::InvalidSignature);
    }

    #[test]
    fn test_signature_checked_before_expiry() {
        let mut other = config();
        other.secret = "another-secret".to_string();
        let stale = Utc::now() - Duration::days(3);
        let issued = TokenIssuer::new(&other).issue_at(&staff(), stale).unwrap();

        let err = TokenValidator::new(&config()).validate(&issued.token).unwrap_err();
        assert_eq!(err, TokenError::InvalidSignature);
    }

    #[test]
    fn test_garbage_is_malformed() {
        let validator = TokenValidator::new(&config());
        assert_eq!(validator.validate(""), Err(TokenError::Malformed));
        assert_eq!(validator.validate("abc.def.ghi"), Err(TokenError::Malformed));
        assert_eq!(validator.validate("not-a-jwt"), Err(TokenError::Malformed));
    }
}
