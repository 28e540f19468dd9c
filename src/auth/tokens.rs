//! Session tokens.
//!
//! Tokens are compact HS256 JWTs: `base64url(header).base64url(claims).signature`,
//! all base64url without padding. Expiry is checked with zero clock skew.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use ring::hmac;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthError;
use crate::models::{Role, User};

const ALGORITHM: &str = "HS256";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iss: String,
    pub aud: String,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expires at, seconds since the epoch.
    pub exp: i64,
}

/// Issues and validates session tokens with a shared HMAC key.
pub struct TokenIssuer {
    key: hmac::Key,
    issuer: String,
    audience: String,
    expiry: Duration,
}

impl TokenIssuer {
    pub fn new(
        secret: &[u8],
        issuer: impl Into<String>,
        audience: impl Into<String>,
        expiry_minutes: i64,
    ) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret),
            issuer: issuer.into(),
            audience: audience.into(),
            expiry: Duration::minutes(expiry_minutes),
        }
    }

    /// Lifetime of issued tokens.
    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        self.issue_at(user, Utc::now())
    }

    pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<String, AuthError> {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
        };

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?)
        );
        let signature = hmac::sign(&self.key, signing_input.as_bytes());

        Ok(format!(
            "{}.{}",
            signing_input,
            URL_SAFE_NO_PAD.encode(signature.as_ref())
        ))
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        self.validate_at(token, Utc::now())
    }

    /// Validates the signature, algorithm, issuer, audience and expiry.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let mut parts = token.split('.');
        let (Some(raw_header), Some(raw_claims), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::InvalidToken);
        };

        let header: Header = decode_segment(raw_header)?;
        if header.alg != ALGORITHM {
            return Err(AuthError::InvalidToken);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::InvalidToken)?;
        let signing_input = &token[..raw_header.len() + 1 + raw_claims.len()];
        hmac::verify(&self.key, signing_input.as_bytes(), &signature)
            .map_err(|_| AuthError::InvalidToken)?;

        let claims: Claims = decode_segment(raw_claims)?;
        if claims.iss != self.issuer || claims.aud != self.audience {
            return Err(AuthError::InvalidToken);
        }
        if now.timestamp() >= claims.exp {
            return Err(AuthError::InvalidToken);
        }

        Ok(claims)
    }
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::InvalidToken)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(SECRET, "treeform", "treeform-clients", 60)
    }

    fn user() -> User {
        User::new("alice", "alice@example.com", "hash").with_role(Role::Write)
    }

    #[test]
    fn test_issue_and_validate() {
        let issuer = issuer();
        let user = user();

        let token = issuer.issue(&user).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let claims = issuer.validate(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.role, Role::Write);
        assert_eq!(claims.iss, "treeform");
        assert_eq!(claims.aud, "treeform-clients");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = issuer();
        let issued = Utc::now() - Duration::minutes(61);
        let token = issuer.issue_at(&user(), issued).unwrap();

        assert!(matches!(
            issuer.validate(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_expiry_has_no_skew() {
        let issuer = issuer();
        let issued = Utc::now();
        let token = issuer.issue_at(&user(), issued).unwrap();

        let just_before = issued + Duration::minutes(60) - Duration::seconds(1);
        let at_expiry = issued + Duration::minutes(60);
        assert!(issuer.validate_at(&token, just_before).is_ok());
        assert!(issuer.validate_at(&token, at_expiry).is_err());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token = issuer().issue(&user()).unwrap();
        let other = TokenIssuer::new(
            b"another-secret-key-of-enough-length!",
            "treeform",
            "treeform-clients",
            60,
        );

        assert!(other.validate(&token).is_err());
    }

    #[test]
    fn test_wrong_issuer_or_audience_rejected() {
        let token = issuer().issue(&user()).unwrap();

        let other_issuer = TokenIssuer::new(SECRET, "someone-else", "treeform-clients", 60);
        let other_audience = TokenIssuer::new(SECRET, "treeform", "other-clients", 60);
        assert!(other_issuer.validate(&token).is_err());
        assert!(other_audience.validate(&token).is_err());
    }

    #[test]
    fn test_tampered_claims_rejected() {
        let issuer = issuer();
        let token = issuer.issue(&user()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let mut claims: Claims =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        claims.role = Role::Admin;
        let forged = format!(
            "{}.{}.{}",
            parts[0],
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap()),
            parts[2]
        );

        assert!(issuer.validate(&forged).is_err());
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let issuer = issuer();
        let token = issuer.issue(&user()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);

        let forged = format!("{}.{}.", header, parts[1]);

        assert!(issuer.validate(&forged).is_err());
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let issuer = issuer();
        for token in ["", "abc", "a.b", "a.b.c.d", "!!.!!.!!"] {
            assert!(issuer.validate(token).is_err(), "accepted {:?}", token);
        }
    }
}
