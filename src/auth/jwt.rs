use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::claims::{Claims, Identity};
use crate::{config::JwtConfig, state::AppState};

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Issues and checks HS256 bearer tokens. Verification is stateless, so an
/// issued token stays valid until it expires.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

impl JwtKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self::new(&cfg.secret, Duration::minutes(cfg.ttl_minutes))
    }

    pub fn issue(&self, identity: &Identity) -> Result<String, TokenError> {
        self.issue_at(identity, OffsetDateTime::now_utc())
    }

    pub fn issue_at(&self, identity: &Identity, now: OffsetDateTime) -> Result<String, TokenError> {
        let claims = Claims {
            id: identity.id,
            email: identity.email.clone(),
            iat: now.unix_timestamp(),
            exp: (now + self.ttl).unix_timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Signing)?;
        debug!(user_id = identity.id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// Checks signature and shape, then expiry against `now` with no leeway.
    pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<Identity, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            }
        })?;

        if now.unix_timestamp() >= data.claims.exp {
            return Err(TokenError::Expired);
        }

        debug!(user_id = data.claims.id, "jwt verified");
        Ok(data.claims.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(secret: &str) -> JwtKeys {
        JwtKeys::new(secret, Duration::hours(1))
    }

    fn alice() -> Identity {
        Identity {
            id: 7,
            email: "alice@example.com".into(),
        }
    }

    #[test]
    fn issue_then_verify_returns_the_same_identity() {
        let keys = keys("dev-secret");
        let token = keys.issue(&alice()).expect("sign");
        assert_eq!(keys.verify(&token).expect("verify"), alice());
    }

    #[test]
    fn token_is_valid_until_ttl_elapses() {
        let keys = keys("dev-secret");
        let issued = OffsetDateTime::now_utc();
        let token = keys.issue_at(&alice(), issued).unwrap();

        let just_before = issued + Duration::minutes(59);
        assert_eq!(keys.verify_at(&token, just_before).unwrap(), alice());

        let after = issued + Duration::minutes(61);
        assert!(matches!(keys.verify_at(&token, after), Err(TokenError::Expired)));
    }

    #[test]
    fn token_issued_in_the_past_is_expired_now() {
        let keys = keys("dev-secret");
        let token = keys
            .issue_at(&alice(), OffsetDateTime::now_utc() - Duration::hours(2))
            .unwrap();
        assert!(matches!(keys.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn verify_rejects_token_signed_with_another_secret() {
        let token = keys("secret-a").issue(&alice()).unwrap();
        assert!(matches!(
            keys("secret-b").verify(&token),
            Err(TokenError::BadSignature)
        ));
    }

    #[test]
    fn verify_rejects_garbage() {
        let keys = keys("dev-secret");
        assert!(matches!(keys.verify("not.a.jwt"), Err(TokenError::Malformed)));
        assert!(matches!(keys.verify(""), Err(TokenError::Malformed)));
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let keys = keys("dev-secret");
        let token = keys.issue(&alice()).unwrap();
        let other = keys
            .issue(&Identity {
                id: 1,
                email: "root@example.com".into(),
            })
            .unwrap();
        let other_payload = other.split('.').nth(1).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = other_payload;
        let forged = parts.join(".");
        assert!(matches!(keys.verify(&forged), Err(TokenError::BadSignature)));
    }

    #[test]
    fn ttl_comes_from_config() {
        let keys = JwtKeys::from_config(&JwtConfig {
            secret: "s".into(),
            ttl_minutes: 5,
        });
        let issued = OffsetDateTime::now_utc();
        let token = keys.issue_at(&alice(), issued).unwrap();
        assert!(keys.verify_at(&token, issued + Duration::minutes(4)).is_ok());
        assert!(keys.verify_at(&token, issued + Duration::minutes(5)).is_err());
    }
}
