//! Signed bearer tokens.
//!
//! Format: `base64url(claims_json) "." hex(hmac_sha256(key, base64url(claims_json)))`.
//! Claims are `{"sub": <user id>, "exp": <unix seconds>}`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use emporium_core::UserId;

use super::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
}

/// A freshly issued token and its expiry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: UserId,
    exp: i64,
}

/// Issues and verifies bearer tokens with a shared HMAC key.
#[derive(Clone)]
pub struct TokenSigner {
    key: SecretString,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("key", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenSigner {
    #[must_use]
    pub const fn new(key: SecretString, ttl: Duration) -> Self {
        Self { key, ttl }
    }

    fn mac(&self) -> Result<HmacSha256, AuthError> {
        HmacSha256::new_from_slice(self.key.expose_secret().as_bytes())
            .map_err(|_| AuthError::TokenEncoding)
    }

    /// Issue a token for `user_id` valid from `now` for the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenEncoding` if the claims cannot be serialized.
    pub fn issue(&self, user_id: UserId, now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: user_id,
            exp: expires_at.timestamp(),
        };
        let json = serde_json::to_vec(&claims).map_err(|_| AuthError::TokenEncoding)?;
        let payload = URL_SAFE_NO_PAD.encode(json);

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(IssuedToken {
            token: format!("{payload}.{signature}"),
            expires_at,
        })
    }

    /// Check a token's signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for malformed or forged tokens and
    /// `AuthError::TokenExpired` once `exp` is at or before `now`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, AuthError> {
        let (payload, signature) = token.split_once('.').ok_or(AuthError::InvalidToken)?;
        let signature = hex::decode(signature).map_err(|_| AuthError::InvalidToken)?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::InvalidToken)?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AuthError::InvalidToken)?;
        let claims: Claims = serde_json::from_slice(&json).map_err(|_| AuthError::InvalidToken)?;

        if claims.exp <= now.timestamp() {
            return Err(AuthError::TokenExpired);
        }
        Ok(Identity {
            user_id: claims.sub,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(
            SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6!"),
            Duration::hours(1),
        )
    }

    #[test]
    fn test_issued_token_verifies() {
        let user_id = UserId::generate();
        let now = Utc::now();
        let issued = signer().issue(user_id, now).unwrap();

        let identity = signer().verify(&issued.token, now).unwrap();
        assert_eq!(identity.user_id, user_id);
        assert_eq!(issued.expires_at, now + Duration::hours(1));
    }

    #[test]
    fn test_expired_token_rejected() {
        let now = Utc::now();
        let issued = signer().issue(UserId::generate(), now).unwrap();

        let err = signer()
            .verify(&issued.token, now + Duration::hours(2))
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let now = Utc::now();
        let issued = signer().issue(UserId::generate(), now).unwrap();
        let (_, signature) = issued.token.split_once('.').unwrap();

        let forged_claims = serde_json::json!({"sub": UserId::generate(), "exp": now.timestamp() + 60});
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{forged_payload}.{signature}");

        assert!(matches!(
            signer().verify(&forged, now),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_other_key_rejected() {
        let now = Utc::now();
        let issued = signer().issue(UserId::generate(), now).unwrap();
        let other = TokenSigner::new(
            SecretString::from("Zq8#Lw2!Rt6$Vb1@Nm4%Kc7^Hs0&Jd5*"),
            Duration::hours(1),
        );
        assert!(matches!(
            other.verify(&issued.token, now),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        let now = Utc::now();
        for token in ["", "nodot", "abc.zz", "abc.", ".abcd"] {
            assert!(matches!(
                signer().verify(token, now),
                Err(AuthError::InvalidToken)
            ));
        }
    }
}
