use anyhow::{bail, Result};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::token::TokenResponse;

/// JWT issuer identifier
const ISSUER: &str = "gazette/token-service";

/// JWT audience identifier
const AUDIENCE: &str = "gazette/api";

/// Claims represents public claim values (as specified in RFC 7519)
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    pub aud: String, // Optional. The intended recipient of the token
    pub exp: usize,  // Required. Token expiration time (timestamp)
    pub iat: usize,  // Optional. Time at which token was issued (timestamp)
    pub iss: String, // Optional. Token issuer
    pub nbf: usize,  // Optional. Time before which token must not be accepted (timestamp)
    pub sub: String, // Optional. Subject of the token (user identifier)
}

/// Why a token was rejected. The variant is logged server-side; clients
/// only ever see a generic 401.
#[derive(Debug, Error, PartialEq)]
pub enum TokenError {
    /// Structure, claims or issuer/audience checks failed, or the token is
    /// not yet valid.
    #[error("token is malformed")]
    Malformed,

    /// The signature does not match the configured secret.
    #[error("token signature mismatch")]
    BadSignature,

    /// The token is at or past its expiration time.
    #[error("token is expired")]
    Expired,
}

/// Issues and validates HS256-signed JSON Web Tokens. The signing secret is
/// injected from server configuration; time is always passed in by the
/// caller so the service itself never reads a clock.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry: usize,
}

impl TokenService {
    /// Creates a new token service.
    ///
    /// # Arguments
    /// * `secret` - HMAC signing secret, must not be empty
    /// * `expiry` - Token expiration time in seconds
    pub fn new(secret: &str, expiry: u64) -> Result<Self> {
        if secret.is_empty() {
            bail!("jwt secret cannot be empty");
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry: expiry as usize,
        })
    }

    #[cfg(test)]
    pub fn new_test() -> Self {
        Self::new("test-secret", 60).unwrap()
    }

    pub fn issue(&self, user: &str, now: u64) -> Result<TokenResponse> {
        let now = now as usize;

        let claims = Claims {
            aud: String::from(AUDIENCE),
            exp: now + self.expiry,
            iat: now,
            iss: String::from(ISSUER),
            nbf: now,
            sub: String::from(user),
        };

        match encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key) {
            Ok(token) => Ok(TokenResponse {
                user: claims.sub,
                token,
                expire_in: self.expiry,
            }),
            Err(e) => bail!("generate jwt token failed: {e}"),
        }
    }

    /// Validates a token against the caller's clock and returns its subject.
    /// Must never panic, whatever the input.
    pub fn validate(&self, token: &str, now: u64) -> Result<String, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_audience(&[AUDIENCE]);
        validation.set_required_spec_claims(&["aud", "exp", "iat", "iss", "nbf", "sub"]);
        // Expiration is compared against the caller's clock below, not the
        // system clock.
        validation.validate_exp = false;

        let claims = match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => data.claims,
            Err(e) => match e.kind() {
                ErrorKind::InvalidSignature => return Err(TokenError::BadSignature),
                _ => return Err(TokenError::Malformed),
            },
        };

        if claims.sub.is_empty() {
            return Err(TokenError::Malformed);
        }

        let now = now as usize;
        if now >= claims.exp {
            return Err(TokenError::Expired);
        }

        if now < claims.nbf {
            return Err(TokenError::Malformed);
        }

        Ok(claims.sub)
    }
}
