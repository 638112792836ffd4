//! Signed bearer tokens.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AccessError;

pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;
/// Longest accepted token lifetime: one week.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 7 * 24 * 60;
pub const MIN_SECRET_LEN: usize = 32;

/// Settings for issuing and validating tokens.
///
/// Built once at startup and handed to [`TokenAuthority::new`].
#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl AuthConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: "http://localhost:5122".to_string(),
            audience: "http://localhost:5173".to_string(),
            ttl: Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES),
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Registered claims carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub jti: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly issued token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl TokenAuthority {
    /// Creates an authority from configuration.
    ///
    /// Fails with [`AccessError::WeakSecret`] if the secret is shorter than
    /// [`MIN_SECRET_LEN`] bytes, and with [`AccessError::InvalidTtl`] unless
    /// the lifetime is positive and at most [`MAX_TOKEN_TTL_MINUTES`].
    pub fn new(config: AuthConfig) -> Result<Self, AccessError> {
        if config.secret.len() < MIN_SECRET_LEN {
            return Err(AccessError::WeakSecret {
                min: MIN_SECRET_LEN,
            });
        }
        let max_ttl = Duration::minutes(MAX_TOKEN_TTL_MINUTES);
        if config.ttl <= Duration::zero() || config.ttl > max_ttl {
            return Err(AccessError::InvalidTtl {
                max_minutes: MAX_TOKEN_TTL_MINUTES,
            });
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = 0;

        Ok(Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            issuer: config.issuer,
            audience: config.audience,
            ttl: config.ttl,
        })
    }

    /// Issues a token for `subject`, valid for the configured window from now.
    pub fn issue(&self, subject: &str) -> Result<IssuedToken, AccessError> {
        self.issue_at(subject, Utc::now())
    }

    /// Issues a token as if it were created at `issued_at`.
    pub fn issue_at(
        &self,
        subject: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, AccessError> {
        let token_id = Uuid::new_v4();
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or(AccessError::InvalidTtl {
                max_minutes: MAX_TOKEN_TTL_MINUTES,
            })?;
        let claims = Claims {
            sub: subject.to_string(),
            jti: token_id.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        metrics::counter!("tokens_issued_total").increment(1);
        tracing::debug!(%token_id, %expires_at, "token issued");

        Ok(IssuedToken {
            token,
            token_id,
            expires_at,
        })
    }

    /// Checks signature, issuer, audience and expiry.
    pub fn validate(&self, token: &str) -> Result<Claims, AccessError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| {
                metrics::counter!("auth_rejections_total").increment(1);
                let reason = match err.kind() {
                    ErrorKind::ExpiredSignature => "token expired",
                    ErrorKind::InvalidSignature => "invalid signature",
                    ErrorKind::InvalidIssuer => "unexpected issuer",
                    ErrorKind::InvalidAudience => "unexpected audience",
                    ErrorKind::MissingRequiredClaim(_) => "missing claim",
                    _ => "malformed token",
                };
                tracing::debug!(error = %err, reason, "token rejected");
                AccessError::Unauthorized(reason.to_string())
            })
    }
}
