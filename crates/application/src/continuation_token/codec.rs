use std::sync::Arc;

use actionhub_core::{AppError, AppResult};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::SecretEncryptor;

/// Envelope format written by [`ContinuationTokenCodec::seal`].
pub const TOKEN_FORMAT_VERSION: u8 = 1;

const MAX_CLOCK_SKEW_SECONDS: i64 = 300;

#[derive(Serialize)]
struct SealedEnvelope<'a, T> {
    v: u8,
    issued_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
    data: &'a T,
}

#[derive(Deserialize)]
struct OpenedEnvelope {
    v: u8,
    issued_at: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    data: Value,
}

/// Seals serializable values into opaque tokens and opens them again.
#[derive(Clone)]
pub struct ContinuationTokenCodec {
    encryptor: Arc<dyn SecretEncryptor>,
}

impl ContinuationTokenCodec {
    /// Creates a codec over the given cipher.
    #[must_use]
    pub fn new(encryptor: Arc<dyn SecretEncryptor>) -> Self {
        Self { encryptor }
    }

    /// Seals `value`, optionally expiring after `ttl`.
    pub fn seal<T: Serialize>(&self, value: &T, ttl: Option<Duration>) -> AppResult<String> {
        self.seal_at(value, ttl, Utc::now())
    }

    /// Opens a token produced by [`ContinuationTokenCodec::seal`].
    ///
    /// Every failure (bad encoding, failed authentication, unknown version,
    /// expiry, unexpected shape) is reported as [`AppError::Unauthorized`].
    pub fn open<T: DeserializeOwned>(&self, token: &str) -> AppResult<T> {
        self.open_at(token, Utc::now())
    }

    pub(crate) fn seal_at<T: Serialize>(
        &self,
        value: &T,
        ttl: Option<Duration>,
        now: DateTime<Utc>,
    ) -> AppResult<String> {
        let envelope = SealedEnvelope {
            v: TOKEN_FORMAT_VERSION,
            issued_at: now.timestamp(),
            expires_at: ttl.map(|ttl| (now + ttl).timestamp()),
            data: value,
        };
        let plaintext = serde_json::to_vec(&envelope).map_err(|error| {
            AppError::Internal(format!("failed to serialize continuation token: {error}"))
        })?;

        let sealed = self.encryptor.encrypt(&plaintext)?;
        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    pub(crate) fn open_at<T: DeserializeOwned>(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<T> {
        let sealed = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|error| rejected("token is not valid base64url", &error))?;
        let plaintext = self
            .encryptor
            .decrypt(&sealed)
            .map_err(|error| rejected("token failed authentication", &error))?;
        let envelope: OpenedEnvelope = serde_json::from_slice(&plaintext)
            .map_err(|error| rejected("token envelope is malformed", &error))?;

        if envelope.v != TOKEN_FORMAT_VERSION {
            return Err(AppError::Unauthorized(format!(
                "continuation token version {} is not supported",
                envelope.v
            )));
        }

        let now = now.timestamp();
        if envelope.issued_at > now + MAX_CLOCK_SKEW_SECONDS {
            return Err(AppError::Unauthorized(
                "continuation token was issued in the future".to_owned(),
            ));
        }
        if envelope.expires_at.is_some_and(|expires_at| expires_at <= now) {
            return Err(AppError::Unauthorized(
                "continuation token has expired".to_owned(),
            ));
        }

        serde_json::from_value(envelope.data)
            .map_err(|error| rejected("token payload has an unexpected shape", &error))
    }
}

fn rejected(reason: &str, error: &dyn std::fmt::Display) -> AppError {
    debug!(%error, "{reason}");
    AppError::Unauthorized(format!("continuation token rejected: {reason}"))
}
