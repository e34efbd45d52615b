//! Failure classification and user-facing error reports
//!
//! Every stage failure is mapped into a small, stable taxonomy before it
//! leaves the pipeline. Provider failures are translated by best-effort
//! string matching at the adapter boundary; the matching depends on upstream
//! wording, so structured status codes are checked first and keyword checks
//! are the fallback. Upstream wording changes never alter the user-visible
//! contract because each kind carries its own fixed message.

use crate::Error;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;

pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Matches the "retry in 12.5s" fragment some providers embed in quota
/// error text.
static RETRY_SECONDS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)retry in\s+(\d+(?:\.\d+)?)\s*s").expect("Invalid retry-after regex")
});

const CREDENTIAL_KEYWORDS: &[&str] = &[
    "api key expired",
    "api_key_invalid",
    "api key not valid",
    "invalid api key",
    "expired",
    "leaked",
    "referer",
];

const TIMEOUT_KEYWORDS: &[&str] = &["deadline", "timed out", "timeout", "sandbox was killed"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingCredential,
    InvalidRequest,
    UnsupportedImage,
    QuotaExceeded,
    InvalidCredential,
    RequestTimeout,
    ResponseUnparseable,
    UpstreamFailure,
}

#[derive(Debug, Clone, Copy)]
pub struct LocalizedMessage {
    pub ar: &'static str,
    pub en: &'static str,
}

const QUOTA_USER_MESSAGE: LocalizedMessage = LocalizedMessage {
    ar: "تم تجاوز الحد المسموح من الطلبات. يرجى المحاولة مرة أخرى بعد قليل.",
    en: "The request limit has been reached. Please try again shortly.",
};

/// Terminal description of a failed pipeline run.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    pub retry_after_secs: Option<u64>,
    pub user_message: Option<LocalizedMessage>,
}

impl ErrorReport {
    /// Classify any pipeline failure into exactly one report.
    pub fn from_error(err: &Error) -> Self {
        match err {
            Error::MissingCredential => Self::fixed(
                ErrorKind::MissingCredential,
                "Generation service is not configured",
            ),
            Error::InvalidRequest(msg) => Self::with_message(ErrorKind::InvalidRequest, msg),
            Error::UnsupportedImage(_) => Self::fixed(
                ErrorKind::UnsupportedImage,
                "The uploaded image could not be decoded",
            ),
            Error::QuotaExceeded { retry_after_secs } => Self {
                kind: ErrorKind::QuotaExceeded,
                message: "Generation quota exceeded".to_string(),
                retry_after_secs: Some(*retry_after_secs),
                user_message: Some(QUOTA_USER_MESSAGE),
            },
            Error::InvalidCredential => Self::fixed(
                ErrorKind::InvalidCredential,
                "The configured API key was rejected by the generation service",
            ),
            Error::RequestTimeout => Self::fixed(
                ErrorKind::RequestTimeout,
                "The generation service did not answer in time",
            ),
            Error::ResponseUnparseable { .. } => Self::fixed(
                ErrorKind::ResponseUnparseable,
                "The generation service returned an unreadable answer",
            ),
            // Passed through unmodified for diagnosis; the adapter boundary
            // guarantees it carries no secret material.
            Error::Upstream(msg) => Self::with_message(ErrorKind::UpstreamFailure, msg),
            other => Self::with_message(ErrorKind::UpstreamFailure, &other.to_string()),
        }
    }

    fn fixed(kind: ErrorKind, message: &'static str) -> Self {
        Self {
            kind,
            message: message.to_string(),
            retry_after_secs: None,
            user_message: None,
        }
    }

    fn with_message(kind: ErrorKind, message: &str) -> Self {
        Self {
            kind,
            message: message.to_string(),
            retry_after_secs: None,
            user_message: None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            ErrorKind::InvalidRequest | ErrorKind::UnsupportedImage => StatusCode::BAD_REQUEST,
            ErrorKind::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Translate a non-success provider response into a pipeline error.
///
/// Checked in taxonomy precedence order: quota, then credential, then
/// timeout; anything unrecognized passes through as an upstream failure.
pub fn provider_error(status: u16, body: &str) -> Error {
    let lowered = body.to_lowercase();

    if status == 429
        || lowered.contains("quota")
        || lowered.contains("resource_exhausted")
        || lowered.contains("429")
    {
        return Error::QuotaExceeded {
            retry_after_secs: extract_retry_after_secs(body),
        };
    }

    if CREDENTIAL_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        return Error::InvalidCredential;
    }

    if status == 408 || status == 504 || TIMEOUT_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        return Error::RequestTimeout;
    }

    Error::Upstream(format!("status {}: {}", status, body))
}

/// Pull the retry hint out of quota error text, rounding partial seconds up.
/// Falls back to [`DEFAULT_RETRY_AFTER_SECS`] when no fragment is present.
pub fn extract_retry_after_secs(body: &str) -> u64 {
    RETRY_SECONDS_REGEX
        .captures(body)
        .and_then(|captures| captures.get(1))
        .and_then(|matched| matched.as_str().parse::<f64>().ok())
        .map(|secs| secs.ceil() as u64)
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let report = ErrorReport::from_error(&self);
        let status = report.status_code();

        let body = match report.kind {
            ErrorKind::QuotaExceeded => {
                let user_message = report.user_message.unwrap_or(QUOTA_USER_MESSAGE);
                json!({
                    "error": "QUOTA_EXCEEDED",
                    "message": report.message,
                    "retryAfter": report.retry_after_secs.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
                    "userMessage": {
                        "ar": user_message.ar,
                        "en": user_message.en,
                    },
                })
            }
            _ => json!({ "error": report.message }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_retry_after_ceils_partial_seconds() {
        assert_eq!(
            extract_retry_after_secs("Rate limited, retry in 12.5s please"),
            13
        );
        assert_eq!(extract_retry_after_secs("retry in 5s"), 5);
        assert_eq!(extract_retry_after_secs("Retry in 2.1S"), 3);
    }

    #[test]
    fn test_extract_retry_after_defaults_without_fragment() {
        assert_eq!(
            extract_retry_after_secs("quota exhausted for this project"),
            DEFAULT_RETRY_AFTER_SECS
        );
        assert_eq!(extract_retry_after_secs(""), DEFAULT_RETRY_AFTER_SECS);
    }

    #[test]
    fn test_provider_error_quota_by_status() {
        let err = provider_error(429, "slow down, retry in 5s");
        assert!(matches!(err, Error::QuotaExceeded { retry_after_secs: 5 }));
    }

    #[test]
    fn test_provider_error_quota_by_keyword() {
        let err = provider_error(400, "RESOURCE_EXHAUSTED: quota exceeded");
        assert!(matches!(
            err,
            Error::QuotaExceeded {
                retry_after_secs: DEFAULT_RETRY_AFTER_SECS
            }
        ));
    }

    #[test]
    fn test_provider_error_quota_wins_over_credential_keywords() {
        // precedence: quota before credential
        let err = provider_error(429, "quota exceeded because the key expired");
        assert!(matches!(err, Error::QuotaExceeded { .. }));
    }

    #[test]
    fn test_provider_error_credential_keywords() {
        assert!(matches!(
            provider_error(400, "API key expired. Please renew the API key."),
            Error::InvalidCredential
        ));
        assert!(matches!(
            provider_error(403, "Requests from this referer are blocked"),
            Error::InvalidCredential
        ));
        assert!(matches!(
            provider_error(400, "API_KEY_INVALID"),
            Error::InvalidCredential
        ));
    }

    #[test]
    fn test_provider_error_timeout() {
        assert!(matches!(
            provider_error(504, "upstream request timeout"),
            Error::RequestTimeout
        ));
        assert!(matches!(
            provider_error(500, "DEADLINE exceeded while generating"),
            Error::RequestTimeout
        ));
    }

    #[test]
    fn test_provider_error_unknown_passes_text_through() {
        let err = provider_error(500, "internal kaboom");
        match err {
            Error::Upstream(msg) => {
                assert!(msg.contains("500"));
                assert!(msg.contains("internal kaboom"));
            }
            other => panic!("expected Upstream, got {:?}", other),
        }
    }

    #[test]
    fn test_report_status_codes() {
        let cases = [
            (Error::MissingCredential, StatusCode::INTERNAL_SERVER_ERROR),
            (
                Error::InvalidRequest("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                Error::UnsupportedImage("corrupt".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                Error::QuotaExceeded {
                    retry_after_secs: 7,
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (Error::InvalidCredential, StatusCode::INTERNAL_SERVER_ERROR),
            (Error::RequestTimeout, StatusCode::INTERNAL_SERVER_ERROR),
            (
                Error::ResponseUnparseable {
                    raw: "x".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                Error::Upstream("boom".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ErrorReport::from_error(&err).status_code(), expected);
        }
    }

    #[test]
    fn test_quota_report_is_localized() {
        let report = ErrorReport::from_error(&Error::QuotaExceeded {
            retry_after_secs: 13,
        });
        assert_eq!(report.retry_after_secs, Some(13));
        let user_message = report.user_message.expect("quota report carries user text");
        assert!(!user_message.ar.is_empty());
        assert!(!user_message.en.is_empty());
    }

    #[test]
    fn test_credential_report_never_echoes_provider_text() {
        let report = ErrorReport::from_error(&Error::InvalidCredential);
        assert!(!report.message.to_lowercase().contains("expired"));
        assert_eq!(
            report.message,
            "The configured API key was rejected by the generation service"
        );
    }

    #[test]
    fn test_unparseable_report_hides_raw_text() {
        let report = ErrorReport::from_error(&Error::ResponseUnparseable {
            raw: "secret gibberish".to_string(),
        });
        assert!(!report.message.contains("secret gibberish"));
    }
}
