// lib.rs - Layover shared core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod capabilities;
pub mod chat_history;
pub mod config;
pub mod event;
pub mod feed;
pub mod model;
pub mod pager;
pub mod signals;
pub mod view;

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::{ConfigError, CoreConfig};
pub use crux_core::{render::Render, App as CruxApp};
pub use event::Event;
pub use model::Model;
pub use view::ViewModel;

pub const DEFAULT_PAGE_LIMIT: NonZeroU32 = match NonZeroU32::new(10) {
    Some(limit) => limit,
    None => panic!("page limit must be non-zero"),
};
pub const AUTH_RESET_DELAY_MS: u64 = 500;
pub const DEFAULT_TOAST_DURATION_MS: u64 = 3000;
pub const DEFAULT_BANNER_DURATION_MS: u64 = 5000;
pub const PLACEHOLDER_ART_COUNT: u32 = 11;
pub const SESSION_KEY: &str = "layover.session";
pub const CHAT_MESSAGE_TYPE: &str = "message";
pub const CHAT_DAY_FORMAT: &str = "%-d %b %Y";
pub const CHAT_TIME_FORMAT: &str = "%I:%M %p";
pub const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Authentication,
    Network,
    Server,
    Deserialization,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Authentication => "AUTH_ERROR",
            Self::Network => "NETWORK_ERROR",
            Self::Server => "SERVER_ERROR",
            Self::Deserialization => "DESERIALIZATION_ERROR",
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Server)
    }
}

/// A failed call to the backend, classified for the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum ApiError {
    /// The server understood the request and refused it (412, 400, 422, ...).
    #[error("request rejected ({status}): {message}")]
    Validation { status: u16, message: String },
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },
    /// No response at all: offline, DNS, TLS, timeout.
    #[error("server unreachable: {0}")]
    Unreachable(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Unauthorized { .. } => ErrorKind::Authentication,
            Self::Unreachable(_) => ErrorKind::Network,
            Self::Server { .. } => ErrorKind::Server,
            Self::Decode(_) => ErrorKind::Deserialization,
        }
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind().code()
    }

    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self {
            Self::Validation { message, .. } | Self::Unauthorized { message } if !message.is_empty() => {
                message.clone()
            }
            Self::Validation { .. } => "The request could not be completed.".into(),
            Self::Unauthorized { .. } => "Your session has expired. Please sign in again.".into(),
            Self::Unreachable(_) => {
                "Unable to connect. Please check your internet connection and try again.".into()
            }
            Self::Server { .. } => "Something went wrong on our side. Please try again.".into(),
            Self::Decode(_) => {
                "A data error occurred. Please contact support if this persists.".into()
            }
        }
    }

    /// Classify a non-success response. The server usually sends
    /// `{status, message}` as the body; its message is kept when present.
    #[must_use]
    pub fn from_http_status(status: u16, body: Option<&[u8]>) -> Self {
        let parsed = body.and_then(|b| serde_json::from_slice::<ApiErrorResponse>(b).ok());
        let status = parsed.as_ref().and_then(|p| p.status).unwrap_or(status);
        let message = parsed.map(|p| p.message).unwrap_or_default();

        match status {
            401 => Self::Unauthorized { message },
            500..=599 => Self::Server { status, message },
            _ => Self::Validation {
                status,
                message: if message.is_empty() {
                    format!("HTTP error: {status}")
                } else {
                    message
                },
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    mod api_error_tests {
        use super::*;

        #[test]
        fn precondition_failed_is_validation_with_server_message() {
            let err = ApiError::from_http_status(
                412,
                Some(br#"{"status":412,"message":"Travel already deleted"}"#),
            );
            assert_eq!(
                err,
                ApiError::Validation {
                    status: 412,
                    message: "Travel already deleted".into()
                }
            );
            assert_eq!(err.user_facing_message(), "Travel already deleted");
        }

        #[test]
        fn unauthorized_is_distinct() {
            let err = ApiError::from_http_status(401, None);
            assert!(err.is_unauthorized());
            assert_eq!(err.kind(), ErrorKind::Authentication);
            assert_eq!(
                err.user_facing_message(),
                "Your session has expired. Please sign in again."
            );
        }

        #[test]
        fn body_status_overrides_transport_status() {
            let err = ApiError::from_http_status(200, Some(br#"{"status":401,"message":"expired"}"#));
            assert!(err.is_unauthorized());
        }

        #[test]
        fn five_hundreds_are_server_errors() {
            let err = ApiError::from_http_status(503, Some(b"<html>down</html>"));
            assert_eq!(err.kind(), ErrorKind::Server);
            assert!(err.kind().is_retryable());
        }

        #[test]
        fn other_client_errors_fall_back_to_status_text() {
            let err = ApiError::from_http_status(404, None);
            assert_eq!(
                err,
                ApiError::Validation {
                    status: 404,
                    message: "HTTP error: 404".into()
                }
            );
        }

        #[test]
        fn unreachable_is_retryable_and_not_validation() {
            let err = ApiError::Unreachable("timeout".into());
            assert_eq!(err.code(), "NETWORK_ERROR");
            assert!(err.kind().is_retryable());
            assert!(!ErrorKind::Validation.is_retryable());
        }
    }

    #[test]
    fn default_page_limit_is_ten() {
        assert_eq!(DEFAULT_PAGE_LIMIT.get(), 10);
    }
}
