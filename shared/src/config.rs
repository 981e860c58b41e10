use std::num::NonZeroU32;

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{
    AUTH_RESET_DELAY_MS, DEFAULT_BANNER_DURATION_MS, DEFAULT_PAGE_LIMIT, DEFAULT_TOAST_DURATION_MS,
};

const MAX_UTC_OFFSET_MINUTES: i32 = 18 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid api base url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),
    #[error("utc offset out of range: {0} minutes")]
    InvalidUtcOffset(i32),
    #[error("toast duration must be non-zero")]
    ZeroToastDuration,
    #[error("banner duration must be non-zero")]
    ZeroBannerDuration,
}

/// Settings the shell hands to the core at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub api_base_url: String,
    pub page_limit: NonZeroU32,
    pub auth_reset_delay_ms: u64,
    pub toast_duration_ms: u64,
    /// How long a foreground push banner stays up.
    pub banner_duration_ms: u64,
    /// Device offset used to decide which calendar day a message belongs to.
    pub utc_offset_minutes: i32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api/".into(),
            page_limit: DEFAULT_PAGE_LIMIT,
            auth_reset_delay_ms: AUTH_RESET_DELAY_MS,
            toast_duration_ms: DEFAULT_TOAST_DURATION_MS,
            banner_duration_ms: DEFAULT_BANNER_DURATION_MS,
            utc_offset_minutes: 0,
        }
    }
}

impl CoreConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_url()?;
        if !(1 - MAX_UTC_OFFSET_MINUTES..MAX_UTC_OFFSET_MINUTES).contains(&self.utc_offset_minutes) {
            return Err(ConfigError::InvalidUtcOffset(self.utc_offset_minutes));
        }
        if self.toast_duration_ms == 0 {
            return Err(ConfigError::ZeroToastDuration);
        }
        if self.banner_duration_ms == 0 {
            return Err(ConfigError::ZeroBannerDuration);
        }
        Ok(())
    }

    /// The API root, always with a trailing slash so relative joins append.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let mut raw = self.api_base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.api_base_url.clone(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
    }

    #[must_use]
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }
}
