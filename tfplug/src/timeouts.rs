//! Per-operation timeouts configured through a `timeouts` attribute
//!
//! Resources declare default durations and let users override each operation
//! with strings such as `"30s"`, `"1m"` or `"1m30s"`.

use crate::error::{Result, TfplugError};
use crate::schema::{Attribute, AttributeBuilder, AttributeType};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest duration a timeout may be configured to
pub const MAX_DURATION: Duration = Duration::from_secs(86400 * 365);

/// Resolved timeouts for the four CRUD operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

/// User overrides as they appear in configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default)]
    pub create: Option<String>,
    #[serde(default)]
    pub read: Option<String>,
    #[serde(default)]
    pub update: Option<String>,
    #[serde(default)]
    pub delete: Option<String>,
}

impl Timeouts {
    pub fn uniform(duration: Duration) -> Self {
        Self {
            create: duration,
            read: duration,
            update: duration,
            delete: duration,
        }
    }

    /// Applies the overrides present in `config` on top of these defaults
    pub fn with_overrides(self, config: Option<&TimeoutsConfig>) -> Result<Self> {
        let Some(config) = config else {
            return Ok(self);
        };

        let pick = |value: &Option<String>, fallback: Duration| -> Result<Duration> {
            value.as_deref().map_or(Ok(fallback), parse_duration)
        };

        Ok(Self {
            create: pick(&config.create, self.create)?,
            read: pick(&config.read, self.read)?,
            update: pick(&config.update, self.update)?,
            delete: pick(&config.delete, self.delete)?,
        })
    }
}

/// The optional `timeouts` object attribute
pub fn attribute() -> Attribute {
    AttributeBuilder::new(
        "timeouts",
        AttributeType::object([
            ("create", AttributeType::String),
            ("read", AttributeType::String),
            ("update", AttributeType::String),
            ("delete", AttributeType::String),
        ]),
    )
    .description("Per-operation timeouts, e.g. \"30s\", \"2m\" or \"1m30s\"")
    .optional()
    .build()
}

/// Parses durations made of `<number><unit>` pairs with units h, m, s or ms
pub fn parse_duration(input: &str) -> Result<Duration> {
    let invalid = |reason: &str| TfplugError::InvalidDuration {
        value: input.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty duration"));
    }

    let mut total = Duration::ZERO;
    let mut rest = trimmed;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| invalid("missing unit"))?;
        if digits == 0 {
            return Err(invalid("expected a number"));
        }
        let amount: u64 = rest[..digits]
            .parse()
            .map_err(|_| invalid("number out of range"))?;
        rest = &rest[digits..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "h" => amount.checked_mul(3600).map(Duration::from_secs),
            "m" => amount.checked_mul(60).map(Duration::from_secs),
            "s" => Some(Duration::from_secs(amount)),
            "ms" => Some(Duration::from_millis(amount)),
            _ => return Err(invalid("unknown unit")),
        };
        total = part
            .and_then(|part| total.checked_add(part))
            .filter(|total| *total <= MAX_DURATION)
            .ok_or_else(|| invalid("number out of range"))?;
        rest = &rest[unit_len..];
    }

    Ok(total)
}
