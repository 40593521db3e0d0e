//! Provider configuration with environment variable fallbacks

use serde::Deserialize;
use std::time::Duration;
use tfplug::logging::LogLevel;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::validator::StringLengthValidator;
use tfplug::{AttributePath, Diagnostic};

use crate::api::ClientConfig;

pub const ENV_URL: &str = "JAMFPRO_URL";
pub const ENV_INSTANCE_NAME: &str = "JAMFPRO_INSTANCE_NAME";
pub const ENV_CLIENT_ID: &str = "JAMFPRO_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "JAMFPRO_CLIENT_SECRET";
pub const ENV_INSECURE: &str = "JAMFPRO_INSECURE";
pub const ENV_REQUEST_TIMEOUT: &str = "JAMFPRO_REQUEST_TIMEOUT";
pub const ENV_LOG: &str = "TF_LOG";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Provider block as written in configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfigModel {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub instance_name: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub insecure: Option<bool>,
    #[serde(default)]
    pub request_timeout_seconds: Option<i64>,
    #[serde(default)]
    pub log_level: Option<String>,
}

/// Resolved provider settings
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub insecure: bool,
    pub request_timeout: Duration,
    pub log_level: LogLevel,
}

impl ProviderConfig {
    /// Resolves against the process environment
    pub fn resolve(model: ProviderConfigModel) -> Result<Self, Vec<Diagnostic>> {
        Self::resolve_with(model, |name| std::env::var(name).ok())
    }

    pub fn resolve_with<F>(model: ProviderConfigModel, env: F) -> Result<Self, Vec<Diagnostic>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());
        let mut diagnostics = vec![];

        let url = model.url.filter(|v| !v.is_empty()).or_else(|| env(ENV_URL));
        let instance = model
            .instance_name
            .filter(|v| !v.is_empty())
            .or_else(|| env(ENV_INSTANCE_NAME));

        let base_url = match (url, instance) {
            (Some(_), Some(_)) => {
                diagnostics.push(
                    Diagnostic::error(
                        "Conflicting Jamf Pro location",
                        "Set either url or instance_name, not both",
                    )
                    .with_attribute(AttributePath::new("instance_name")),
                );
                None
            }
            (Some(url), None) => Some(url),
            (None, Some(instance)) => Some(format!("https://{}.jamfcloud.com", instance)),
            (None, None) => {
                diagnostics.push(
                    Diagnostic::error(
                        "Missing Jamf Pro URL",
                        format!(
                            "Set url or instance_name in the provider block, or the {} or {} environment variable",
                            ENV_URL, ENV_INSTANCE_NAME
                        ),
                    )
                    .with_attribute(AttributePath::new("url")),
                );
                None
            }
        };

        if let Some(base_url) = &base_url {
            match url::Url::parse(base_url) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
                Ok(_) => diagnostics.push(
                    Diagnostic::error(
                        "Invalid Jamf Pro URL",
                        format!("'{}' must use http or https", base_url),
                    )
                    .with_attribute(AttributePath::new("url")),
                ),
                Err(e) => diagnostics.push(
                    Diagnostic::error(
                        "Invalid Jamf Pro URL",
                        format!("'{}' is not a valid URL: {}", base_url, e),
                    )
                    .with_attribute(AttributePath::new("url")),
                ),
            }
        }

        let client_id = model
            .client_id
            .filter(|v| !v.is_empty())
            .or_else(|| env(ENV_CLIENT_ID));
        if client_id.is_none() {
            diagnostics.push(missing_credential("client_id", ENV_CLIENT_ID));
        }

        let client_secret = model
            .client_secret
            .filter(|v| !v.is_empty())
            .or_else(|| env(ENV_CLIENT_SECRET));
        if client_secret.is_none() {
            diagnostics.push(missing_credential("client_secret", ENV_CLIENT_SECRET));
        }

        let insecure = match model.insecure {
            Some(insecure) => insecure,
            None => match env(ENV_INSECURE) {
                Some(raw) => raw.parse::<bool>().unwrap_or_else(|_| {
                    diagnostics.push(Diagnostic::error(
                        "Invalid insecure setting",
                        format!("{} must be true or false, got '{}'", ENV_INSECURE, raw),
                    ));
                    false
                }),
                None => false,
            },
        };

        let timeout_secs = match model.request_timeout_seconds {
            Some(secs) => Some(secs),
            None => match env(ENV_REQUEST_TIMEOUT) {
                Some(raw) => match raw.trim().parse::<i64>() {
                    Ok(secs) => Some(secs),
                    Err(_) => {
                        diagnostics.push(Diagnostic::error(
                            "Invalid request timeout",
                            format!("{} must be a whole number of seconds, got '{}'", ENV_REQUEST_TIMEOUT, raw),
                        ));
                        None
                    }
                },
                None => None,
            },
        };
        let request_timeout = match timeout_secs {
            Some(secs) if secs <= 0 => {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid request timeout",
                        format!("request_timeout_seconds must be positive, got {}", secs),
                    )
                    .with_attribute(AttributePath::new("request_timeout_seconds")),
                );
                Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
            }
            Some(secs) => Duration::from_secs(secs.unsigned_abs()),
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        let log_level = match model.log_level.filter(|v| !v.is_empty()) {
            Some(raw) => raw.parse::<LogLevel>().unwrap_or_else(|e| {
                diagnostics.push(
                    Diagnostic::error("Invalid log level", e.to_string())
                        .with_attribute(AttributePath::new("log_level")),
                );
                LogLevel::default()
            }),
            None => env(ENV_LOG)
                .and_then(|raw| raw.parse().ok())
                .unwrap_or_default(),
        };

        match (base_url, client_id, client_secret) {
            (Some(base_url), Some(client_id), Some(client_secret)) if diagnostics.is_empty() => {
                Ok(Self {
                    base_url,
                    client_id,
                    client_secret,
                    insecure,
                    request_timeout,
                    log_level,
                })
            }
            _ => Err(diagnostics),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            insecure: self.insecure,
            request_timeout: self.request_timeout,
        }
    }
}

fn missing_credential(attribute: &str, env: &str) -> Diagnostic {
    Diagnostic::error(
        format!("Missing {}", attribute),
        format!(
            "Set {} in the provider block or the {} environment variable",
            attribute, env
        ),
    )
    .with_attribute(AttributePath::new(attribute))
}

pub fn schema() -> Schema {
    SchemaBuilder::new()
        .description("Manage Jamf Pro through its Jamf Pro and Classic APIs")
        .attribute(
            AttributeBuilder::new("url", AttributeType::String)
                .description("Base URL of the Jamf Pro server, e.g. https://example.jamfcloud.com")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("instance_name", AttributeType::String)
                .description("Jamf Cloud instance name; expands to https://<name>.jamfcloud.com")
                .optional()
                .validator(StringLengthValidator::at_least(1))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("client_id", AttributeType::String)
                .description("OAuth API client ID")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("client_secret", AttributeType::String)
                .description("OAuth API client secret")
                .optional()
                .sensitive()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("insecure", AttributeType::Bool)
                .description("Skip TLS certificate verification")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("request_timeout_seconds", AttributeType::Number)
                .description("Timeout of a single HTTP request")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("log_level", AttributeType::String)
                .description("Provider log level: TRACE, DEBUG, INFO, WARN or ERROR")
                .optional()
                .build(),
        )
        .build()
}
