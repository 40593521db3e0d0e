//! Terraform provider for Jamf Pro
//!
//! Resources reconcile Terraform state against Jamf Pro through a shared
//! OAuth-authenticated [`api::Client`]. Every CRUD operation is retried within
//! its timeout and falls back from an entity's ID to its name.

pub mod api;
pub mod config;
pub mod data_sources;
pub mod provider_data;
pub mod reconcile;
pub mod resources;

pub use provider_data::JamfProProviderData;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::DataSourceWithConfigure;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetadataRequest, ProviderMetadataResponse, ProviderSchemaRequest,
    ProviderSchemaResponse, ResourceFactory, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::resource::ResourceWithConfigure;
use tfplug::types::Diagnostic;

use config::{ProviderConfig, ProviderConfigModel};

pub struct JamfProProvider {
    provider_data: Option<JamfProProviderData>,
}

impl Default for JamfProProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl JamfProProvider {
    pub fn new() -> Self {
        Self {
            provider_data: None,
        }
    }

    pub fn provider_data(&self) -> Option<&JamfProProviderData> {
        self.provider_data.as_ref()
    }
}

#[async_trait]
impl Provider for JamfProProvider {
    fn type_name(&self) -> &str {
        "jamfpro"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: config::schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: config::schema().validate_config(&request.config),
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let model: ProviderConfigModel = match request.config.to_model() {
            Ok(model) => model,
            Err(e) => {
                return ConfigureProviderResponse {
                    diagnostics: vec![Diagnostic::error(
                        "Failed to decode provider configuration",
                        e.to_string(),
                    )],
                    provider_data: None,
                }
            }
        };

        let config = match ProviderConfig::resolve(model) {
            Ok(config) => config,
            Err(diagnostics) => {
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        };

        tfplug::logging::init(config.log_level);

        let client = match api::Client::with_config(config.client_config()) {
            Ok(client) => client,
            Err(e) => {
                return ConfigureProviderResponse {
                    diagnostics: vec![Diagnostic::error(
                        "Failed to create API client",
                        e.to_string(),
                    )],
                    provider_data: None,
                }
            }
        };

        tracing::info!(
            "Configured Jamf Pro provider for {} (Terraform {})",
            config.base_url,
            request.terraform_version
        );

        let data = JamfProProviderData::new(client);
        self.provider_data = Some(data.clone());

        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(Arc::new(data)),
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut resources: HashMap<String, ResourceFactory> = HashMap::new();
        resources.insert(
            "jamfpro_account".to_string(),
            Box::new(|| Box::new(resources::AccountResource::new()) as Box<dyn ResourceWithConfigure>),
        );
        resources.insert(
            "jamfpro_department".to_string(),
            Box::new(|| {
                Box::new(resources::DepartmentResource::new()) as Box<dyn ResourceWithConfigure>
            }),
        );
        resources.insert(
            "jamfpro_site".to_string(),
            Box::new(|| Box::new(resources::SiteResource::new()) as Box<dyn ResourceWithConfigure>),
        );
        resources
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut data_sources: HashMap<String, DataSourceFactory> = HashMap::new();
        data_sources.insert(
            "jamfpro_department".to_string(),
            Box::new(|| {
                Box::new(data_sources::DepartmentDataSource::new())
                    as Box<dyn DataSourceWithConfigure>
            }),
        );
        data_sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tfplug::types::{Dynamic, DynamicValue};

    const ENV_VARS: [&str; 6] = [
        config::ENV_URL,
        config::ENV_INSTANCE_NAME,
        config::ENV_CLIENT_ID,
        config::ENV_CLIENT_SECRET,
        config::ENV_INSECURE,
        config::ENV_REQUEST_TIMEOUT,
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    fn empty_config() -> DynamicValue {
        DynamicValue::new(Dynamic::Map(HashMap::new()))
    }

    async fn configure(provider: &mut JamfProProvider, config: DynamicValue) -> ConfigureProviderResponse {
        provider
            .configure(
                Context::new(),
                ConfigureProviderRequest {
                    terraform_version: "1.9.0".to_string(),
                    config,
                },
            )
            .await
    }

    #[test]
    fn registers_every_resource_type() {
        let provider = JamfProProvider::new();

        let resources = provider.resources();
        for (name, factory) in &resources {
            assert_eq!(factory().type_name(), name);
        }
        let mut names: Vec<_> = resources.keys().cloned().collect();
        names.sort();
        assert_eq!(names, ["jamfpro_account", "jamfpro_department", "jamfpro_site"]);

        let data_sources = provider.data_sources();
        assert_eq!(data_sources.len(), 1);
        assert_eq!(data_sources["jamfpro_department"]().type_name(), "jamfpro_department");
    }

    #[tokio::test]
    #[serial]
    async fn configure_from_environment() {
        clear_env();
        std::env::set_var(config::ENV_INSTANCE_NAME, "acme");
        std::env::set_var(config::ENV_CLIENT_ID, "id");
        std::env::set_var(config::ENV_CLIENT_SECRET, "secret");

        let mut provider = JamfProProvider::new();
        let response = configure(&mut provider, empty_config()).await;
        clear_env();

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert!(response.provider_data.is_some());
        assert_eq!(
            provider.provider_data().unwrap().client.base_url(),
            "https://acme.jamfcloud.com"
        );
    }

    #[tokio::test]
    #[serial]
    async fn configure_without_credentials_fails() {
        clear_env();

        let mut provider = JamfProProvider::new();
        let mut config = empty_config();
        config
            .set_string(&tfplug::AttributePath::new("url"), "https://example.jamfcloud.com".to_string())
            .unwrap();
        let response = configure(&mut provider, config).await;

        assert!(response.provider_data.is_none());
        let summaries: Vec<_> = response.diagnostics.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(summaries, ["Missing client_id", "Missing client_secret"]);
    }
}
