//! Department data source implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource,
    DataSourceMetadataRequest, DataSourceMetadataResponse, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse, ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::Timeouts;

use crate::api::departments::DepartmentsApi;
use crate::reconcile::{EntityApi, LookupChain, Reconciler};
use crate::resources::{decode, not_configured, provider_data_from};
use crate::JamfProProviderData;

const READ_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepartmentDataModel {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

pub fn department_data_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("Looks up a Jamf Pro department by ID or name")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .description("The unique identifier of the department")
                .optional()
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .description("The name of the department")
                .optional()
                .computed()
                .build(),
        )
        .build()
}

/// Exactly one of `id` and `name` selects the department
fn validate_selector(config: &DynamicValue) -> Vec<Diagnostic> {
    let is_set = |name: &str| {
        config
            .get(&AttributePath::new(name))
            .map_or(false, |value| !value.is_null())
    };

    match (is_set("id"), is_set("name")) {
        (true, false) | (false, true) => vec![],
        (true, true) => vec![Diagnostic::error(
            "Conflicting department selectors",
            "Only one of \"id\" or \"name\" may be set",
        )
        .with_attribute(AttributePath::new("name"))],
        (false, false) => vec![Diagnostic::error(
            "Missing department selector",
            "One of \"id\" or \"name\" must be set",
        )],
    }
}

#[derive(Default)]
pub struct DepartmentDataSource {
    provider_data: Option<JamfProProviderData>,
}

impl DepartmentDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for DepartmentDataSource {
    fn type_name(&self) -> &str {
        "jamfpro_department"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: department_data_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        let mut diagnostics = department_data_schema().validate_config(&request.config);
        diagnostics.extend(validate_selector(&request.config));
        ValidateDataSourceConfigResponse { diagnostics }
    }

    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let model: DepartmentDataModel = match decode(&request.config, "configuration") {
            Ok(model) => model,
            Err(diag) => {
                return ReadDataSourceResponse {
                    state: request.config,
                    diagnostics: vec![diag],
                }
            }
        };

        let Some(data) = &self.provider_data else {
            return ReadDataSourceResponse {
                state: request.config,
                diagnostics: vec![not_configured()],
            };
        };

        let id = match model.id.as_deref().map(<DepartmentsApi<'_> as EntityApi>::parse_id) {
            Some(Ok(id)) => Some(id),
            Some(Err(reason)) => {
                return ReadDataSourceResponse {
                    state: request.config,
                    diagnostics: vec![Diagnostic::error("Invalid department ID", reason)
                        .with_attribute(AttributePath::new("id"))],
                }
            }
            None => None,
        };
        let chain = LookupChain::new(id, model.name.as_deref());
        let label = model.name.clone().or(model.id.clone()).unwrap_or_default();

        let reconciler = Reconciler::new(&ctx, data.client.departments(), Timeouts::uniform(READ_TIMEOUT))
            .with_backoff(data.backoff);

        match reconciler.find(&chain).await {
            Ok(department) => {
                let found = DepartmentDataModel {
                    id: department.id.or(model.id),
                    name: Some(department.name),
                };
                match DynamicValue::from_model(&found) {
                    Ok(state) => ReadDataSourceResponse {
                        state,
                        diagnostics: vec![],
                    },
                    Err(e) => ReadDataSourceResponse {
                        state: request.config,
                        diagnostics: vec![Diagnostic::error("Failed to encode state", e.to_string())],
                    },
                }
            }
            Err(e) => {
                tracing::error!("Failed to look up department '{}': {}", label, e);
                ReadDataSourceResponse {
                    state: request.config,
                    diagnostics: vec![e.to_diagnostic("read", "Department", &label)],
                }
            }
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for DepartmentDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        match provider_data_from(request.provider_data) {
            Ok(data) => {
                self.provider_data = Some(data);
                ConfigureDataSourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(diag) => ConfigureDataSourceResponse {
                diagnostics: vec![diag],
            },
        }
    }
}
