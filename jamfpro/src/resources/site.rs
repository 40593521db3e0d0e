//! Site resource implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tfplug::context::Context;
use tfplug::import::import_state_passthrough_id;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::timeouts;
use tfplug::types::{null_as_default, AttributePath};
use tfplug::validator::StringLengthValidator;
use tfplug::TimeoutsConfig;

use crate::api::sites::{Site, SitesApi};
use crate::api::{ApiError, Client};
use crate::reconcile::{parse_numeric_id, EntityApi, ReconcileError, ResourceState};
use crate::resources::{self, provider_data_from, ManagedResource};
use crate::JamfProProviderData;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteModel {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub timeouts: Option<TimeoutsConfig>,
}

impl ResourceState<Site> for SiteModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn refresh(&mut self, site: &Site) {
        self.id = site.id.to_string();
        self.name = site.name.clone();
    }
}

pub fn construct(model: &SiteModel) -> Site {
    Site::new(&model.name)
}

#[async_trait]
impl<'a> EntityApi for SitesApi<'a> {
    type Entity = Site;
    type Id = i64;

    const KIND: &'static str = "Site";

    fn parse_id(raw: &str) -> Result<i64, String> {
        parse_numeric_id(raw)
    }

    async fn create(&self, site: &Site) -> Result<i64, ApiError> {
        SitesApi::create(self, site).await
    }

    async fn get_by_id(&self, id: &i64) -> Result<Site, ApiError> {
        self.get(*id).await
    }

    async fn get_by_name(&self, name: &str) -> Result<Site, ApiError> {
        SitesApi::get_by_name(self, name).await
    }

    async fn update_by_id(&self, id: &i64, site: &Site) -> Result<(), ApiError> {
        self.update(*id, site).await
    }

    async fn update_by_name(&self, name: &str, site: &Site) -> Result<(), ApiError> {
        SitesApi::update_by_name(self, name, site).await
    }

    async fn delete_by_id(&self, id: &i64) -> Result<(), ApiError> {
        self.delete(*id).await
    }

    async fn delete_by_name(&self, name: &str) -> Result<(), ApiError> {
        SitesApi::delete_by_name(self, name).await
    }
}

pub fn site_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("Manages a site in Jamf Pro")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .description("The unique identifier of the site")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .description("The unique name of the site")
                .required()
                .validator(StringLengthValidator::at_least(1))
                .build(),
        )
        .attribute(timeouts::attribute())
        .build()
}

#[derive(Default)]
pub struct SiteResource {
    provider_data: Option<JamfProProviderData>,
}

impl SiteResource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ManagedResource for SiteResource {
    type Entity = Site;
    type Model = SiteModel;
    type Api<'a> = SitesApi<'a>;

    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    fn provider_data(&self) -> Option<&JamfProProviderData> {
        self.provider_data.as_ref()
    }

    fn api(client: &Client) -> SitesApi<'_> {
        client.sites()
    }

    fn schema() -> Schema {
        site_schema()
    }

    fn timeouts(model: &SiteModel) -> Option<&TimeoutsConfig> {
        model.timeouts.as_ref()
    }

    async fn construct(&self, model: &SiteModel) -> Result<Site, ReconcileError> {
        Ok(construct(model))
    }
}

#[async_trait]
impl Resource for SiteResource {
    fn type_name(&self) -> &str {
        "jamfpro_site"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: site_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        resources::validate::<Self>(request)
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        resources::create(self, &ctx, request).await
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        resources::read(self, &ctx, request).await
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        resources::update(self, &ctx, request).await
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        resources::delete(self, &ctx, request).await
    }
}

#[async_trait]
impl ResourceWithConfigure for SiteResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        match provider_data_from(request.provider_data) {
            Ok(data) => {
                self.provider_data = Some(data);
                ConfigureResourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(diag) => ConfigureResourceResponse {
                diagnostics: vec![diag],
            },
        }
    }
}

#[async_trait]
impl ResourceWithImportState for SiteResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_passthrough_id(&ctx, AttributePath::new("id"), &request, &mut response);
        response
    }
}
