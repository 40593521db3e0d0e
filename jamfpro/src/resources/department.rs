//! Department resource implementation

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

use crate::api::departments::{Department, DepartmentsApi};
use crate::api::{ApiError, Client};
use crate::reconcile::{parse_string_id, EntityApi, ReconcileError, ResourceState};
use crate::resources::{self, provider_data_from, ManagedResource};
use crate::JamfProProviderData;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepartmentModel {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub timeouts: Option<TimeoutsConfig>,
}

impl ResourceState<Department> for DepartmentModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn refresh(&mut self, department: &Department) {
        if let Some(id) = &department.id {
            self.id = id.clone();
        }
        self.name = department.name.clone();
    }
}

pub fn construct(model: &DepartmentModel) -> Department {
    Department::new(&model.name)
}

#[async_trait]
impl<'a> EntityApi for DepartmentsApi<'a> {
    type Entity = Department;
    type Id = String;

    const KIND: &'static str = "Department";

    fn parse_id(raw: &str) -> Result<String, String> {
        parse_string_id(raw)
    }

    async fn create(&self, department: &Department) -> Result<String, ApiError> {
        DepartmentsApi::create(self, department).await
    }

    async fn get_by_id(&self, id: &String) -> Result<Department, ApiError> {
        self.get(id).await
    }

    async fn get_by_name(&self, name: &str) -> Result<Department, ApiError> {
        DepartmentsApi::get_by_name(self, name).await
    }

    async fn update_by_id(&self, id: &String, department: &Department) -> Result<(), ApiError> {
        self.update(id, department).await
    }

    async fn update_by_name(&self, name: &str, department: &Department) -> Result<(), ApiError> {
        DepartmentsApi::update_by_name(self, name, department)
            .await
            .map(|_| ())
    }

    async fn delete_by_id(&self, id: &String) -> Result<(), ApiError> {
        self.delete(id).await
    }

    async fn delete_by_name(&self, name: &str) -> Result<(), ApiError> {
        DepartmentsApi::delete_by_name(self, name).await
    }
}

pub fn department_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("Manages a department in Jamf Pro")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .description("The unique identifier of the department")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .description("The unique name of the department")
                .required()
                .validator(StringLengthValidator::at_least(1))
                .build(),
        )
        .attribute(timeouts::attribute())
        .build()
}

#[derive(Default)]
pub struct DepartmentResource {
    provider_data: Option<JamfProProviderData>,
}

impl DepartmentResource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ManagedResource for DepartmentResource {
    type Entity = Department;
    type Model = DepartmentModel;
    type Api<'a> = DepartmentsApi<'a>;

    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    fn provider_data(&self) -> Option<&JamfProProviderData> {
        self.provider_data.as_ref()
    }

    fn api(client: &Client) -> DepartmentsApi<'_> {
        client.departments()
    }

    fn schema() -> Schema {
        department_schema()
    }

    fn timeouts(model: &DepartmentModel) -> Option<&TimeoutsConfig> {
        model.timeouts.as_ref()
    }

    async fn construct(&self, model: &DepartmentModel) -> Result<Department, ReconcileError> {
        Ok(construct(model))
    }
}

#[async_trait]
impl Resource for DepartmentResource {
    fn type_name(&self) -> &str {
        "jamfpro_department"
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
            schema: department_schema(),
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
impl ResourceWithConfigure for DepartmentResource {
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
impl ResourceWithImportState for DepartmentResource {
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
