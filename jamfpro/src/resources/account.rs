//! Account resource implementation
//!
//! Jamf Pro user accounts on the Classic API. Groups are configured by name
//! and resolved to IDs when the request is built; the password is write-only
//! and kept from configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
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
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::timeouts;
use tfplug::types::{null_as_default, AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{
    EachElement, ListLengthValidator, StringLengthValidator, StringOneOfValidator,
    StringPatternValidator,
};
use tfplug::TimeoutsConfig;

use crate::api::accounts::{Account, AccountGroup, AccountsApi, AccountsList, Privileges};
use crate::api::common::NamedRef;
use crate::api::{ApiError, Client};
use crate::reconcile::{parse_numeric_id, EntityApi, ReconcileError, ResourceState};
use crate::resources::{self, provider_data_from, ManagedResource};
use crate::JamfProProviderData;

const ENABLED_VALUES: &[&str] = &["Enabled", "Disabled"];
const ACCESS_LEVELS: &[&str] = &["Full Access", "Site Access", "Group Access"];
const PRIVILEGE_SETS: &[&str] = &["Administrator", "Auditor", "Enrollment Only", "Custom"];

const PRIVILEGE_LISTS: [&str; 7] = [
    "jss_objects_privileges",
    "jss_settings_privileges",
    "jss_actions_privileges",
    "casper_admin_privileges",
    "casper_remote_privileges",
    "casper_imaging_privileges",
    "recon_privileges",
];

/// `{id, name}` block used for `site` and `ldap_server`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefModel {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

impl RefModel {
    fn list_from(reference: &NamedRef) -> Vec<RefModel> {
        if reference.is_set() {
            vec![RefModel {
                id: reference.id,
                name: reference.name.clone(),
            }]
        } else {
            vec![]
        }
    }

    fn first_to_api(list: &[RefModel]) -> NamedRef {
        list.first()
            .map(|r| NamedRef {
                id: r.id,
                name: r.name.clone(),
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrivilegeLists {
    #[serde(default, deserialize_with = "null_as_default")]
    pub jss_objects_privileges: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub jss_settings_privileges: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub jss_actions_privileges: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub casper_admin_privileges: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub casper_remote_privileges: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub casper_imaging_privileges: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recon_privileges: Vec<String>,
}

impl PrivilegeLists {
    fn from_api(privileges: &Privileges) -> Self {
        Self {
            jss_objects_privileges: privileges.jss_objects.clone(),
            jss_settings_privileges: privileges.jss_settings.clone(),
            jss_actions_privileges: privileges.jss_actions.clone(),
            casper_admin_privileges: privileges.casper_admin.clone(),
            casper_remote_privileges: privileges.casper_remote.clone(),
            casper_imaging_privileges: privileges.casper_imaging.clone(),
            recon_privileges: privileges.recon.clone(),
        }
    }

    fn to_api(&self) -> Privileges {
        Privileges {
            jss_objects: self.jss_objects_privileges.clone(),
            jss_settings: self.jss_settings_privileges.clone(),
            jss_actions: self.jss_actions_privileges.clone(),
            recon: self.recon_privileges.clone(),
            casper_admin: self.casper_admin_privileges.clone(),
            casper_remote: self.casper_remote_privileges.clone(),
            casper_imaging: self.casper_imaging_privileges.clone(),
        }
    }

    fn is_empty(&self) -> bool {
        self.to_api() == Privileges::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupModel {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub site: Vec<RefModel>,
    #[serde(flatten)]
    pub privileges: PrivilegeLists,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountModel {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub directory_user: bool,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub enabled: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ldap_server: Vec<RefModel>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub force_password_change: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub access_level: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub privilege_set: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub site: Vec<RefModel>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub groups: Vec<GroupModel>,
    #[serde(flatten)]
    pub privileges: PrivilegeLists,
    #[serde(default)]
    pub timeouts: Option<TimeoutsConfig>,
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

impl ResourceState<Account> for AccountModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn refresh(&mut self, account: &Account) {
        self.id = account.id.to_string();
        self.name = account.name.clone();
        self.directory_user = account.directory_user;
        self.full_name = non_empty(&account.full_name);
        self.email = non_empty(&account.email);
        self.email_address = non_empty(&account.email_address);
        self.enabled = account.enabled.clone();
        self.ldap_server = RefModel::list_from(&account.ldap_server);
        self.force_password_change = account.force_password_change;
        self.access_level = account.access_level.clone();
        self.privilege_set = non_empty(&account.privilege_set);
        self.site = RefModel::list_from(&account.site);
        self.groups = account
            .groups
            .iter()
            .map(|group| GroupModel {
                name: group.name.clone(),
                id: group.id,
                site: RefModel::list_from(&group.site),
                privileges: PrivilegeLists::from_api(&group.privileges),
            })
            .collect();
        self.privileges = PrivilegeLists::from_api(&account.privileges);
    }
}

/// Builds the API request. Group names are resolved against `known`.
pub fn construct_with_groups(
    model: &AccountModel,
    known: &AccountsList,
) -> Result<Account, ReconcileError> {
    let group_ids: HashMap<&str, i64> = known
        .groups
        .iter()
        .map(|g| (g.name.as_str(), g.id))
        .collect();

    let groups = model
        .groups
        .iter()
        .map(|group| {
            let id = group_ids.get(group.name.as_str()).copied().ok_or_else(|| {
                ReconcileError::Construct(format!("group name {} does not exist", group.name))
            })?;
            Ok(AccountGroup {
                id,
                name: group.name.clone(),
                site: RefModel::first_to_api(&group.site),
                privileges: group.privileges.to_api(),
            })
        })
        .collect::<Result<Vec<_>, ReconcileError>>()?;

    Ok(Account {
        id: 0,
        name: model.name.clone(),
        directory_user: model.directory_user,
        full_name: model.full_name.clone().unwrap_or_default(),
        email: model.email.clone().unwrap_or_default(),
        email_address: model.email_address.clone().unwrap_or_default(),
        enabled: model.enabled.clone(),
        ldap_server: RefModel::first_to_api(&model.ldap_server),
        force_password_change: model.force_password_change,
        access_level: model.access_level.clone(),
        password: model.password.clone().unwrap_or_default(),
        privilege_set: model.privilege_set.clone().unwrap_or_default(),
        site: RefModel::first_to_api(&model.site),
        groups,
        privileges: model.privileges.to_api(),
    })
}

/// Builds the API request, listing account groups first when any are
/// configured. A failed listing is returned as is, not retried.
pub async fn construct(client: &Client, model: &AccountModel) -> Result<Account, ReconcileError> {
    let known = if model.groups.is_empty() {
        AccountsList::default()
    } else {
        client.accounts().list().await?
    };
    let account = construct_with_groups(model, &known)?;
    tracing::debug!("Constructed account request for '{}'", account.name);
    Ok(account)
}

#[async_trait]
impl<'a> EntityApi for AccountsApi<'a> {
    type Entity = Account;
    type Id = i64;

    const KIND: &'static str = "Account";

    fn parse_id(raw: &str) -> Result<i64, String> {
        parse_numeric_id(raw)
    }

    async fn create(&self, account: &Account) -> Result<i64, ApiError> {
        AccountsApi::create(self, account).await
    }

    async fn get_by_id(&self, id: &i64) -> Result<Account, ApiError> {
        self.get(*id).await
    }

    async fn get_by_name(&self, name: &str) -> Result<Account, ApiError> {
        AccountsApi::get_by_name(self, name).await
    }

    async fn update_by_id(&self, id: &i64, account: &Account) -> Result<(), ApiError> {
        self.update(*id, account).await
    }

    async fn update_by_name(&self, name: &str, account: &Account) -> Result<(), ApiError> {
        AccountsApi::update_by_name(self, name, account).await
    }

    async fn delete_by_id(&self, id: &i64) -> Result<(), ApiError> {
        self.delete(*id).await
    }

    async fn delete_by_name(&self, name: &str) -> Result<(), ApiError> {
        AccountsApi::delete_by_name(self, name).await
    }
}

/// `{id, name}` block. The API fills in whichever half is not configured.
fn reference_attribute(name: &str, description: &str) -> Attribute {
    AttributeBuilder::list_nested(
        name,
        vec![
            AttributeBuilder::new("id", AttributeType::Number)
                .optional()
                .computed()
                .build(),
            AttributeBuilder::new("name", AttributeType::String)
                .optional()
                .computed()
                .build(),
        ],
    )
    .description(description)
    .optional()
    .validator(ListLengthValidator::at_most(1))
    .default(StaticDefault::empty_list())
    .build()
}

const PRIVILEGE_DESCRIPTIONS: [&str; 7] = [
    "Privileges related to JSS Objects",
    "Privileges related to JSS Settings",
    "Privileges related to JSS Actions",
    "Privileges related to Casper Admin",
    "Privileges related to Casper Remote",
    "Privileges related to Casper Imaging",
    "Privileges related to Recon",
];

fn privilege_attributes() -> Vec<Attribute> {
    PRIVILEGE_LISTS
        .iter()
        .zip(PRIVILEGE_DESCRIPTIONS)
        .map(|(name, description)| privilege_attribute(name, description))
        .collect()
}

fn groups_attribute() -> Attribute {
    let mut fields = vec![
        AttributeBuilder::new("name", AttributeType::String)
            .description("Name of an existing account group")
            .required()
            .build(),
        AttributeBuilder::new("id", AttributeType::Number)
            .description("ID of the account group")
            .computed()
            .build(),
        reference_attribute("site", "Site of the account group"),
    ];
    fields.extend(privilege_attributes());

    AttributeBuilder::list_nested("groups", fields)
        .description("Account groups, by name, when access_level is Group Access")
        .optional()
        .default(StaticDefault::empty_list())
        .build()
}

fn privilege_attribute(name: &str, description: &str) -> Attribute {
    let mut builder = AttributeBuilder::new(name, AttributeType::list_of(AttributeType::String))
        .description(description)
        .optional()
        .default(StaticDefault::empty_list());

    if matches!(name, "jss_objects_privileges" | "jss_settings_privileges") {
        if let Ok(pattern) = regex::Regex::new(r"^(Create|Read|Update|Delete) .+") {
            builder = builder.validator(EachElement::create(StringPatternValidator::create(
                pattern,
                "a CRUD privilege such as \"Read Computers\"",
            )));
        }
    }

    builder.build()
}

pub fn account_schema() -> Schema {
    let mut builder = SchemaBuilder::new()
        .version(0)
        .description("Manages a Jamf Pro user account")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .description("The unique identifier of the account")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .description("The name of the account")
                .required()
                .validator(StringLengthValidator::at_least(1))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("directory_user", AttributeType::Bool)
                .description("Whether the user is a directory user")
                .optional()
                .default(StaticDefault::bool(false))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("full_name", AttributeType::String)
                .description("The full name of the account user")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("email", AttributeType::String)
                .description("The email of the account user")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("email_address", AttributeType::String)
                .description("The email address of the account user")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("enabled", AttributeType::String)
                .description("Access status of the account: Enabled or Disabled")
                .required()
                .validator(StringOneOfValidator::create(ENABLED_VALUES))
                .build(),
        )
        .attribute(reference_attribute(
            "ldap_server",
            "LDAP server of a directory account",
        ))
        .attribute(
            AttributeBuilder::new("force_password_change", AttributeType::Bool)
                .description("Force the user to change their password at next login")
                .optional()
                .default(StaticDefault::bool(false))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("access_level", AttributeType::String)
                .description("Full Access, Site Access (scoped to a site) or Group Access (scoped to account groups)")
                .required()
                .validator(StringOneOfValidator::create(ACCESS_LEVELS))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("password", AttributeType::String)
                .description("The password for the account")
                .optional()
                .sensitive()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("privilege_set", AttributeType::String)
                .description("The privilege set assigned to the account")
                .optional()
                .validator(StringOneOfValidator::create(PRIVILEGE_SETS))
                .build(),
        )
        .attribute(reference_attribute(
            "site",
            "Site of the account when access_level is Site Access",
        ))
        .attribute(groups_attribute());

    for attribute in privilege_attributes() {
        builder = builder.attribute(attribute);
    }

    builder.attribute(timeouts::attribute()).build()
}

/// Rules spanning several attributes. Attributes whose value is not yet
/// known are skipped.
fn validate_access(config: &DynamicValue, model: &AccountModel) -> Vec<Diagnostic> {
    let known = |name: &str| {
        config
            .get(&AttributePath::new(name))
            .map_or(true, |value| !value.is_unknown())
    };
    let mut diagnostics = vec![];

    let access_known = known("access_level");

    if access_known && known("site") && model.access_level == "Site Access" && model.site.is_empty() {
        diagnostics.push(
            Diagnostic::error(
                "Missing site",
                "access_level \"Site Access\" requires a site block",
            )
            .with_attribute(AttributePath::new("site")),
        );
    }

    if access_known && known("groups") && model.access_level == "Group Access" && model.groups.is_empty() {
        diagnostics.push(
            Diagnostic::error(
                "Missing groups",
                "access_level \"Group Access\" requires at least one groups block",
            )
            .with_attribute(AttributePath::new("groups")),
        );
    }

    if known("privilege_set")
        && PRIVILEGE_LISTS.iter().all(|name| known(name))
        && !model.privileges.is_empty()
        && model.privilege_set.as_deref() != Some("Custom")
    {
        diagnostics.push(
            Diagnostic::error(
                "Privileges require a Custom privilege set",
                "Privilege lists can only be set when privilege_set is \"Custom\"",
            )
            .with_attribute(AttributePath::new("privilege_set")),
        );
    }

    diagnostics
}

#[derive(Default)]
pub struct AccountResource {
    provider_data: Option<JamfProProviderData>,
}

impl AccountResource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ManagedResource for AccountResource {
    type Entity = Account;
    type Model = AccountModel;
    type Api<'a> = AccountsApi<'a>;

    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    fn provider_data(&self) -> Option<&JamfProProviderData> {
        self.provider_data.as_ref()
    }

    fn api(client: &Client) -> AccountsApi<'_> {
        client.accounts()
    }

    fn schema() -> Schema {
        account_schema()
    }

    fn timeouts(model: &AccountModel) -> Option<&TimeoutsConfig> {
        model.timeouts.as_ref()
    }

    async fn construct(&self, model: &AccountModel) -> Result<Account, ReconcileError> {
        let data = self
            .provider_data
            .as_ref()
            .ok_or_else(|| ReconcileError::Construct("provider not configured".to_string()))?;
        construct(&data.client, model).await
    }

    fn validate_model(config: &DynamicValue, model: &AccountModel) -> Vec<Diagnostic> {
        validate_access(config, model)
    }
}

#[async_trait]
impl Resource for AccountResource {
    fn type_name(&self) -> &str {
        "jamfpro_account"
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
            schema: account_schema(),
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
impl ResourceWithConfigure for AccountResource {
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
impl ResourceWithImportState for AccountResource {
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
