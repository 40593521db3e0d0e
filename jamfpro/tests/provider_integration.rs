//! Drives the provider through the plugin host traits against a mock Jamf Pro

use jamfpro::resources::account::{AccountModel, GroupModel};
use jamfpro::resources::department::DepartmentModel;
use jamfpro::resources::SiteResource;
use jamfpro::JamfProProvider;
use mockito::{Matcher, Server, ServerGuard};
use serial_test::serial;
use tfplug::context::Context;
use tfplug::provider::{ConfigureProviderRequest, Provider};
use tfplug::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ReadResourceRequest, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest,
};
use tfplug::types::{AttributePath, DynamicValue};

fn clear_env() {
    for var in [
        jamfpro::config::ENV_URL,
        jamfpro::config::ENV_INSTANCE_NAME,
        jamfpro::config::ENV_CLIENT_ID,
        jamfpro::config::ENV_CLIENT_SECRET,
    ] {
        std::env::remove_var(var);
    }
}

async fn mock_token(server: &mut ServerGuard) -> mockito::Mock {
    server
        .mock("POST", "/api/oauth/token")
        .with_body(r#"{"access_token":"integration-token","expires_in":1200}"#)
        .create_async()
        .await
}

/// Configures the provider against `server` and returns a configured
/// instance of `type_name`
async fn configured_resource(
    server: &ServerGuard,
    type_name: &str,
) -> Box<dyn ResourceWithConfigure> {
    clear_env();

    let mut config = DynamicValue::null();
    config
        .set_string(&AttributePath::new("url"), server.url())
        .unwrap();
    config
        .set_string(&AttributePath::new("client_id"), "client".to_string())
        .unwrap();
    config
        .set_string(&AttributePath::new("client_secret"), "secret".to_string())
        .unwrap();

    let mut provider = JamfProProvider::new();
    let configured = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                terraform_version: "1.9.0".to_string(),
                config,
            },
        )
        .await;
    assert!(configured.diagnostics.is_empty(), "{:?}", configured.diagnostics);

    let factories = provider.resources();
    let mut resource = factories[type_name]();
    let response = resource
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: configured.provider_data,
            },
        )
        .await;
    assert!(response.diagnostics.is_empty());
    resource
}

fn department(id: &str, name: &str) -> DynamicValue {
    DynamicValue::from_model(&DepartmentModel {
        id: id.to_string(),
        name: name.to_string(),
        timeouts: None,
    })
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn department_lifecycle() {
    let mut server = Server::new_async().await;
    let _token = mock_token(&mut server).await;
    let resource = configured_resource(&server, "jamfpro_department").await;

    let create = server
        .mock("POST", "/api/v1/departments")
        .match_header("authorization", "Bearer integration-token")
        .match_body(Matcher::Json(serde_json::json!({"name": "Engineering"})))
        .with_status(201)
        .with_body(r#"{"id":"7","href":"/api/v1/departments/7"}"#)
        .create_async()
        .await;
    let read_back = server
        .mock("GET", "/api/v1/departments/7")
        .with_body(r#"{"id":"7","name":"Engineering"}"#)
        .create_async()
        .await;

    let created = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "jamfpro_department".to_string(),
                planned_state: department("", "Engineering"),
                config: department("", "Engineering"),
            },
        )
        .await;

    assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
    assert_eq!(
        created.new_state.get_string(&AttributePath::new("id")).unwrap(),
        "7"
    );
    create.assert_async().await;
    read_back.assert_async().await;

    let update = server
        .mock("PUT", "/api/v1/departments/7")
        .match_body(Matcher::Json(serde_json::json!({"name": "Platform"})))
        .with_body(r#"{"id":"7","name":"Platform"}"#)
        .create_async()
        .await;
    read_back.remove_async().await;
    let _renamed = server
        .mock("GET", "/api/v1/departments/7")
        .with_body(r#"{"id":"7","name":"Platform"}"#)
        .create_async()
        .await;

    let updated = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "jamfpro_department".to_string(),
                prior_state: created.new_state.clone(),
                planned_state: department("7", "Platform"),
                config: department("", "Platform"),
            },
        )
        .await;

    assert!(updated.diagnostics.is_empty(), "{:?}", updated.diagnostics);
    assert_eq!(
        updated.new_state.get_string(&AttributePath::new("name")).unwrap(),
        "Platform"
    );
    update.assert_async().await;

    let delete = server
        .mock("DELETE", "/api/v1/departments/7")
        .with_status(204)
        .create_async()
        .await;

    let deleted = resource
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "jamfpro_department".to_string(),
                prior_state: updated.new_state,
            },
        )
        .await;

    assert!(deleted.diagnostics.is_empty());
    assert!(deleted.new_state.is_null());
    delete.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn department_deleted_outside_terraform_is_dropped_from_state() {
    let mut server = Server::new_async().await;
    let _token = mock_token(&mut server).await;
    let resource = configured_resource(&server, "jamfpro_department").await;

    let _by_id = server
        .mock("GET", "/api/v1/departments/7")
        .with_status(404)
        .with_body(r#"{"httpStatus":404,"errors":[{"code":"INVALID_ID","description":"Department not found"}]}"#)
        .create_async()
        .await;
    let by_name = server
        .mock("GET", "/api/v1/departments")
        .match_query(Matcher::Any)
        .with_body(r#"{"totalCount":0,"results":[]}"#)
        .create_async()
        .await;

    let read = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "jamfpro_department".to_string(),
                current_state: department("7", "Engineering"),
            },
        )
        .await;

    by_name.assert_async().await;
    assert!(read.new_state.is_none());
    assert_eq!(read.diagnostics.len(), 1);
    assert!(!read.diagnostics[0].is_error());
    assert_eq!(
        read.diagnostics[0].summary,
        "Jamf Pro Department 'Engineering' not found"
    );
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn department_update_falls_back_to_name() {
    let mut server = Server::new_async().await;
    let _token = mock_token(&mut server).await;
    let resource = configured_resource(&server, "jamfpro_department").await;

    let _by_id = server
        .mock("PUT", "/api/v1/departments/7")
        .with_status(404)
        .with_body(r#"{"httpStatus":404,"errors":[{"description":"Department not found"}]}"#)
        .create_async()
        .await;
    let _lookup = server
        .mock("GET", "/api/v1/departments")
        .match_query(Matcher::UrlEncoded(
            "filter".into(),
            "name==\"Engineering\"".into(),
        ))
        .with_body(r#"{"totalCount":1,"results":[{"id":"9","name":"Engineering"}]}"#)
        .create_async()
        .await;
    let by_name = server
        .mock("PUT", "/api/v1/departments/9")
        .match_body(Matcher::Json(serde_json::json!({"name": "Platform"})))
        .with_body(r#"{"id":"9","name":"Platform"}"#)
        .create_async()
        .await;
    let _stale_id = server
        .mock("GET", "/api/v1/departments/7")
        .with_status(404)
        .with_body(r#"{"httpStatus":404,"errors":[{"description":"Department not found"}]}"#)
        .create_async()
        .await;
    let _read_back = server
        .mock("GET", "/api/v1/departments")
        .match_query(Matcher::UrlEncoded(
            "filter".into(),
            "name==\"Platform\"".into(),
        ))
        .with_body(r#"{"totalCount":1,"results":[{"id":"9","name":"Platform"}]}"#)
        .create_async()
        .await;

    let updated = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "jamfpro_department".to_string(),
                prior_state: department("7", "Engineering"),
                planned_state: department("7", "Platform"),
                config: department("", "Platform"),
            },
        )
        .await;

    by_name.assert_async().await;
    assert!(updated.diagnostics.is_empty(), "{:?}", updated.diagnostics);
    assert_eq!(
        updated.new_state.get_string(&AttributePath::new("id")).unwrap(),
        "9"
    );
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn site_import_then_read() {
    let mut server = Server::new_async().await;
    let _token = mock_token(&mut server).await;
    let resource = configured_resource(&server, "jamfpro_site").await;

    let imported = SiteResource::new()
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: "jamfpro_site".to_string(),
                id: "12".to_string(),
            },
        )
        .await;
    assert!(imported.diagnostics.is_empty());

    let get = server
        .mock("GET", "/JSSResource/sites/id/12")
        .with_body(r#"{"site":{"id":12,"name":"London"}}"#)
        .create_async()
        .await;

    let read = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "jamfpro_site".to_string(),
                current_state: imported.imported_resources[0].state.clone(),
            },
        )
        .await;

    get.assert_async().await;
    assert!(read.diagnostics.is_empty(), "{:?}", read.diagnostics);
    let state = read.new_state.unwrap();
    assert_eq!(state.get_string(&AttributePath::new("name")).unwrap(), "London");
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "12");
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn account_create_resolves_groups() {
    let mut server = Server::new_async().await;
    let _token = mock_token(&mut server).await;
    let resource = configured_resource(&server, "jamfpro_account").await;

    let list = server
        .mock("GET", "/JSSResource/accounts")
        .with_body(r#"{"accounts":{"users":[],"groups":[{"id":3,"name":"Helpdesk"}]}}"#)
        .create_async()
        .await;
    let create = server
        .mock("POST", "/JSSResource/accounts/userid/0")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "account": {"name": "jdoe", "groups": [{"id": 3, "name": "Helpdesk"}]}
        })))
        .with_status(201)
        .with_body(r#"{"account":{"id":5}}"#)
        .create_async()
        .await;
    let _read_back = server
        .mock("GET", "/JSSResource/accounts/userid/5")
        .with_body(
            r#"{"account":{"id":5,"name":"jdoe","enabled":"Enabled","access_level":"Group Access",
                "privilege_set":"Custom","groups":[{"id":3,"name":"Helpdesk"}],"privileges":{}}}"#,
        )
        .create_async()
        .await;

    let planned = DynamicValue::from_model(&AccountModel {
        name: "jdoe".to_string(),
        enabled: "Enabled".to_string(),
        access_level: "Group Access".to_string(),
        privilege_set: Some("Custom".to_string()),
        password: Some("s3cret".to_string()),
        groups: vec![GroupModel {
            name: "Helpdesk".to_string(),
            ..Default::default()
        }],
        ..Default::default()
    })
    .unwrap();

    let created = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "jamfpro_account".to_string(),
                planned_state: planned.clone(),
                config: planned,
            },
        )
        .await;

    list.assert_async().await;
    create.assert_async().await;
    assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);

    let state: AccountModel = created.new_state.to_model().unwrap();
    assert_eq!(state.id, "5");
    assert_eq!(state.groups[0].id, 3);
    assert_eq!(state.password.as_deref(), Some("s3cret"));
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn account_with_unknown_group_is_not_created() {
    let mut server = Server::new_async().await;
    let _token = mock_token(&mut server).await;
    let resource = configured_resource(&server, "jamfpro_account").await;

    let _list = server
        .mock("GET", "/JSSResource/accounts")
        .with_body(r#"{"accounts":{"users":[],"groups":[]}}"#)
        .create_async()
        .await;
    let create = server
        .mock("POST", "/JSSResource/accounts/userid/0")
        .expect(0)
        .create_async()
        .await;

    let planned = DynamicValue::from_model(&AccountModel {
        name: "jdoe".to_string(),
        enabled: "Enabled".to_string(),
        access_level: "Group Access".to_string(),
        groups: vec![GroupModel {
            name: "Ops".to_string(),
            ..Default::default()
        }],
        ..Default::default()
    })
    .unwrap();

    let created = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "jamfpro_account".to_string(),
                planned_state: planned.clone(),
                config: planned,
            },
        )
        .await;

    create.assert_async().await;
    assert!(created.new_state.is_null());
    assert_eq!(created.diagnostics[0].summary, "Failed to create Jamf Pro Account 'jdoe'");
    assert_eq!(created.diagnostics[0].detail, "group name Ops does not exist");
}
