//! Accounts on the Classic API (`/JSSResource/accounts`)

use serde::{Deserialize, Serialize};

use super::common::{path_segment, CreatedId, NamedRef};
use super::{ApiError, Client};

const BASE_PATH: &str = "/JSSResource/accounts";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub directory_user: bool,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub email_address: String,
    #[serde(default)]
    pub enabled: String,
    #[serde(default)]
    pub ldap_server: NamedRef,
    #[serde(default)]
    pub force_password_change: bool,
    #[serde(default)]
    pub access_level: String,
    /// Write-only; the API never returns it
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default)]
    pub privilege_set: String,
    #[serde(default)]
    pub site: NamedRef,
    #[serde(default)]
    pub groups: Vec<AccountGroup>,
    #[serde(default)]
    pub privileges: Privileges,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountGroup {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub site: NamedRef,
    #[serde(default)]
    pub privileges: Privileges,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Privileges {
    #[serde(default)]
    pub jss_objects: Vec<String>,
    #[serde(default)]
    pub jss_settings: Vec<String>,
    #[serde(default)]
    pub jss_actions: Vec<String>,
    #[serde(default)]
    pub recon: Vec<String>,
    #[serde(default)]
    pub casper_admin: Vec<String>,
    #[serde(default)]
    pub casper_remote: Vec<String>,
    #[serde(default)]
    pub casper_imaging: Vec<String>,
}

/// Response from GET /JSSResource/accounts
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountsList {
    #[serde(default)]
    pub users: Vec<NamedRef>,
    #[serde(default)]
    pub groups: Vec<NamedRef>,
}

#[derive(Debug, Deserialize)]
struct ListEnvelope {
    accounts: AccountsList,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    account: T,
}

pub struct AccountsApi<'a> {
    client: &'a Client,
}

impl<'a> AccountsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /JSSResource/accounts
    pub async fn list(&self) -> Result<AccountsList, ApiError> {
        let envelope: ListEnvelope = self.client.get(BASE_PATH).await?;
        Ok(envelope.accounts)
    }

    /// GET /JSSResource/accounts/userid/{id}
    pub async fn get(&self, id: i64) -> Result<Account, ApiError> {
        let envelope: Envelope<Account> = self.client.get(&id_path(id)).await?;
        Ok(envelope.account)
    }

    /// GET /JSSResource/accounts/username/{name}
    pub async fn get_by_name(&self, name: &str) -> Result<Account, ApiError> {
        let envelope: Envelope<Account> = self.client.get(&name_path(name)).await?;
        Ok(envelope.account)
    }

    /// POST /JSSResource/accounts/userid/0, returning the new ID
    pub async fn create(&self, account: &Account) -> Result<i64, ApiError> {
        let envelope: Envelope<CreatedId> = self
            .client
            .post(&id_path(0), &Envelope { account: writable(account) })
            .await?;
        Ok(envelope.account.id)
    }

    /// PUT /JSSResource/accounts/userid/{id}
    pub async fn update(&self, id: i64, account: &Account) -> Result<(), ApiError> {
        self.client
            .put(&id_path(id), &Envelope { account: writable(account) })
            .await
    }

    /// PUT /JSSResource/accounts/username/{name}
    pub async fn update_by_name(&self, name: &str, account: &Account) -> Result<(), ApiError> {
        self.client
            .put(&name_path(name), &Envelope { account: writable(account) })
            .await
    }

    /// DELETE /JSSResource/accounts/userid/{id}
    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.client.delete(&id_path(id)).await
    }

    /// DELETE /JSSResource/accounts/username/{name}
    pub async fn delete_by_name(&self, name: &str) -> Result<(), ApiError> {
        self.client.delete(&name_path(name)).await
    }
}

// The ID is carried by the path; unset references are left out of the body.
fn writable(account: &Account) -> serde_json::Value {
    let mut body = serde_json::json!({
        "name": account.name,
        "directory_user": account.directory_user,
        "full_name": account.full_name,
        "email": account.email,
        "email_address": account.email_address,
        "enabled": account.enabled,
        "force_password_change": account.force_password_change,
        "access_level": account.access_level,
        "privilege_set": account.privilege_set,
        "groups": account.groups,
        "privileges": account.privileges,
    });

    if let Some(fields) = body.as_object_mut() {
        if account.ldap_server.is_set() {
            fields.insert("ldap_server".into(), serde_json::json!(account.ldap_server));
        }
        if account.site.is_set() {
            fields.insert("site".into(), serde_json::json!(account.site));
        }
        if !account.password.is_empty() {
            fields.insert("password".into(), serde_json::json!(account.password));
        }
    }

    body
}

fn id_path(id: i64) -> String {
    format!("{}/userid/{}", BASE_PATH, id)
}

fn name_path(name: &str) -> String {
    format!("{}/username/{}", BASE_PATH, path_segment(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::test_support::client_with_token;
    use mockito::{Matcher, Server};

    const ACCOUNT_BODY: &str = r#"{
        "account": {
            "id": 5,
            "name": "jdoe",
            "directory_user": false,
            "full_name": "Jane Doe",
            "email": "jane@example.com",
            "email_address": "jane@example.com",
            "enabled": "Enabled",
            "ldap_server": {"id": -1, "name": "None"},
            "force_password_change": false,
            "access_level": "Group Access",
            "privilege_set": "Custom",
            "site": {"id": -1, "name": "None"},
            "groups": [
                {
                    "id": 3,
                    "name": "Helpdesk",
                    "site": {"id": 1, "name": "London"},
                    "privileges": {"jss_objects": ["Read Computers"]}
                }
            ],
            "privileges": {
                "jss_objects": ["Read Computers", "Update Computers"],
                "jss_settings": [],
                "jss_actions": ["Send Computer Remote Lock Command"]
            }
        }
    }"#;

    #[tokio::test]
    async fn get_decodes_nested_fields() {
        let mut server = Server::new_async().await;
        let (client, _token) = client_with_token(&mut server).await;
        let _mock = server
            .mock("GET", "/JSSResource/accounts/userid/5")
            .with_body(ACCOUNT_BODY)
            .create_async()
            .await;

        let account = client.accounts().get(5).await.unwrap();

        assert_eq!(account.name, "jdoe");
        assert_eq!(account.access_level, "Group Access");
        assert!(!account.ldap_server.is_set());
        assert!(!account.site.is_set());
        assert_eq!(account.groups.len(), 1);
        assert_eq!(account.groups[0].site.name, "London");
        assert_eq!(account.privileges.jss_objects.len(), 2);
        assert!(account.privileges.recon.is_empty());
        assert!(account.password.is_empty());
    }

    #[tokio::test]
    async fn list_returns_users_and_groups() {
        let mut server = Server::new_async().await;
        let (client, _token) = client_with_token(&mut server).await;
        let _mock = server
            .mock("GET", "/JSSResource/accounts")
            .with_body(
                r#"{"accounts":{"users":[{"id":1,"name":"admin"}],"groups":[{"id":3,"name":"Helpdesk"}]}}"#,
            )
            .create_async()
            .await;

        let list = client.accounts().list().await.unwrap();

        assert_eq!(list.users[0].name, "admin");
        assert_eq!(list.groups[0], NamedRef { id: 3, name: "Helpdesk".to_string() });
    }

    #[tokio::test]
    async fn create_omits_unset_references() {
        let mut server = Server::new_async().await;
        let (client, _token) = client_with_token(&mut server).await;
        let mock = server
            .mock("POST", "/JSSResource/accounts/userid/0")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "account": {"name": "jdoe", "password": "s3cret", "access_level": "Full Access"}
            })))
            .with_status(201)
            .with_body(r#"{"account":{"id":5}}"#)
            .create_async()
            .await;

        let account = Account {
            name: "jdoe".to_string(),
            password: "s3cret".to_string(),
            enabled: "Enabled".to_string(),
            access_level: "Full Access".to_string(),
            privilege_set: "Administrator".to_string(),
            ..Default::default()
        };

        assert_eq!(client.accounts().create(&account).await.unwrap(), 5);
        mock.assert_async().await;

        let body = writable(&account);
        assert!(body.get("site").is_none());
        assert!(body.get("ldap_server").is_none());
        assert!(body.get("id").is_none());
    }

    #[tokio::test]
    async fn update_by_name_uses_username_path() {
        let mut server = Server::new_async().await;
        let (client, _token) = client_with_token(&mut server).await;
        let mock = server
            .mock("PUT", "/JSSResource/accounts/username/jdoe")
            .with_body(r#"{"account":{"id":5}}"#)
            .create_async()
            .await;

        let account = Account {
            name: "jdoe".to_string(),
            ..Default::default()
        };
        client.accounts().update_by_name("jdoe", &account).await.unwrap();

        mock.assert_async().await;
    }
}
