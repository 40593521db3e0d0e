use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::common::{ApiErrorDetails, ApiErrorResponse};
use super::error::ApiError;

const TOKEN_PATH: &str = "/api/oauth/token";

// Tokens are refreshed this long before they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(30);

/// Jamf Pro API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    request_timeout: Duration,
    token: RwLock<Option<AccessToken>>,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    60
}

#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub insecure: bool,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str, client_id: &str, client_secret: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            insecure: false,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(base_url: &str, client_id: &str, client_secret: &str) -> Result<Self, ApiError> {
        Self::with_config(ClientConfig::new(base_url, client_id, client_secret))
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, ApiError> {
        let base = url::Url::parse(&config.base_url)
            .map_err(|e| ApiError::InvalidConfig(format!("{}: {}", config.base_url, e)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ApiError::InvalidConfig(format!(
                "{}: scheme must be http or https",
                config.base_url
            )));
        }

        let http_client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                client_id: config.client_id,
                client_secret: config.client_secret,
                request_timeout: config.request_timeout,
                token: RwLock::new(None),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Departments (Jamf Pro API)
    pub fn departments(&self) -> crate::api::departments::DepartmentsApi<'_> {
        crate::api::departments::DepartmentsApi::new(self)
    }

    /// Sites (Classic API)
    pub fn sites(&self) -> crate::api::sites::SitesApi<'_> {
        crate::api::sites::SitesApi::new(self)
    }

    /// Accounts and account groups (Classic API)
    pub fn accounts(&self) -> crate::api::accounts::AccountsApi<'_> {
        crate::api::accounts::AccountsApi::new(self)
    }

    /// Execute a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.request(Method::GET, path).await?;
        self.execute(request, path).await
    }

    /// Execute a POST request and decode the response body
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.request(Method::POST, path).await?.json(body);
        self.execute(request, path).await
    }

    /// Execute a PUT request, ignoring the response body
    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let request = self.request(Method::PUT, path).await?.json(body);
        self.execute_no_content(request, path).await
    }

    /// Execute a DELETE request, ignoring the response body
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, path).await?;
        self.execute_no_content(request, path).await
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.inner.base_url, path);

        tracing::debug!("{} request to: {}", method, url);

        Ok(self
            .inner
            .http_client
            .request(method, url)
            .bearer_auth(token)
            .header(ACCEPT, "application/json"))
    }

    /// Returns the cached bearer token, fetching a new one when it is missing
    /// or about to expire
    async fn access_token(&self) -> Result<String, ApiError> {
        if let Some(token) = self.inner.token.read().await.as_ref() {
            if token.is_fresh() {
                return Ok(token.value.clone());
            }
        }

        let mut guard = self.inner.token.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(token) = guard.as_ref() {
            if token.is_fresh() {
                return Ok(token.value.clone());
            }
        }

        let token = self.fetch_token().await?;
        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<AccessToken, ApiError> {
        let url = format!("{}{}", self.inner.base_url, TOKEN_PATH);
        tracing::debug!("Requesting OAuth token from: {}", url);

        let response = self
            .inner
            .http_client
            .post(&url)
            .header(ACCEPT, "application/json")
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.inner.client_id.as_str()),
                ("client_secret", self.inner.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("OAuth token request failed with {}", status);
            return Err(ApiError::AuthError {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| ApiError::ParseError(format!("invalid token response: {}", e)))?;

        Ok(AccessToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<T, ApiError> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();

        if !status.is_success() {
            return Err(self.error_from_response(response).await);
        }

        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        tracing::debug!("API response from {}: {}", path, text);

        serde_json::from_str::<T>(&text).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }

    async fn execute_no_content(&self, request: RequestBuilder, path: &str) -> Result<(), ApiError> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();

        if !status.is_success() {
            return Err(self.error_from_response(response).await);
        }

        tracing::debug!("API request to {} returned {}", path, status);
        Ok(())
    }

    async fn error_from_response(&self, response: reqwest::Response) -> ApiError {
        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let parsed = serde_json::from_str::<ApiErrorResponse>(&text).ok();
        let message = parsed
            .as_ref()
            .and_then(ApiErrorResponse::message)
            .or_else(|| {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());

        tracing::debug!("API error response ({}): {}", status, text);

        ApiError::ApiError {
            status: status.as_u16(),
            message,
            details: parsed
                .filter(|p| !p.errors.is_empty())
                .map(|p| Box::new(ApiErrorDetails { errors: p.errors })),
        }
    }

    fn transport_error(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout(self.inner.request_timeout.as_secs())
        } else if error.is_decode() {
            ApiError::ParseError(error.to_string())
        } else {
            ApiError::RequestError(error)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::client_with_token;
    use super::*;
    use mockito::{Matcher, Server};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Thing {
        id: String,
        name: String,
    }

    #[tokio::test]
    async fn client_sends_bearer_token() {
        let mut server = Server::new_async().await;
        let token = server
            .mock("POST", "/api/oauth/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
                Matcher::UrlEncoded("client_id".into(), "client-id".into()),
                Matcher::UrlEncoded("client_secret".into(), "client-secret".into()),
            ]))
            .with_body(r#"{"access_token":"abc123","expires_in":1200}"#)
            .expect(1)
            .create_async()
            .await;
        let thing = server
            .mock("GET", "/api/v1/things/1")
            .match_header("authorization", "Bearer abc123")
            .with_body(r#"{"id":"1","name":"Engineering"}"#)
            .expect(2)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "client-id", "client-secret").unwrap();

        let first: Thing = client.get("/api/v1/things/1").await.unwrap();
        let second: Thing = client.get("/api/v1/things/1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.name, "Engineering");

        token.assert_async().await;
        thing.assert_async().await;
    }

    #[tokio::test]
    async fn client_refreshes_expired_token() {
        let mut server = Server::new_async().await;
        // Shorter than the refresh margin, so every request fetches a new token.
        let token = server
            .mock("POST", "/api/oauth/token")
            .with_body(r#"{"access_token":"short","expires_in":1}"#)
            .expect(2)
            .create_async()
            .await;
        let _thing = server
            .mock("GET", "/api/v1/things/1")
            .with_body(r#"{"id":"1","name":"Engineering"}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "id", "secret").unwrap();
        let _: Thing = client.get("/api/v1/things/1").await.unwrap();
        let _: Thing = client.get("/api/v1/things/1").await.unwrap();

        token.assert_async().await;
    }

    #[tokio::test]
    async fn client_reports_authentication_failure() {
        let mut server = Server::new_async().await;
        let _token = server
            .mock("POST", "/api/oauth/token")
            .with_status(401)
            .with_body("invalid_client")
            .create_async()
            .await;

        let client = Client::new(&server.url(), "id", "wrong").unwrap();
        let result: Result<Thing, _> = client.get("/api/v1/things/1").await;

        match result {
            Err(ApiError::AuthError { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "invalid_client");
            }
            other => panic!("Expected AuthError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn client_parses_structured_errors() {
        let mut server = Server::new_async().await;
        let (client, _token) = client_with_token(&mut server).await;
        let _mock = server
            .mock("GET", "/api/v1/things/9")
            .with_status(404)
            .with_body(r#"{"httpStatus":404,"errors":[{"code":"INVALID_ID","field":"id","description":"Thing with id 9 not found"}]}"#)
            .create_async()
            .await;

        let err = client.get::<Thing>("/api/v1/things/9").await.unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert!(err.is_structured());
        assert_eq!(err.detail(), "API Error (Code: 404): Thing with id 9 not found (id)");
    }

    #[tokio::test]
    async fn client_keeps_unstructured_error_bodies() {
        let mut server = Server::new_async().await;
        let (client, _token) = client_with_token(&mut server).await;
        let _mock = server
            .mock("DELETE", "/JSSResource/sites/id/3")
            .with_status(409)
            .with_body("Unable to delete site: it is in use")
            .create_async()
            .await;

        let err = client.delete("/JSSResource/sites/id/3").await.unwrap_err();

        assert_eq!(
            err.detail(),
            "API Error (Code: 409): Unable to delete site: it is in use"
        );
    }

    #[tokio::test]
    async fn client_reports_parse_errors_as_transient() {
        let mut server = Server::new_async().await;
        let (client, _token) = client_with_token(&mut server).await;
        let _mock = server
            .mock("GET", "/api/v1/things/1")
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let err = client.get::<Thing>("/api/v1/things/1").await.unwrap_err();
        assert!(matches!(err, ApiError::ParseError(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn client_strips_trailing_slash_from_base_url() {
        let mut server = Server::new_async().await;
        let _token = server
            .mock("POST", "/api/oauth/token")
            .with_body(r#"{"access_token":"t","expires_in":1200}"#)
            .create_async()
            .await;
        let mock = server
            .mock("GET", "/api/v1/things/1")
            .with_body(r#"{"id":"1","name":"x"}"#)
            .create_async()
            .await;

        let client = Client::new(&format!("{}/", server.url()), "id", "secret").unwrap();
        let _: Thing = client.get("/api/v1/things/1").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_handles_network_errors() {
        let client = Client::new("http://127.0.0.1:1", "id", "secret").unwrap();

        let err = client.get::<Thing>("/api/v1/things/1").await.unwrap_err();
        assert!(matches!(err, ApiError::RequestError(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn client_rejects_invalid_urls() {
        assert!(matches!(
            Client::new("not a url", "id", "secret"),
            Err(ApiError::InvalidConfig(_))
        ));
        assert!(matches!(
            Client::new("ftp://jamf.example.com", "id", "secret"),
            Err(ApiError::InvalidConfig(_))
        ));
    }
}
