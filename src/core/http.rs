//! HTTP client with bearer authentication, token refresh and transport retries.
//!
//! Requests to protected paths carry the stored access token. A 401 on such
//! a request triggers one refresh-token exchange shared by every request that
//! fails while it runs; each of them is then replayed once with the new token.

use crate::core::refresh::RefreshCoordinator;
use crate::domain::ports::SessionStore;
use crate::utils::error::{ClientError, RefreshFailure, Result};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the HTTP client
#[derive(Clone, Debug)]
pub struct HttpClientConfig {
    /// API root, e.g. "https://api.example.com/api"
    pub base_url: String,
    /// Path substrings that require an access token
    pub protected_prefixes: Vec<String>,
    /// Refresh-token exchange endpoint
    pub refresh_path: String,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Read timeout in milliseconds
    pub read_timeout_ms: u64,
    /// Extra attempts for transport errors and 5xx on GET
    pub retry_attempts: u32,
    /// Base delay of the exponential backoff
    pub retry_delay_ms: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/api".to_string(),
            protected_prefixes: default_protected_prefixes(),
            refresh_path: "/auth/token/refresh/".to_string(),
            connect_timeout_ms: 5000,
            read_timeout_ms: 30000,
            retry_attempts: 2,
            retry_delay_ms: 200,
        }
    }
}

pub fn default_protected_prefixes() -> Vec<String> {
    ["/profile/", "/visits/", "/favorites/"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

impl HttpClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Default::default()
        }
    }

    pub fn with_protected_prefixes<I, P>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.protected_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_refresh_path(mut self, path: &str) -> Self {
        self.refresh_path = path.to_string();
        self
    }

    pub fn with_timeouts(mut self, connect_ms: u64, read_ms: u64) -> Self {
        self.connect_timeout_ms = connect_ms;
        self.read_timeout_ms = read_ms;
        self
    }

    pub fn with_retry(mut self, attempts: u32, delay_ms: u64) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay_ms = delay_ms;
        self
    }
}

/// A single API call: method, path, query and optional JSON body.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post<B: Serialize>(path: impl Into<String>, body: &B) -> Result<Self> {
        let mut request = Self::new(Method::POST, path);
        request.body = Some(serde_json::to_value(body)?);
        Ok(request)
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_params<I>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.query.extend(params);
        self
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

/// HTTP client shared by every API wrapper.
pub struct AuthHttpClient<S: SessionStore> {
    client: Client,
    config: HttpClientConfig,
    session: Arc<S>,
    refresh: RefreshCoordinator,
}

impl<S: SessionStore> AuthHttpClient<S> {
    pub fn new(config: HttpClientConfig, session: Arc<S>) -> Result<Self> {
        crate::utils::validation::validate_url("api.base_url", &config.base_url)?;

        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.read_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            config,
            session,
            refresh: RefreshCoordinator::new(),
        })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<S> {
        &self.session
    }

    pub fn is_protected(&self, path: &str) -> bool {
        self.config
            .protected_prefixes
            .iter()
            .any(|prefix| path.contains(prefix.as_str()))
    }

    pub fn build_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Token to attach to `path`, if any.
    fn token_for(&self, path: &str) -> Option<String> {
        if self.is_protected(path) {
            self.session.access_token()
        } else {
            None
        }
    }

    /// Builds the outgoing request. Only protected paths get an
    /// `Authorization` header.
    pub fn build_request(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<reqwest::Request> {
        let mut builder = self
            .client
            .request(request.method.clone(), self.build_url(&request.path));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = token.filter(|_| self.is_protected(&request.path)) {
            builder = builder.bearer_auth(token);
        }
        Ok(builder.build()?)
    }

    /// Sends `request` and decodes a JSON response body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let path = request.path.clone();
        let response = self.execute(request).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| {
            warn!("Could not decode response from {}: {}", path, e);
            ClientError::Serialization(e)
        })
    }

    /// Sends `request`, discarding the response body.
    pub async fn send(&self, request: ApiRequest) -> Result<()> {
        self.execute(request).await.map(|_| ())
    }

    /// Sends `request`, replaying it once after a token refresh when a
    /// protected path answers 401.
    pub async fn execute(&self, mut request: ApiRequest) -> Result<Response> {
        let sent_with = self.token_for(&request.path);
        let response = self.dispatch(&request, sent_with.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::check_status(response, &request.path).await;
        }

        if request.retried
            || !self.is_protected(&request.path)
            || self.session.access_token().is_none()
        {
            debug!("401 from {} is not recoverable", request.path);
            return Err(ClientError::Unauthorized { path: request.path });
        }

        let token = self
            .refresh
            .token_after_refresh(
                sent_with.as_deref(),
                || self.session.access_token(),
                || self.exchange_refresh_token(),
            )
            .await?;

        request.retried = true;
        debug!("Replaying {} {} with refreshed token", request.method, request.path);
        let response = self.dispatch(&request, Some(&token)).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("Replayed request to {} was rejected again", request.path);
            return Err(ClientError::Unauthorized { path: request.path });
        }
        Self::check_status(response, &request.path).await
    }

    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> Result<Response> {
        let mut attempt = 0;
        loop {
            let outgoing = self.build_request(request, token)?;
            let can_retry = attempt < self.config.retry_attempts;

            match self.client.execute(outgoing).await {
                Ok(response)
                    if can_retry
                        && request.method == Method::GET
                        && response.status().is_server_error() =>
                {
                    warn!(
                        "{} {} answered {}, retrying",
                        request.method,
                        request.path,
                        response.status()
                    );
                }
                Ok(response) => return Ok(response),
                Err(e) if can_retry && (e.is_connect() || e.is_timeout()) => {
                    warn!("{} {} failed: {}, retrying", request.method, request.path, e);
                }
                Err(e) => return Err(e.into()),
            }

            attempt += 1;
            tokio::time::sleep(self.backoff(attempt)).await;
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.config.retry_delay_ms.saturating_mul(factor))
    }

    async fn check_status(response: Response, path: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized {
                path: path.to_string(),
            }),
            StatusCode::NOT_FOUND => Err(ClientError::NotFound {
                path: path.to_string(),
            }),
            _ => {
                let body = response.text().await.unwrap_or_default();
                debug!("Request to {} failed with status {}: {}", path, status, body);
                Err(ClientError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    /// Exchanges the stored refresh token for a new access token and stores it.
    async fn exchange_refresh_token(&self) -> std::result::Result<String, RefreshFailure> {
        let refresh_token = self
            .session
            .refresh_token()
            .ok_or_else(|| RefreshFailure::new(None, "no refresh token stored"))?;

        let url = self.build_url(&self.config.refresh_path);
        debug!("Refreshing access token at {}", url);

        let response = self
            .client
            .post(&url)
            .json(&RefreshRequest {
                refresh: &refresh_token,
            })
            .send()
            .await
            .map_err(|e| RefreshFailure::new(None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Token refresh rejected with status {}", status);
            return Err(RefreshFailure::new(Some(status.as_u16()), body));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| RefreshFailure::new(Some(status.as_u16()), e.to_string()))?;

        self.session
            .set_access_token(&refreshed.access)
            .map_err(|e| RefreshFailure::new(None, e.to_string()))?;
        if let Some(rotated) = &refreshed.refresh {
            self.session
                .set_refresh_token(rotated)
                .map_err(|e| RefreshFailure::new(None, e.to_string()))?;
        }

        info!("Access token refreshed");
        Ok(refreshed.access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::session_store::MemorySessionStore;
    use crate::domain::model::SessionState;
    use reqwest::header::AUTHORIZATION;

    fn client_with_token(token: Option<&str>) -> AuthHttpClient<MemorySessionStore> {
        let session = MemorySessionStore::with_state(SessionState {
            access_token: token.map(str::to_string),
            refresh_token: Some("refresh".to_string()),
            city_id: None,
        });
        AuthHttpClient::new(
            HttpClientConfig::new("http://localhost:8000/api"),
            Arc::new(session),
        )
        .unwrap()
    }

    #[test]
    fn test_config_builder() {
        let config = HttpClientConfig::new("https://api.example.com")
            .with_protected_prefixes(["/me/"])
            .with_refresh_path("/jwt/refresh/")
            .with_timeouts(1000, 2000)
            .with_retry(0, 10);

        assert_eq!(config.protected_prefixes, vec!["/me/".to_string()]);
        assert_eq!(config.refresh_path, "/jwt/refresh/");
        assert_eq!(config.connect_timeout_ms, 1000);
        assert_eq!(config.read_timeout_ms, 2000);
        assert_eq!(config.retry_attempts, 0);
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let result = AuthHttpClient::new(
            HttpClientConfig::new("not a url"),
            Arc::new(MemorySessionStore::new()),
        );
        assert!(matches!(
            result,
            Err(ClientError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_build_url_joins_slashes() {
        let client = client_with_token(None);
        assert_eq!(
            client.build_url("/doctors/petrov/"),
            "http://localhost:8000/api/doctors/petrov/"
        );
        assert_eq!(client.build_url("cities/"), "http://localhost:8000/api/cities/");
    }

    #[test]
    fn test_protected_prefix_is_substring_match() {
        let client = client_with_token(None);
        assert!(client.is_protected("/visits/"));
        assert!(client.is_protected("/visits/42/"));
        assert!(client.is_protected("/v2/profile/"));
        assert!(!client.is_protected("/cities/1/doctors/"));
    }

    #[test]
    fn test_protected_path_carries_bearer_token() {
        let client = client_with_token(Some("abc"));
        let token = client.token_for("/visits/");
        let request = client
            .build_request(&ApiRequest::get("/visits/"), token.as_deref())
            .unwrap();

        assert_eq!(
            request.headers().get(AUTHORIZATION).unwrap(),
            "Bearer abc"
        );
    }

    #[test]
    fn test_unprotected_path_never_carries_token() {
        let client = client_with_token(Some("abc"));
        for path in ["/cities/", "/doctors/petrov/", "/clinics/city/reviews/"] {
            assert!(client.token_for(path).is_none());
            // Even an explicit token is dropped for unprotected paths.
            let request = client.build_request(&ApiRequest::get(path), Some("abc")).unwrap();
            assert!(request.headers().get(AUTHORIZATION).is_none());
        }
    }

    #[test]
    fn test_protected_path_without_token_is_anonymous() {
        let client = client_with_token(None);
        let token = client.token_for("/profile/");
        let request = client
            .build_request(&ApiRequest::get("/profile/"), token.as_deref())
            .unwrap();
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_query_and_body_are_encoded() {
        let client = client_with_token(None);
        let request = ApiRequest::post("/auth/token/", &serde_json::json!({"username": "u"}))
            .unwrap()
            .with_query("page", 2)
            .with_params(vec![("ordering".to_string(), "-rating".to_string())]);

        let built = client.build_request(&request, None).unwrap();
        assert_eq!(built.method(), &Method::POST);
        assert_eq!(built.url().query(), Some("page=2&ordering=-rating"));
        assert!(built.body().is_some());
        assert!(!request.is_retried());
    }

    #[test]
    fn test_backoff_doubles() {
        let client = AuthHttpClient::new(
            HttpClientConfig::new("http://localhost").with_retry(3, 100),
            Arc::new(MemorySessionStore::new()),
        )
        .unwrap();
        assert_eq!(client.backoff(1), Duration::from_millis(100));
        assert_eq!(client.backoff(2), Duration::from_millis(200));
        assert_eq!(client.backoff(3), Duration::from_millis(400));
    }
}
