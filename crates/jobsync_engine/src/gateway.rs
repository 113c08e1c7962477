use std::sync::{Arc, Mutex, PoisonError};

use jobsync_core::{ErrorKind, SyncError};
use jobsync_logging::{sync_debug, sync_trace, sync_warn};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use serde_json::{json, Value};

use crate::ClientSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the configured base URL, e.g. `/scraping/jobs/active`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Parsed JSON body, or `Null` when the body is empty or not JSON.
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Every network call of the engine goes through this seam.
///
/// Implementations attach credentials and own the refresh-and-retry policy;
/// callers only ever see `AuthRequired` once that policy has given up.
#[async_trait::async_trait]
pub trait AuthGateway: Send + Sync {
    async fn call(&self, request: &ApiRequest) -> Result<ApiResponse, SyncError>;
}

pub trait CredentialStore: Send + Sync {
    fn access_token(&self) -> Option<String>;
    fn refresh_token(&self) -> Option<String>;
    fn store(&self, access: String, refresh: Option<String>);
}

#[derive(Debug, Default)]
struct Tokens {
    access: Option<String>,
    refresh: Option<String>,
}

/// Process-local credential holder.
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    tokens: Mutex<Tokens>,
}

impl MemoryCredentials {
    pub fn new(access: Option<String>, refresh: Option<String>) -> Self {
        Self {
            tokens: Mutex::new(Tokens { access, refresh }),
        }
    }
}

impl CredentialStore for MemoryCredentials {
    fn access_token(&self) -> Option<String> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .access
            .clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .refresh
            .clone()
    }

    fn store(&self, access: String, refresh: Option<String>) {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        tokens.access = Some(access);
        if refresh.is_some() {
            tokens.refresh = refresh;
        }
    }
}

pub struct ReqwestGateway {
    client: reqwest::Client,
    base_url: String,
    refresh_path: String,
    trailing_slash: bool,
    credentials: Arc<dyn CredentialStore>,
    /// Serializes credential refreshes so concurrent 401s share one attempt.
    refresh_lock: tokio::sync::Mutex<()>,
}

impl ReqwestGateway {
    pub fn new(
        settings: &ClientSettings,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| SyncError::network(err.to_string()))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            refresh_path: settings.refresh_path.clone(),
            trailing_slash: settings.trailing_slash,
            credentials,
            refresh_lock: tokio::sync::Mutex::new(()),
        })
    }

    fn url_for(&self, path: &str, query: &[(String, String)]) -> Result<Url, SyncError> {
        let mut full = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        if self.trailing_slash && !full.ends_with('/') {
            full.push('/');
        }
        let mut url = Url::parse(&full).map_err(|err| {
            SyncError::new(ErrorKind::Validation, format!("invalid url {full}: {err}"))
        })?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn send_once(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<ApiResponse, SyncError> {
        let url = self.url_for(&request.path, &request.query)?;
        sync_trace!("{:?} {}", request.method, url);

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };
        let mut builder = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json");
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            let bytes = serde_json::to_vec(body)
                .map_err(|err| SyncError::new(ErrorKind::Validation, err.to_string()))?;
            builder = builder.header(CONTENT_TYPE, "application/json").body(bytes);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        Ok(ApiResponse { status, body })
    }

    /// Attempts one credential refresh. `stale` is the access token the failed
    /// request was sent with; if another caller already rotated it, the
    /// refresh is skipped and the caller simply replays.
    async fn refresh_credentials(&self, stale: Option<&str>) -> bool {
        let _guard = self.refresh_lock.lock().await;

        let current = self.credentials.access_token();
        if current.is_some() && current.as_deref() != stale {
            sync_debug!("Access token already rotated, replaying");
            return true;
        }

        let Some(refresh) = self.credentials.refresh_token() else {
            sync_debug!("No refresh token available");
            return false;
        };

        let request = ApiRequest::post(self.refresh_path.clone(), json!({ "refresh": refresh }));
        let response = match self.send_once(&request, None).await {
            Ok(response) => response,
            Err(err) => {
                sync_warn!("Credential refresh failed: {}", err);
                return false;
            }
        };
        if !response.is_success() {
            sync_warn!("Credential refresh rejected with status {}", response.status);
            return false;
        }

        let access = response.body.get("access").and_then(Value::as_str);
        let rotated = response
            .body
            .get("refresh")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned);
        match access {
            Some(access) => {
                self.credentials.store(access.to_string(), rotated);
                true
            }
            None => {
                sync_warn!("Credential refresh response carried no access token");
                false
            }
        }
    }
}

#[async_trait::async_trait]
impl AuthGateway for ReqwestGateway {
    async fn call(&self, request: &ApiRequest) -> Result<ApiResponse, SyncError> {
        let token = self.credentials.access_token();
        let response = self.send_once(request, token.as_deref()).await?;
        if response.status != StatusCode::UNAUTHORIZED.as_u16() {
            return Ok(response);
        }

        if !self.refresh_credentials(token.as_deref()).await {
            return Err(auth_required(&request.path));
        }

        // Exactly one replay with whatever credential the refresh produced.
        let token = self.credentials.access_token();
        let replay = self.send_once(request, token.as_deref()).await?;
        if replay.status == StatusCode::UNAUTHORIZED.as_u16() {
            return Err(auth_required(&request.path));
        }
        Ok(replay)
    }
}

fn auth_required(path: &str) -> SyncError {
    SyncError::new(ErrorKind::AuthRequired, format!("{path} rejected the credentials"))
}

fn map_reqwest_error(err: reqwest::Error) -> SyncError {
    if err.is_timeout() {
        return SyncError::network(format!("timeout: {err}"));
    }
    SyncError::network(err.to_string())
}
