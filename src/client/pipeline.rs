// The pipeline proper. Outbound: attach the cached bearer credential.
// Inbound: a 401 on a fresh request triggers exactly one session refresh and
// one replay; everything else passes through untouched.

use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode, Url};
use tracing::{debug, warn};

use super::error::ApiError;
use super::request::{ApiResponse, PendingRequest, ReplayState};
use crate::auth::store::SessionStore;
use crate::config::ClientConfig;

type ExpiredHook = Arc<dyn Fn() + Send + Sync>;

pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<SessionStore>,
    expired_hook: RwLock<Option<ExpiredHook>>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: Arc<SessionStore>) -> Self {
        Self {
            http: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
            expired_hook: RwLock::new(None),
        }
    }

    /// Register the navigation-to-login side effect invoked on terminal
    /// authentication failure.
    pub fn on_session_expired(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.expired_hook.write() = Some(Arc::new(hook));
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Send a request through both pipeline stages.
    pub async fn execute(&self, mut request: PendingRequest) -> Result<ApiResponse, ApiError> {
        let response = self.send_once(&request).await?;
        if response.status != StatusCode::UNAUTHORIZED || request.state == ReplayState::Replayed {
            return Ok(response);
        }

        // Credential rejected on a fresh request: one refresh, one replay.
        // Concurrent expired requests each refresh on their own; the
        // identity service treats refresh as idempotent.
        warn!(
            "request rejected for expiry method={} path={}",
            request.method, request.path
        );
        match self.session.refresh().await {
            Ok(_) => {
                request.state = ReplayState::Replayed;
                let replayed = self.send_once(&request).await?;
                if replayed.status == StatusCode::UNAUTHORIZED {
                    // The renewed credential was rejected as well. No second
                    // refresh is ever attempted.
                    return Err(self.fail_authentication());
                }
                Ok(replayed)
            }
            Err(e) => {
                warn!("session refresh failed: {}", e);
                Err(self.fail_authentication())
            }
        }
    }

    /// One trip through the transport. The credential is re-read from the
    /// store on every call, so a replay picks up the renewed token.
    async fn send_once(&self, request: &PendingRequest) -> Result<ApiResponse, ApiError> {
        let url = compose_url(&self.base_url, request)?;
        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .headers(request.headers.clone());
        if let Some(credential) = self.session.credential() {
            builder = builder.bearer_auth(credential.token());
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        debug!(
            "api response method={} path={} status={}",
            request.method,
            request.path,
            status.as_u16()
        );
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }

    fn fail_authentication(&self) -> ApiError {
        self.session.clear_session();
        let hook = self.expired_hook.read().clone();
        if let Some(hook) = hook {
            hook();
        }
        ApiError::AuthenticationExpired
    }
}

/// Build the absolute request URL from the configured base, the request
/// path, and its query pairs.
fn compose_url(base_url: &str, request: &PendingRequest) -> Result<Url, ApiError> {
    let mut url = Url::parse(&format!("{}{}", base_url, request.path))
        .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
    if !request.query.is_empty() {
        url.query_pairs_mut().extend_pairs(
            request
                .query
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );
    }
    Ok(url)
}
