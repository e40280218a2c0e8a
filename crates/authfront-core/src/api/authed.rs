//! Authenticated requests with a single transparent refresh.
//!
//! `AuthedClient::send` attaches the stored bearer token and, when the server
//! answers 401, exchanges the refresh cookie for a new token and replays the
//! request exactly once. A failed refresh clears the session and reports
//! `ApiError::SessionExpired`.
//!
//! Refreshes are serialized: a request that hit 401 while another refresh was
//! in flight reuses that refresh's outcome instead of starting its own.

use std::sync::Arc;

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::models::RefreshResponse;
use crate::session::Session;

use super::{ApiClient, ApiError};

/// A request that can be issued more than once.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub method: Method,
    /// Path relative to the backend origin, or an absolute URL
    pub target: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl AuthRequest {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::POST, target)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Request wrapper that carries the session's bearer token.
/// Clone is cheap and clones share the refresh lock.
#[derive(Clone)]
pub struct AuthedClient {
    api: ApiClient,
    session: Session,
    refresh_lock: Arc<Mutex<()>>,
}

impl AuthedClient {
    /// Wrap `api` for `session`, loading any refresh cookie an earlier process saved.
    pub fn new(api: ApiClient, session: Session) -> Self {
        api.restore_cookies(&session);
        Self {
            api,
            session,
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Issue a request with the stored token, refreshing and retrying once on 401.
    ///
    /// Responses other than 401 are returned unmodified, and so is the retry's
    /// response whatever its status.
    pub async fn send(&self, request: &AuthRequest) -> Result<Response, ApiError> {
        let sent_with = self.session.token();
        let response = self.dispatch(request, sent_with.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!(path = %request.target, "Request unauthorized, attempting refresh");
        let token = self.recover(sent_with).await?;

        let retry = self.dispatch(request, token.as_deref()).await?;
        info!(path = %request.target, status = %retry.status(), "Retried request after refresh");
        Ok(retry)
    }

    /// Merge caller headers with the JSON default and the bearer token.
    ///
    /// A caller-supplied Content-Type wins. Authorization always reflects the
    /// store: it is replaced by the token, or removed when there is none.
    fn build_headers(request: &AuthRequest, token: Option<&str>) -> Result<HeaderMap, ApiError> {
        let mut headers = request.headers.clone();
        headers.remove(header::AUTHORIZATION);
        if !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::InvalidToken)?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn dispatch(
        &self,
        request: &AuthRequest,
        token: Option<&str>,
    ) -> Result<Response, ApiError> {
        let url = self.api.url(&request.target);
        let headers = Self::build_headers(request, token)?;

        let mut builder = self
            .api
            .http()
            .request(request.method.clone(), &url)
            .headers(headers);
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }

    /// Obtain the token to retry with, refreshing if nobody else already did.
    async fn recover(&self, sent_with: Option<String>) -> Result<Option<String>, ApiError> {
        let _guard = self.refresh_lock.lock().await;

        // Another request refreshed (or gave up) while this one was in flight
        let current = self.session.token();
        if current != sent_with {
            debug!("Token changed since request was sent, skipping refresh");
            return match current {
                Some(token) => Ok(Some(token)),
                None => Err(ApiError::SessionExpired),
            };
        }

        let response = match self.api.refresh().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Token refresh request failed");
                self.expire();
                return Err(ApiError::SessionExpired);
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "Token refresh rejected");
            self.expire();
            return Err(ApiError::SessionExpired);
        }

        let body: RefreshResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Refresh response was not JSON, keeping current token");
                RefreshResponse::default()
            }
        };

        match body.token.filter(|t| !t.is_empty()) {
            Some(token) => {
                self.session.set_token(&token)?;
                // The server may have rotated the refresh cookie
                if let Err(e) = self.api.save_cookies(&self.session) {
                    warn!(error = %e, "Failed to save refresh cookie");
                }
                info!("Access token refreshed");
                Ok(Some(token))
            }
            None => Ok(self.session.token()),
        }
    }

    fn expire(&self) {
        if let Err(e) = self.session.clear() {
            warn!(error = %e, "Failed to clear expired session");
        }
    }
}
