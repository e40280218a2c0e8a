//! API client for the authentication backend.
//!
//! Endpoint methods return the raw `reqwest::Response`; callers decide what a
//! status means (a failed `/me` clears the session, a failed login shows the
//! server's message, and so on).
//!
//! The refresh cookie lives in the client's cookie jar. `save_cookies` and
//! `restore_cookies` carry the jar through the session store so a restarted
//! process can still refresh, the way a browser keeps its cookies across reloads.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::{header, Client, Response, Url};
use tracing::{debug, warn};

use crate::models::{LoginRequest, RegisterRequest};
use crate::session::Session;
use crate::store::StoreError;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

pub const ME_PATH: &str = "/api/auth/me";
pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REGISTER_PATH: &str = "/api/auth/register";
pub const REFRESH_PATH: &str = "/api/auth/refresh";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// API client for the auth backend.
/// Clone is cheap - reqwest::Client uses Arc internally, and clones share
/// the cookie jar holding the refresh cookie.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    origin: Url,
    jar: Arc<Jar>,
}

impl ApiClient {
    /// Create a new API client for the given origin
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let origin = Url::parse(&base_url)
            .map_err(|e| ApiError::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;

        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .cookie_provider(jar.clone())
            .build()?;

        Ok(Self {
            client,
            base_url,
            origin,
            jar,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    /// Resolve a target against the base origin. Absolute URLs pass through.
    pub fn url(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else if target.starts_with('/') {
            format!("{}{}", self.base_url, target)
        } else {
            format!("{}/{}", self.base_url, target)
        }
    }

    /// Cookie header the jar would send to the backend, if it holds any cookies
    pub fn cookie_header(&self) -> Option<String> {
        self.jar
            .cookies(&self.origin)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }

    /// Persist the jar's backend cookies into the session
    pub fn save_cookies(&self, session: &Session) -> Result<(), StoreError> {
        match self.cookie_header() {
            Some(cookies) => session.set_cookies(&cookies),
            None => Ok(()),
        }
    }

    /// Load cookies saved by an earlier process back into the jar
    pub fn restore_cookies(&self, session: &Session) {
        let Some(saved) = session.cookies() else {
            return;
        };
        let mut restored = 0;
        for pair in saved.split(';').map(str::trim).filter(|p| p.contains('=')) {
            self.jar.add_cookie_str(pair, &self.origin);
            restored += 1;
        }
        if restored == 0 {
            warn!("Saved cookies had no name=value pairs, ignoring");
        } else {
            debug!(count = restored, "Restored saved cookies");
        }
    }

    /// POST credentials to the login endpoint
    pub async fn login(&self, body: &LoginRequest) -> Result<Response, ApiError> {
        let url = self.url(LOGIN_PATH);
        debug!(url = %url, "Sending login request");
        Ok(self.client.post(&url).json(body).send().await?)
    }

    /// POST a new account to the registration endpoint
    pub async fn register(&self, body: &RegisterRequest) -> Result<Response, ApiError> {
        let url = self.url(REGISTER_PATH);
        debug!(url = %url, "Sending registration request");
        Ok(self.client.post(&url).json(body).send().await?)
    }

    /// Validate a token against the identity endpoint
    pub async fn me(&self, token: &str) -> Result<Response, ApiError> {
        let url = self.url(ME_PATH);
        Ok(self
            .client
            .get(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .bearer_auth(token)
            .send()
            .await?)
    }

    /// Exchange the refresh cookie for a new bearer token. Sends no Authorization header.
    pub async fn refresh(&self) -> Result<Response, ApiError> {
        let url = self.url(REFRESH_PATH);
        debug!(url = %url, "Requesting token refresh");
        Ok(self.client.post(&url).send().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_url_joins_paths() {
        let api = ApiClient::new("https://auth.example/").unwrap();
        assert_eq!(api.base_url(), "https://auth.example");
        assert_eq!(api.url("/api/auth/me"), "https://auth.example/api/auth/me");
        assert_eq!(api.url("api/items"), "https://auth.example/api/items");
        assert_eq!(api.url("https://other.example/x"), "https://other.example/x");
    }

    #[tokio::test]
    async fn test_login_posts_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .and(body_json(json!({"email": "a@b.co", "password": "secret"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t1"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let resp = api
            .login(&LoginRequest {
                email: "a@b.co".to_string(),
                password: "secret".to_string(),
            })
            .await
            .unwrap();
        assert!(resp.status().is_success());
    }

    #[tokio::test]
    async fn test_me_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ME_PATH))
            .and(header("Authorization", "Bearer t1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": {}})))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let resp = api.me("t1").await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);
    }

    #[tokio::test]
    async fn test_refresh_carries_cookie_from_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Set-Cookie", "refreshToken=r1; Path=/; HttpOnly")
                    .set_body_json(json!({"token": "t1"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .and(header("Cookie", "refreshToken=r1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t2"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        api.login(&LoginRequest {
            email: "a@b.co".to_string(),
            password: "secret".to_string(),
        })
        .await
        .unwrap();

        let resp = api.refresh().await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ApiError::InvalidBaseUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_saved_cookies_restore_into_new_client() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Set-Cookie", "refreshToken=r1; Path=/; HttpOnly")
                    .set_body_json(json!({"token": "t1"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .and(header("Cookie", "refreshToken=r1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t2"})))
            .expect(1)
            .mount(&server)
            .await;

        let session = Session::new(Arc::new(MemoryStore::new()));
        let first = ApiClient::new(&server.uri()).unwrap();
        first
            .login(&LoginRequest {
                email: "a@b.co".to_string(),
                password: "secret".to_string(),
            })
            .await
            .unwrap();
        first.save_cookies(&session).unwrap();
        assert_eq!(session.cookies().as_deref(), Some("refreshToken=r1"));

        let second = ApiClient::new(&server.uri()).unwrap();
        assert_eq!(second.cookie_header(), None);
        second.restore_cookies(&session);
        assert_eq!(second.cookie_header().as_deref(), Some("refreshToken=r1"));

        let resp = second.refresh().await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        server.verify().await;
    }
}
