//! Login, registration, dashboard and logout flows.
//!
//! Each flow validates locally, calls the auth API, updates the session, and
//! tells the front-end which route to show next. Front-ends own rendering and
//! the "submission in progress" flag; flows own everything else.

use std::time::Duration;

use reqwest::Response;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::client::ME_PATH;
use crate::api::{ApiClient, ApiError, AuthRequest, AuthedClient};
use crate::guard::RouteGuard;
use crate::models::{LoginResponse, MeResponse, RegisterResponse, User};
use crate::route::Route;
use crate::session::Session;
use crate::store::StoreError;
use crate::validate::{FieldErrors, LoginForm, RegisterForm};

/// Delay between a successful registration and the switch to the login form
pub const REGISTER_REDIRECT_DELAY: Duration = Duration::from_millis(1200);

const LOGIN_SUCCESS: &str = "Login successful!";
const LOGIN_FAILED: &str = "Login failed.";
const REGISTER_SUCCESS: &str = "Registration successful! Redirecting to login...";
const REGISTER_FAILED: &str = "Registration failed.";
const NETWORK_ERROR: &str = "Network error. Please try again.";
const DASHBOARD_FAILED: &str = "Failed to load dashboard. Please try again.";
const SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";
const STORAGE_FAILED: &str = "Could not save your session. Please try again.";

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Form has invalid fields")]
    Validation(FieldErrors),

    #[error("{0}")]
    Rejected(String),

    #[error("Network error")]
    Network(#[source] ApiError),

    #[error("Session expired")]
    SessionExpired,

    #[error("Session storage failed: {0}")]
    Storage(#[from] StoreError),
}

impl FlowError {
    /// Message for the banner under the form. Validation errors are shown inline instead.
    pub fn user_message(&self) -> Option<String> {
        match self {
            FlowError::Validation(_) => None,
            FlowError::Rejected(message) => Some(message.clone()),
            FlowError::Network(_) => Some(NETWORK_ERROR.to_string()),
            FlowError::SessionExpired => Some(SESSION_EXPIRED.to_string()),
            FlowError::Storage(_) => Some(STORAGE_FAILED.to_string()),
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            FlowError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginSuccess {
    pub message: String,
    pub user: Option<User>,
    pub next: Route,
}

#[derive(Debug, Clone)]
pub struct RegisterSuccess {
    pub message: String,
    pub redirect_after: Duration,
    pub next: Route,
}

/// Result of the dashboard's profile load
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardLoad {
    Loaded(Option<User>),
    Redirect(Route),
    /// The request could not complete; the cached profile is still shown
    Failed { user: Option<User>, message: String },
}

/// Status and parsed body of an auth endpoint response
struct Reply<T> {
    ok: bool,
    body: T,
}

/// Read a response body as `T`. Non-JSON bodies read as `T::default()`.
async fn read_reply<T: DeserializeOwned + Default>(response: Response) -> Result<Reply<T>, FlowError> {
    let ok = response.status().is_success();
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| FlowError::Network(e.into()))?;
    let body = serde_json::from_str(&text).unwrap_or_else(|e| {
        debug!(status = %status, error = %e, "Response body is not the expected JSON");
        T::default()
    });
    Ok(Reply { ok, body })
}

fn message_or(message: Option<String>, default: &str) -> String {
    message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Authentication flows over one API client and session
#[derive(Clone)]
pub struct AuthFlows {
    api: ApiClient,
    session: Session,
    authed: AuthedClient,
    guard: RouteGuard,
}

impl AuthFlows {
    pub fn new(api: ApiClient, session: Session) -> Self {
        let authed = AuthedClient::new(api.clone(), session.clone());
        let guard = RouteGuard::new(api.clone(), session.clone());
        Self {
            api,
            session,
            authed,
            guard,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }

    /// Validate, sign in, and persist the returned token, profile and refresh cookie.
    pub async fn login(&self, form: &LoginForm) -> Result<LoginSuccess, FlowError> {
        form.validate().map_err(FlowError::Validation)?;

        let response = self
            .api
            .login(&form.to_request())
            .await
            .map_err(|e| {
                warn!(error = %e, "Login request failed");
                FlowError::Network(e)
            })?;
        let reply: Reply<LoginResponse> = read_reply(response).await?;

        if !reply.ok {
            return Err(FlowError::Rejected(message_or(reply.body.message, LOGIN_FAILED)));
        }

        let LoginResponse {
            token,
            user,
            message,
        } = reply.body;
        self.session.save_login(token.as_deref(), user.as_ref())?;
        if let Err(e) = self.api.save_cookies(&self.session) {
            warn!(error = %e, "Failed to save refresh cookie");
        }
        info!(has_token = token.is_some(), "Login successful");

        Ok(LoginSuccess {
            message: message_or(message, LOGIN_SUCCESS),
            user,
            next: Route::Dashboard,
        })
    }

    /// Validate and create an account. Nothing is stored locally.
    pub async fn register(&self, form: &RegisterForm) -> Result<RegisterSuccess, FlowError> {
        form.validate().map_err(FlowError::Validation)?;

        let response = self
            .api
            .register(&form.to_request())
            .await
            .map_err(|e| {
                warn!(error = %e, "Registration request failed");
                FlowError::Network(e)
            })?;
        let reply: Reply<RegisterResponse> = read_reply(response).await?;

        if !reply.ok {
            return Err(FlowError::Rejected(message_or(
                reply.body.message,
                REGISTER_FAILED,
            )));
        }

        info!("Registration successful");
        Ok(RegisterSuccess {
            message: message_or(reply.body.message, REGISTER_SUCCESS),
            redirect_after: REGISTER_REDIRECT_DELAY,
            next: Route::Login,
        })
    }

    /// Fetch the signed-in user's profile for the dashboard.
    ///
    /// Goes through `AuthedClient`, so an expired token gets one refresh.
    pub async fn load_dashboard(&self) -> DashboardLoad {
        if !self.session.is_present() {
            return DashboardLoad::Redirect(Route::Login);
        }

        let response = match self.authed.send(&AuthRequest::get(ME_PATH)).await {
            Ok(response) => response,
            Err(ApiError::SessionExpired) => {
                info!("Session expired while loading dashboard");
                return DashboardLoad::Redirect(Route::Login);
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch user");
                return DashboardLoad::Failed {
                    user: self.session.user(),
                    message: DASHBOARD_FAILED.to_string(),
                };
            }
        };

        if !response.status().is_success() {
            debug!(status = %response.status(), "Profile request rejected");
            self.clear_session();
            return DashboardLoad::Redirect(Route::Login);
        }

        match response.json::<MeResponse>().await {
            Ok(MeResponse { user: Some(user) }) => {
                if let Err(e) = self.session.set_user(&user) {
                    warn!(error = %e, "Failed to cache user profile");
                }
                DashboardLoad::Loaded(Some(user))
            }
            Ok(MeResponse { user: None }) => DashboardLoad::Loaded(self.session.user()),
            Err(e) => {
                warn!(error = %e, "Failed to parse profile response");
                DashboardLoad::Failed {
                    user: self.session.user(),
                    message: DASHBOARD_FAILED.to_string(),
                }
            }
        }
    }

    /// Forget the session. Always lands on the login route.
    pub fn logout(&self) -> Route {
        self.clear_session();
        info!("Logged out");
        Route::Login
    }

    fn clear_session(&self) {
        if let Err(e) = self.session.clear() {
            warn!(error = %e, "Failed to clear session");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::api::client::{LOGIN_PATH, REFRESH_PATH, REGISTER_PATH};
    use crate::store::{FileStore, MemoryStore, SessionStore, StoreKey};
    use crate::validate::Field;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn flows_for(base_url: &str) -> (AuthFlows, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let session = Session::new(store.clone());
        (
            AuthFlows::new(ApiClient::new(base_url).unwrap(), session),
            store,
        )
    }

    fn login_form(email: &str, password: &str) -> LoginForm {
        LoginForm {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn register_form(name: &str, email: &str, password: &str) -> RegisterForm {
        RegisterForm {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    // -------------------------------------------------------------------------
    // Login
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_login_invalid_email_makes_no_request() {
        let server = MockServer::start().await;
        let (flows, _) = flows_for(&server.uri());

        let err = flows.login(&login_form("bad", "password")).await.unwrap_err();
        let errors = err.field_errors().unwrap();
        assert_eq!(errors.get(Field::Email), Some("Invalid email format."));
        assert!(err.user_message().is_none());

        let received = server.received_requests().await.unwrap();
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn test_login_success_persists_token_and_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .and(body_json(json!({"email": "a@b.co", "password": "pw"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"token": "t1", "user": {"name": "A"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (flows, _) = flows_for(&server.uri());
        let success = flows.login(&login_form("a@b.co", "pw")).await.unwrap();

        assert_eq!(success.next, Route::Dashboard);
        assert_eq!(success.message, "Login successful!");
        assert_eq!(success.user.and_then(|u| u.name).as_deref(), Some("A"));
        assert_eq!(flows.session().token().as_deref(), Some("t1"));
        assert_eq!(
            flows.session().user().and_then(|u| u.name),
            Some("A".to_string())
        );
        server.verify().await;
    }

    #[tokio::test]
    async fn test_login_uses_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"token": "t1", "message": "Welcome back"})),
            )
            .mount(&server)
            .await;

        let (flows, _) = flows_for(&server.uri());
        let success = flows.login(&login_form("a@b.co", "pw")).await.unwrap();
        assert_eq!(success.message, "Welcome back");
    }

    #[tokio::test]
    async fn test_login_rejected_shows_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"message": "Invalid credentials"})),
            )
            .mount(&server)
            .await;

        let (flows, store) = flows_for(&server.uri());
        let err = flows.login(&login_form("a@b.co", "pw")).await.unwrap_err();
        assert_eq!(err.user_message().as_deref(), Some("Invalid credentials"));
        assert_eq!(store.get(StoreKey::Token).unwrap(), None);
    }

    #[tokio::test]
    async fn test_login_rejected_without_json_uses_default() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&server)
            .await;

        let (flows, _) = flows_for(&server.uri());
        let err = flows.login(&login_form("a@b.co", "pw")).await.unwrap_err();
        assert_eq!(err.user_message().as_deref(), Some("Login failed."));
    }

    #[tokio::test]
    async fn test_login_network_error() {
        let (flows, _) = flows_for("http://127.0.0.1:9");
        let err = flows.login(&login_form("a@b.co", "pw")).await.unwrap_err();
        assert!(matches!(err, FlowError::Network(_)));
        assert_eq!(
            err.user_message().as_deref(),
            Some("Network error. Please try again.")
        );
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_register_success_redirects_after_delay() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REGISTER_PATH))
            .and(body_json(json!({"name": "Ada", "email": "a@b.co", "password": "12345678"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let (flows, store) = flows_for(&server.uri());
        let success = flows
            .register(&register_form("Ada", "a@b.co", "12345678"))
            .await
            .unwrap();

        assert_eq!(
            success.message,
            "Registration successful! Redirecting to login..."
        );
        assert_eq!(success.redirect_after, Duration::from_millis(1200));
        assert_eq!(success.next, Route::Login);
        assert_eq!(store.get(StoreKey::Token).unwrap(), None);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_register_short_password_makes_no_request() {
        let server = MockServer::start().await;
        let (flows, _) = flows_for(&server.uri());

        let err = flows
            .register(&register_form("Ada", "a@b.co", "short"))
            .await
            .unwrap_err();
        assert!(err.field_errors().unwrap().get(Field::Password).is_some());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REGISTER_PATH))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({})))
            .mount(&server)
            .await;

        let (flows, _) = flows_for(&server.uri());
        let err = flows
            .register(&register_form("Ada", "a@b.co", "12345678"))
            .await
            .unwrap_err();
        assert_eq!(err.user_message().as_deref(), Some("Registration failed."));
    }

    // -------------------------------------------------------------------------
    // Dashboard
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_dashboard_without_token_redirects() {
        let server = MockServer::start().await;
        let (flows, _) = flows_for(&server.uri());
        assert_eq!(
            flows.load_dashboard().await,
            DashboardLoad::Redirect(Route::Login)
        );
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dashboard_loads_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ME_PATH))
            .and(header("Authorization", "Bearer t1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"user": {"_id": "u1", "name": "A", "email": "a@b.co"}})),
            )
            .mount(&server)
            .await;

        let (flows, _) = flows_for(&server.uri());
        flows.session().set_token("t1").unwrap();

        match flows.load_dashboard().await {
            DashboardLoad::Loaded(Some(user)) => {
                assert_eq!(user.greeting(), "Welcome, A");
                assert_eq!(user.id_display(), "u1");
            }
            other => panic!("unexpected load: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dashboard_refreshes_expired_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ME_PATH))
            .and(header("Authorization", "Bearer old"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "new"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(ME_PATH))
            .and(header("Authorization", "Bearer new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": {"name": "A"}})))
            .expect(1)
            .mount(&server)
            .await;

        let (flows, _) = flows_for(&server.uri());
        flows.session().set_token("old").unwrap();

        assert!(matches!(
            flows.load_dashboard().await,
            DashboardLoad::Loaded(Some(_))
        ));
        assert_eq!(flows.session().token().as_deref(), Some("new"));
        server.verify().await;
    }

    #[tokio::test]
    async fn test_dashboard_expired_session_redirects_and_clears() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ME_PATH))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let (flows, store) = flows_for(&server.uri());
        flows
            .session()
            .save_login(Some("old"), Some(&User::default()))
            .unwrap();

        assert_eq!(
            flows.load_dashboard().await,
            DashboardLoad::Redirect(Route::Login)
        );
        assert_eq!(store.get(StoreKey::Token).unwrap(), None);
        assert_eq!(store.get(StoreKey::User).unwrap(), None);
    }

    #[tokio::test]
    async fn test_dashboard_network_failure_keeps_cached_user() {
        let (flows, _) = flows_for("http://127.0.0.1:9");
        let cached = User {
            name: Some("Cached".to_string()),
            ..User::default()
        };
        flows.session().save_login(Some("t1"), Some(&cached)).unwrap();

        assert_eq!(
            flows.load_dashboard().await,
            DashboardLoad::Failed {
                user: Some(cached),
                message: "Failed to load dashboard. Please try again.".to_string(),
            }
        );
        // Session kept: the failure was not an authentication failure
        assert!(flows.session().is_present());
    }

    // -------------------------------------------------------------------------
    // Restart
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_refresh_after_restart_uses_saved_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Set-Cookie", "refreshToken=r1; Path=/; HttpOnly")
                    .set_body_json(json!({"token": "t1", "user": {"name": "A"}})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .and(header("Cookie", "refreshToken=r1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t2"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(ME_PATH))
            .and(header("Authorization", "Bearer t1"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(ME_PATH))
            .and(header("Authorization", "Bearer t2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": {"name": "A"}})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = std::env::temp_dir().join(format!("authfront-flows-restart-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        // First process signs in and exits
        {
            let session = Session::new(Arc::new(FileStore::new(dir.clone())));
            let flows = AuthFlows::new(ApiClient::new(&server.uri()).unwrap(), session);
            flows.login(&login_form("a@b.co", "password")).await.unwrap();
        }

        // Second process starts from disk only
        let store = Arc::new(FileStore::new(dir.clone()));
        let session = Session::new(store.clone());
        let client = AuthedClient::new(ApiClient::new(&server.uri()).unwrap(), session.clone());
        let resp = client.send(&AuthRequest::get(ME_PATH)).await.unwrap();

        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(session.token().as_deref(), Some("t2"));
        assert!(store.get(StoreKey::Cookies).unwrap().is_some());
        server.verify().await;

        let _ = std::fs::remove_dir_all(&dir);
    }

    // -------------------------------------------------------------------------
    // Logout
    // -------------------------------------------------------------------------

    #[test]
    fn test_logout_clears_both_keys() {
        let (flows, store) = flows_for("http://127.0.0.1:9");
        flows
            .session()
            .save_login(Some("t1"), Some(&User::default()))
            .unwrap();

        assert_eq!(flows.logout(), Route::Login);
        assert_eq!(store.get(StoreKey::Token).unwrap(), None);
        assert_eq!(store.get(StoreKey::User).unwrap(), None);

        // Logging out again still lands on login
        assert_eq!(flows.logout(), Route::Login);
    }
}
