//! Route guard for protected views.
//!
//! A protected view starts in `GuardState::Checking`, shows a placeholder, and
//! moves to `Authenticated` or `Unauthenticated` once `RouteGuard::check`
//! finishes. The guard never refreshes: any failure of the identity check
//! clears the session and sends the user to login.

use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::models::{MeResponse, User};
use crate::route::Route;
use crate::session::Session;

const CHECKING_PLACEHOLDER: &str = "Checking authentication...";

/// Result of one identity check
#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome {
    /// Token accepted; the freshest profile known, if any
    Authenticated(Option<User>),
    Unauthenticated,
}

/// Guard state of a protected view
#[derive(Debug, Clone, PartialEq)]
pub enum GuardState {
    Checking,
    Authenticated(Option<User>),
    Unauthenticated,
}

impl GuardState {
    /// Every protected view begins by checking
    pub fn start() -> Self {
        GuardState::Checking
    }

    /// Apply a check result. Only `Checking` transitions; settled states ignore late results.
    pub fn resolve(self, outcome: GuardOutcome) -> Self {
        match self {
            GuardState::Checking => match outcome {
                GuardOutcome::Authenticated(user) => GuardState::Authenticated(user),
                GuardOutcome::Unauthenticated => GuardState::Unauthenticated,
            },
            settled => settled,
        }
    }

    pub fn is_checking(&self) -> bool {
        matches!(self, GuardState::Checking)
    }

    /// Where to send the user instead of rendering, if anywhere
    pub fn redirect(&self) -> Option<Route> {
        match self {
            GuardState::Unauthenticated => Some(Route::Login),
            _ => None,
        }
    }

    pub fn placeholder() -> &'static str {
        CHECKING_PLACEHOLDER
    }
}

/// Validates the stored token against the identity endpoint
#[derive(Clone)]
pub struct RouteGuard {
    api: ApiClient,
    session: Session,
}

impl RouteGuard {
    pub fn new(api: ApiClient, session: Session) -> Self {
        Self { api, session }
    }

    pub async fn check(&self) -> GuardOutcome {
        let Some(token) = self.session.token() else {
            debug!("No stored token");
            return GuardOutcome::Unauthenticated;
        };

        let response = match self.api.me(&token).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Auth check failed");
                return self.reject();
            }
        };

        if !response.status().is_success() {
            debug!(status = %response.status(), "Token rejected by identity endpoint");
            return self.reject();
        }

        let body: MeResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Identity response was not valid JSON");
                return self.reject();
            }
        };

        match body.user {
            Some(user) => {
                if let Err(e) = self.session.set_user(&user) {
                    warn!(error = %e, "Failed to cache user profile");
                }
                GuardOutcome::Authenticated(Some(user))
            }
            None => GuardOutcome::Authenticated(self.session.user()),
        }
    }

    fn reject(&self) -> GuardOutcome {
        if let Err(e) = self.session.clear() {
            warn!(error = %e, "Failed to clear session");
        }
        GuardOutcome::Unauthenticated
    }
}
