//! HTTP client module for the authentication API.
//!
//! `ApiClient` talks to the `/api/auth/*` endpoints directly. `AuthedClient`
//! wraps it for requests that carry the stored bearer token: on a 401 it
//! exchanges the refresh cookie for a new token once, then replays the request.

pub mod authed;
pub mod client;
pub mod error;

pub use authed::{AuthRequest, AuthedClient};
pub use client::ApiClient;
pub use error::ApiError;
