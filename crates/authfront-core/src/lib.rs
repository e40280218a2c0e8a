//! Core library for authfront.
//!
//! Client-side authentication state for the login / registration / dashboard
//! front-end:
//!
//! - `store`: pluggable key-value persistence for the bearer token and cached profile
//! - `session`: typed access to the stored token and user
//! - `api`: HTTP client for the auth endpoints and the refresh-once request wrapper
//! - `guard`: route guard that validates the stored token before a protected view renders
//! - `flows`: login, registration, dashboard and logout orchestration
//! - `validate`: local form validation
//! - `route`: the application's routes

pub mod api;
pub mod config;
pub mod flows;
pub mod guard;
pub mod models;
pub mod route;
pub mod session;
pub mod store;
pub mod validate;

pub use api::{ApiClient, ApiError, AuthRequest, AuthedClient};
pub use config::{Config, StoreBackend};
pub use flows::{AuthFlows, DashboardLoad, FlowError, LoginSuccess, RegisterSuccess};
pub use guard::{GuardOutcome, GuardState, RouteGuard};
pub use models::User;
pub use route::Route;
pub use session::Session;
pub use store::{FileStore, KeyringStore, MemoryStore, SessionStore, StoreError, StoreKey};
pub use validate::{Field, FieldErrors, LoginForm, RegisterForm};
