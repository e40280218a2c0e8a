//! Data models for the authentication API.
//!
//! `User` is the cached profile kept for display only; the server is
//! authoritative. The remaining types are the request and response bodies of
//! the `/api/auth/*` endpoints.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder shown for missing profile fields
const MISSING: &str = "—";

/// Server-assigned user identifier. Backends send either strings or numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Text(String),
    Number(i64),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Text(s) => f.write_str(s),
            UserId::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Denormalized copy of the server's user record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Fields this client does not interpret, kept so the cached copy round-trips
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    pub fn greeting(&self) -> String {
        match self.display_name() {
            Some(name) => format!("Welcome, {}", name),
            None => "Welcome".to_string(),
        }
    }

    pub fn email_display(&self) -> &str {
        self.email
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or(MISSING)
    }

    pub fn id_display(&self) -> String {
        match &self.id {
            Some(UserId::Text(s)) if s.is_empty() => MISSING.to_string(),
            Some(id) => id.to_string(),
            None => MISSING.to_string(),
        }
    }
}

// ===== Requests =====

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

// ===== Responses =====

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeResponse {
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshResponse {
    #[serde(default)]
    pub token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_accepts_mongo_style_id() {
        let user: User =
            serde_json::from_str(r#"{"_id": "64f0c", "name": "Ada", "email": "ada@example.com"}"#)
                .expect("Failed to parse user");
        assert_eq!(user.id, Some(UserId::Text("64f0c".to_string())));
        assert_eq!(user.id_display(), "64f0c");
        assert_eq!(user.greeting(), "Welcome, Ada");
        assert_eq!(user.email_display(), "ada@example.com");
    }

    #[test]
    fn test_user_numeric_id_and_extra_fields() {
        let user: User = serde_json::from_str(r#"{"id": 42, "name": "B", "role": "admin"}"#)
            .expect("Failed to parse user");
        assert_eq!(user.id_display(), "42");
        assert_eq!(user.extra.get("role"), Some(&Value::from("admin")));

        // Extra fields survive re-encoding for the cache
        let encoded = serde_json::to_value(&user).unwrap();
        assert_eq!(encoded["role"], "admin");
        assert_eq!(encoded["id"], 42);
    }

    #[test]
    fn test_user_missing_fields_display_placeholders() {
        let user = User::default();
        assert_eq!(user.greeting(), "Welcome");
        assert_eq!(user.email_display(), "—");
        assert_eq!(user.id_display(), "—");

        let blank = User {
            name: Some(String::new()),
            ..User::default()
        };
        assert_eq!(blank.greeting(), "Welcome");
    }

    #[test]
    fn test_login_response_tolerates_partial_body() {
        let resp: LoginResponse =
            serde_json::from_str(r#"{"message": "ok"}"#).expect("Failed to parse");
        assert!(resp.token.is_none());
        assert!(resp.user.is_none());
        assert_eq!(resp.message.as_deref(), Some("ok"));
    }
}
