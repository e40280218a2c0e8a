//! Local form validation for the login and registration forms.
//!
//! Validation runs before any network call; a form with errors is never submitted.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{LoginRequest, RegisterRequest};

/// Minimum password length for new accounts, in characters
pub const MIN_PASSWORD_LENGTH: usize = 8;

const NAME_REQUIRED: &str = "Full name is required.";
const EMAIL_REQUIRED: &str = "Email is required.";
const EMAIL_INVALID: &str = "Invalid email format.";
const PASSWORD_REQUIRED: &str = "Password is required.";
const PASSWORD_TOO_SHORT: &str = "Password must be at least 8 characters.";

/// Form fields, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Field {
    Name,
    Email,
    Password,
}

impl Field {
    pub fn label(&self) -> &'static str {
        match self {
            Field::Name => "Full Name",
            Field::Email => "Email",
            Field::Password => "Password",
        }
    }
}

/// Field-level validation messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, &'static str>);

impl FieldErrors {
    pub fn get(&self, field: Field) -> Option<&'static str> {
        self.0.get(&field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &'static str)> + '_ {
        self.0.iter().map(|(f, m)| (*f, *m))
    }

    fn insert(&mut self, field: Field, message: &'static str) {
        self.0.insert(field, message);
    }

    fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\S+@\S+\.\S+$").ok());

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.as_ref().is_some_and(|re| re.is_match(email))
}

fn check_email(email: &str, errors: &mut FieldErrors) {
    if email.trim().is_empty() {
        errors.insert(Field::Email, EMAIL_REQUIRED);
    } else if !is_valid_email(email) {
        errors.insert(Field::Email, EMAIL_INVALID);
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        check_email(&self.email, &mut errors);
        if self.password.trim().is_empty() {
            errors.insert(Field::Password, PASSWORD_REQUIRED);
        }
        errors.into_result()
    }

    pub fn to_request(&self) -> LoginRequest {
        LoginRequest {
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.name.trim().is_empty() {
            errors.insert(Field::Name, NAME_REQUIRED);
        }
        check_email(&self.email, &mut errors);
        if self.password.trim().is_empty() {
            errors.insert(Field::Password, PASSWORD_REQUIRED);
        } else if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.insert(Field::Password, PASSWORD_TOO_SHORT);
        }
        errors.into_result()
    }

    pub fn to_request(&self) -> RegisterRequest {
        RegisterRequest {
            name: self.name.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }
}
