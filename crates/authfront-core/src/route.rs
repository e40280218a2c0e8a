//! Application routes.

use std::fmt;

/// Screens the front-end can show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Dashboard,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Dashboard => "/dashboard",
        }
    }

    /// Resolve a path. The root and anything unknown redirect to login.
    pub fn from_path(path: &str) -> Self {
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "/register" => Route::Register,
            "/dashboard" => Route::Dashboard,
            _ => Route::Login,
        }
    }

    /// Protected routes render only after the route guard accepts the session
    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Dashboard)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Login => "Login",
            Route::Register => "Registration Form",
            Route::Dashboard => "Dashboard",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
