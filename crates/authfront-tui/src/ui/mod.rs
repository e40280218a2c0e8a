//! Terminal UI module using ratatui.
//!
//! - `render`: screen rendering for the login, registration and dashboard routes
//! - `input`: keyboard event handling
//! - `styles`: color scheme and text styling

pub mod input;
pub mod render;
pub mod styles;
