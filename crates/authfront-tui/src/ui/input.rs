//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use anyhow::Result;
use authfront_core::Route;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, AppState, FormFocus};

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Handle help overlay
    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.state = AppState::Normal;
        }
        return Ok(false);
    }

    if app.route.is_protected() {
        handle_dashboard_input(app, key)
    } else {
        handle_form_input(app, key)
    }
}

fn handle_form_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('r') => app.navigate(Route::Register),
            KeyCode::Char('l') => app.navigate(Route::Login),
            _ => {}
        }
        return Ok(false);
    }

    match key.code {
        KeyCode::Esc => {
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => {
            app.focus = app.focus.next(app.route);
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.focus = app.focus.prev(app.route);
        }
        KeyCode::Enter => match app.focus {
            FormFocus::Button => submit(app),
            // Enter in the last input submits, like a browser form
            FormFocus::Password => submit(app),
            _ => app.focus = app.focus.next(app.route),
        },
        KeyCode::Backspace => app.pop_char(),
        // `?` is a valid password character, so help only opens from the button
        KeyCode::Char('?') if app.focus == FormFocus::Button => {
            app.state = AppState::ShowingHelp;
        }
        KeyCode::Char(c) => app.push_char(c),
        _ => {}
    }
    Ok(false)
}

fn submit(app: &mut App) {
    match app.route {
        Route::Login => app.submit_login(),
        Route::Register => app.submit_register(),
        Route::Dashboard => {}
    }
}

fn handle_dashboard_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
        }
        // Both wait for the guard; nothing protected is reachable while checking
        KeyCode::Char('l') if !app.guard.is_checking() => app.logout(),
        KeyCode::Char('r') if !app.guard.is_checking() => app.load_dashboard(),
        _ => {}
    }
    Ok(false)
}
