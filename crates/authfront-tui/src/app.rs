//! Application state management for authfront.
//!
//! This module contains the core `App` struct: the current route, the form
//! state for the login and registration screens, the dashboard's guard and
//! profile state, and the channel that brings background request results back
//! to the UI loop.

use authfront_core::{
    AuthFlows, Config, DashboardLoad, Field, FieldErrors, FlowError, GuardOutcome, GuardState,
    LoginForm, LoginSuccess, RegisterForm, RegisterSuccess, Route, User,
};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 16;

/// Maximum length for the full name input.
const MAX_NAME_LENGTH: usize = 100;

/// Maximum length for email input (RFC 5321 path limit).
const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

const DASHBOARD_WELCOME: &str = "You're successfully logged in!";

// ============================================================================
// UI State Types
// ============================================================================

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    Quitting,
}

/// Focused element of the login or registration form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormFocus {
    Name,
    Email,
    Password,
    Button,
}

impl FormFocus {
    fn order(route: Route) -> &'static [FormFocus] {
        match route {
            Route::Register => &[
                FormFocus::Name,
                FormFocus::Email,
                FormFocus::Password,
                FormFocus::Button,
            ],
            _ => &[FormFocus::Email, FormFocus::Password, FormFocus::Button],
        }
    }

    /// Next element on the given screen (wrapping around)
    pub fn next(self, route: Route) -> Self {
        let order = Self::order(route);
        let i = order.iter().position(|f| *f == self).unwrap_or(0);
        order[(i + 1) % order.len()]
    }

    /// Previous element on the given screen (wrapping around)
    pub fn prev(self, route: Route) -> Self {
        let order = Self::order(route);
        let i = order.iter().position(|f| *f == self).unwrap_or(0);
        order[(i + order.len() - 1) % order.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Error,
}

/// Banner shown under a form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub kind: MessageKind,
}

impl Message {
    fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: MessageKind::Success,
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: MessageKind::Error,
        }
    }
}

/// Dashboard view state below the route guard
#[derive(Debug, Clone, Default)]
pub struct DashboardView {
    pub loading: bool,
    pub user: Option<User>,
    pub error: Option<String>,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl DashboardView {
    pub fn status_line(&self) -> &str {
        self.error.as_deref().unwrap_or(DASHBOARD_WELCOME)
    }
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results sent back from spawned request tasks
#[derive(Debug)]
enum TaskResult {
    GuardChecked(GuardOutcome),
    DashboardLoaded(DashboardLoad),
    LoggedIn(Result<LoginSuccess, FlowError>),
    Registered(Result<RegisterSuccess, FlowError>),
    RedirectDue(Route),
}

/// A task result tagged with the screen generation that started it
#[derive(Debug)]
struct TaskMessage {
    generation: u64,
    result: TaskResult,
}

// ============================================================================
// Main Application Struct
// ============================================================================

/// Main application state container
pub struct App {
    // Core services
    pub config: Config,
    pub flows: AuthFlows,

    // UI State
    pub state: AppState,
    pub route: Route,
    /// Bumped on every navigation; results from older screens are dropped
    generation: u64,

    // Form state
    pub login_form: LoginForm,
    pub register_form: RegisterForm,
    pub focus: FormFocus,
    pub field_errors: FieldErrors,
    pub message: Option<Message>,
    pub submitting: bool,

    // Dashboard state
    pub guard: GuardState,
    pub dashboard: DashboardView,

    // Background task channel
    task_rx: mpsc::Receiver<TaskMessage>,
    task_tx: mpsc::Sender<TaskMessage>,
}

impl App {
    /// Create a new application instance
    pub fn new(config: Config, flows: AuthFlows) -> Self {
        let (task_tx, task_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let login_form = LoginForm {
            email: config.last_email.clone().unwrap_or_default(),
            password: String::new(),
        };

        Self {
            config,
            flows,
            state: AppState::Normal,
            route: Route::Login,
            generation: 0,
            login_form,
            register_form: RegisterForm::default(),
            focus: FormFocus::Email,
            field_errors: FieldErrors::default(),
            message: None,
            submitting: false,
            guard: GuardState::start(),
            dashboard: DashboardView::default(),
            task_rx,
            task_tx,
        }
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Switch screens. Pending results from the previous screen are discarded.
    pub fn navigate(&mut self, route: Route) {
        self.generation += 1;
        debug!(route = %route, generation = self.generation, "Navigating");

        self.route = route;
        self.field_errors = FieldErrors::default();
        self.message = None;
        self.submitting = false;

        match route {
            Route::Login => {
                self.login_form.password.clear();
                self.focus = if self.login_form.email.is_empty() {
                    FormFocus::Email
                } else {
                    FormFocus::Password
                };
            }
            Route::Register => {
                self.register_form = RegisterForm::default();
                self.focus = FormFocus::Name;
            }
            Route::Dashboard => {
                self.guard = GuardState::start();
                self.dashboard = DashboardView::default();
                self.start_guard_check();
            }
        }
    }

    /// Navigate to a path, resolving unknown paths the way the router does
    pub fn open_path(&mut self, path: &str) {
        self.navigate(Route::from_path(path));
    }

    fn spawn_task<F>(&self, task: F)
    where
        F: std::future::Future<Output = TaskResult> + Send + 'static,
    {
        let tx = self.task_tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let result = task.await;
            if let Err(e) = tx.send(TaskMessage { generation, result }).await {
                warn!(error = %e, "Failed to send task result - channel closed");
            }
        });
    }

    fn start_guard_check(&mut self) {
        let guard = self.flows.guard().clone();
        self.spawn_task(async move { TaskResult::GuardChecked(guard.check().await) });
    }

    /// Fetch the dashboard profile (also used for a manual reload)
    pub fn load_dashboard(&mut self) {
        if self.route != Route::Dashboard || self.dashboard.loading {
            return;
        }
        self.dashboard.loading = true;
        let flows = self.flows.clone();
        self.spawn_task(async move { TaskResult::DashboardLoaded(flows.load_dashboard().await) });
    }

    // =========================================================================
    // Form Submission
    // =========================================================================

    /// Submit the login form. Ignored while a submission is in flight.
    pub fn submit_login(&mut self) {
        if self.submitting {
            return;
        }
        self.message = None;
        if let Err(errors) = self.login_form.validate() {
            self.field_errors = errors;
            return;
        }
        self.field_errors = FieldErrors::default();
        self.submitting = true;

        let flows = self.flows.clone();
        let form = self.login_form.clone();
        self.spawn_task(async move { TaskResult::LoggedIn(flows.login(&form).await) });
    }

    /// Submit the registration form. Ignored while a submission is in flight.
    pub fn submit_register(&mut self) {
        if self.submitting {
            return;
        }
        self.message = None;
        if let Err(errors) = self.register_form.validate() {
            self.field_errors = errors;
            return;
        }
        self.field_errors = FieldErrors::default();
        self.submitting = true;

        let flows = self.flows.clone();
        let form = self.register_form.clone();
        self.spawn_task(async move { TaskResult::Registered(flows.register(&form).await) });
    }

    pub fn logout(&mut self) {
        let route = self.flows.logout();
        self.navigate(route);
    }

    fn show_flow_error(&mut self, error: FlowError) {
        warn!(error = %error, route = %self.route, "Submission failed");
        if let Some(errors) = error.field_errors() {
            self.field_errors = errors.clone();
        }
        self.message = error.user_message().map(Message::error);
    }

    // =========================================================================
    // Background Results
    // =========================================================================

    /// Drain finished background tasks and apply their results
    pub fn check_background_tasks(&mut self) {
        let mut results = Vec::new();
        while let Ok(message) = self.task_rx.try_recv() {
            results.push(message);
        }

        for message in results {
            if message.generation != self.generation {
                debug!(
                    stale = message.generation,
                    current = self.generation,
                    "Dropping result from a previous screen"
                );
                continue;
            }
            self.process_task_result(message.result);
        }
    }

    fn process_task_result(&mut self, result: TaskResult) {
        match result {
            TaskResult::GuardChecked(outcome) => {
                let state = std::mem::replace(&mut self.guard, GuardState::Checking);
                self.guard = state.resolve(outcome);
                if let Some(route) = self.guard.redirect() {
                    info!("Not authenticated, redirecting to login");
                    self.navigate(route);
                } else if let GuardState::Authenticated(ref user) = self.guard {
                    self.dashboard.user = user.clone();
                    self.load_dashboard();
                }
            }
            TaskResult::DashboardLoaded(load) => {
                self.dashboard.loading = false;
                match load {
                    DashboardLoad::Loaded(user) => {
                        if user.is_some() {
                            self.dashboard.user = user;
                        }
                        self.dashboard.error = None;
                        self.dashboard.loaded_at = Some(Utc::now());
                    }
                    DashboardLoad::Redirect(route) => self.navigate(route),
                    DashboardLoad::Failed { user, message } => {
                        if user.is_some() {
                            self.dashboard.user = user;
                        }
                        self.dashboard.error = Some(message);
                    }
                }
            }
            TaskResult::LoggedIn(result) => {
                self.submitting = false;
                match result {
                    Ok(success) => {
                        info!(message = %success.message, "Signed in");
                        self.remember_email();
                        self.navigate(success.next);
                    }
                    Err(e) => self.show_flow_error(e),
                }
            }
            TaskResult::Registered(result) => {
                self.submitting = false;
                match result {
                    Ok(success) => {
                        self.message = Some(Message::success(success.message));
                        let next = success.next;
                        let delay = success.redirect_after;
                        self.spawn_task(async move {
                            tokio::time::sleep(delay).await;
                            TaskResult::RedirectDue(next)
                        });
                    }
                    Err(e) => self.show_flow_error(e),
                }
            }
            TaskResult::RedirectDue(route) => {
                let message = self.message.take();
                self.login_form.email = self.register_form.email.clone();
                self.navigate(route);
                self.message = message;
            }
        }
    }

    fn remember_email(&mut self) {
        let email = self.login_form.email.trim().to_string();
        if self.config.last_email.as_deref() == Some(email.as_str()) {
            return;
        }
        self.config.last_email = Some(email);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    // =========================================================================
    // Form Editing
    // =========================================================================

    fn focused_input(&mut self) -> Option<(&mut String, usize)> {
        match (self.route, self.focus) {
            (Route::Login, FormFocus::Email) => Some((&mut self.login_form.email, MAX_EMAIL_LENGTH)),
            (Route::Login, FormFocus::Password) => {
                Some((&mut self.login_form.password, MAX_PASSWORD_LENGTH))
            }
            (Route::Register, FormFocus::Name) => Some((&mut self.register_form.name, MAX_NAME_LENGTH)),
            (Route::Register, FormFocus::Email) => {
                Some((&mut self.register_form.email, MAX_EMAIL_LENGTH))
            }
            (Route::Register, FormFocus::Password) => {
                Some((&mut self.register_form.password, MAX_PASSWORD_LENGTH))
            }
            _ => None,
        }
    }

    /// Type a character into the focused field. Inputs are locked while submitting.
    pub fn push_char(&mut self, c: char) {
        if self.submitting {
            return;
        }
        if let Some((value, max_len)) = self.focused_input() {
            if can_add_char(value.chars().count(), max_len, c) {
                value.push(c);
            }
        }
    }

    pub fn pop_char(&mut self) {
        if self.submitting {
            return;
        }
        if let Some((value, _)) = self.focused_input() {
            value.pop();
        }
    }

    pub fn field_error(&self, field: Field) -> Option<&'static str> {
        self.field_errors.get(field)
    }

    pub fn backend_url(&self) -> &str {
        self.flows.api().base_url()
    }
}

// ============================================================================
// Input validation helpers
// ============================================================================

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if a character should be accepted into a field of the given limit
pub fn can_add_char(current_len: usize, max_len: usize, c: char) -> bool {
    current_len < max_len && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================
