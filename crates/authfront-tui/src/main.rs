//! Authfront - a terminal client for a token-authenticated backend.
//!
//! Sign in or register against the configured backend, then view the
//! signed-in profile on a guarded dashboard.

mod app;
mod ui;
mod utils;

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use authfront_core::{
    ApiClient, AuthFlows, Config, FileStore, GuardOutcome, KeyringStore, LoginForm, Session,
    SessionStore, StoreBackend,
};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;
use utils::age_display;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log file prefix inside the data directory
const LOG_FILE_PREFIX: &str = "authfront.log";

/// Route opened at startup; the guard bounces to login when signed out
const START_PATH: &str = "/dashboard";

/// Initialize the tracing subscriber for logging.
///
/// The TUI owns the terminal, so logs go to a daily file in the data directory.
/// The returned guard must live until exit so buffered lines are flushed.
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    guard
}

/// Build the session over the configured store backend
fn open_session(config: &Config, data_dir: &Path) -> Session {
    let store: Arc<dyn SessionStore> = match config.store {
        StoreBackend::File => Arc::new(FileStore::new(data_dir.to_path_buf())),
        StoreBackend::Keyring => Arc::new(KeyringStore::new()),
    };
    Session::new(store)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load()?;
    let data_dir = config.data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;

    let _log_guard = init_tracing(&data_dir);

    let session = open_session(&config, &data_dir);
    let api = ApiClient::new(&config.backend_url())?;
    let flows = AuthFlows::new(api, session);

    // Check for CLI commands
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("--logout") => return logout(&flows),
        Some("--whoami") => return whoami(&flows, &config, &data_dir).await,
        Some("--login") => return login(&flows, &config).await,
        Some(other) => anyhow::bail!("Unknown argument: {} (try --login, --logout or --whoami)", other),
        None => {}
    }

    info!(backend = %flows.api().base_url(), "Authfront starting");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config, flows);
    app.open_path(START_PATH);

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("Authfront shutting down");
    Ok(())
}

// ============================================================================
// CLI commands
// ============================================================================

/// Clear the stored token, profile and refresh cookie
fn logout(flows: &AuthFlows) -> Result<()> {
    flows.session().clear().context("Failed to clear session")?;
    println!("Signed out.");
    Ok(())
}

/// Validate the stored token and print the profile
async fn whoami(flows: &AuthFlows, config: &Config, data_dir: &Path) -> Result<()> {
    match flows.guard().check().await {
        GuardOutcome::Authenticated(user) => {
            match user {
                Some(user) => {
                    println!("{}", user.greeting());
                    println!("Email:   {}", user.email_display());
                    println!("User ID: {}", user.id_display());
                }
                None => println!("Signed in"),
            }
            if config.store == StoreBackend::File {
                let store = FileStore::new(data_dir.to_path_buf());
                if let Ok(Some(at)) = store.updated_at() {
                    println!("Session saved {}", age_display(at, chrono::Utc::now()));
                }
            }
        }
        GuardOutcome::Unauthenticated => println!("Not signed in"),
    }
    Ok(())
}

/// Prompt for credentials and run the login flow
async fn login(flows: &AuthFlows, config: &Config) -> Result<()> {
    let mut email = String::new();
    match config.last_email.as_deref() {
        Some(last) => print!("Email [{}]: ", last),
        None => print!("Email: "),
    }
    io::stdout().flush()?;
    io::stdin().read_line(&mut email)?;
    let mut email = email.trim().to_string();
    if email.is_empty() {
        email = config.last_email.clone().unwrap_or_default();
    }

    let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;

    let form = LoginForm { email, password };
    match flows.login(&form).await {
        Ok(success) => {
            println!("{}", success.message);
            if let Some(user) = &success.user {
                println!("{}", user.greeting());
            }
            let mut config = config.clone();
            config.last_email = Some(form.email.trim().to_string());
            if let Err(e) = config.save() {
                tracing::warn!(error = %e, "Failed to save config");
            }
            Ok(())
        }
        Err(e) => {
            if let Some(errors) = e.field_errors() {
                for (field, message) in errors.iter() {
                    eprintln!("{}: {}", field.label(), message);
                }
            }
            if let Some(message) = e.user_message() {
                eprintln!("{}", message);
            }
            anyhow::bail!("Login failed")
        }
    }
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key)? {
                    return Ok(());
                }
            }
        }

        // Check for completed background tasks
        app.check_background_tasks();

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
