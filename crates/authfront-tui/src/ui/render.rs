use authfront_core::{Field, GuardState, Route};
use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::{App, AppState, FormFocus, MessageKind};
use crate::utils::{age_display, mask, truncate_string};

use super::styles;

/// Visible width of a text input, in characters
const INPUT_WIDTH: usize = 28;

const FORM_WIDTH: u16 = 50;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_main_content(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);

    if matches!(app.state, AppState::ShowingHelp) {
        render_help_overlay(frame);
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!("  Authfront · {}", app.route.title());
    let help_hint = "[?] Help";
    let title_len = title.chars().count();

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            area.width
                .saturating_sub(title_len as u16 + help_hint.len() as u16 + 4)
                as usize,
        )),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(title_line).block(block);
    frame.render_widget(paragraph, area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.route {
        Route::Login => render_login(frame, app, area),
        Route::Register => render_register(frame, app, area),
        Route::Dashboard => render_dashboard(frame, app, area),
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = match app.route {
        Route::Login => "[Ctrl+R] register | [Esc] quit",
        Route::Register => "[Ctrl+L] login | [Esc] quit",
        Route::Dashboard => "[r]eload | [l]ogout | [q]uit",
    };

    let left_text = match app.dashboard.loaded_at {
        Some(at) if app.route == Route::Dashboard => format!(
            " {} · checked {} ",
            app.backend_url(),
            age_display(at, Utc::now())
        ),
        _ => format!(" {} ", app.backend_url()),
    };
    let right_text = format!(" {} ", shortcuts);

    let width = area.width as usize;
    let left_text = truncate_string(&left_text, width.saturating_sub(right_text.len()));
    let padding_len = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.len());

    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Forms
// ============================================================================

fn render_login(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = vec![Line::from("")];
    push_input(
        &mut lines,
        app,
        Field::Email,
        &app.login_form.email,
        app.focus == FormFocus::Email,
    );
    push_input(
        &mut lines,
        app,
        Field::Password,
        &mask(&app.login_form.password),
        app.focus == FormFocus::Password,
    );
    let label = if app.submitting { "Logging in..." } else { "Log In" };
    push_button(&mut lines, app, label);
    push_message(&mut lines, app);

    render_form_box(frame, area, " Login ", lines);
}

fn render_register(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = vec![Line::from("")];
    push_input(
        &mut lines,
        app,
        Field::Name,
        &app.register_form.name,
        app.focus == FormFocus::Name,
    );
    push_input(
        &mut lines,
        app,
        Field::Email,
        &app.register_form.email,
        app.focus == FormFocus::Email,
    );
    push_input(
        &mut lines,
        app,
        Field::Password,
        &mask(&app.register_form.password),
        app.focus == FormFocus::Password,
    );
    let label = if app.submitting { "Registering..." } else { "Register" };
    push_button(&mut lines, app, label);
    push_message(&mut lines, app);

    render_form_box(frame, area, " Register ", lines);
}

fn push_input(lines: &mut Vec<Line<'static>>, app: &App, field: Field, value: &str, focused: bool) {
    let style = if app.submitting {
        styles::disabled_style()
    } else if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };

    // Keep the tail visible while typing past the box width
    let count = value.chars().count();
    let visible: String = value.chars().skip(count.saturating_sub(INPUT_WIDTH)).collect();
    let cursor = if focused && !app.submitting { "▌" } else { " " };

    lines.push(Line::from(Span::styled(
        format!("   {}", field.label()),
        styles::muted_style(),
    )));
    lines.push(Line::from(vec![
        Span::styled("   [", styles::muted_style()),
        Span::styled(format!("{:<width$}{}", visible, cursor, width = INPUT_WIDTH), style),
        Span::styled("]", styles::muted_style()),
    ]));
    match app.field_error(field) {
        Some(error) => lines.push(Line::from(Span::styled(
            format!("   {}", error),
            styles::error_style(),
        ))),
        None => lines.push(Line::from("")),
    }
}

fn push_button(lines: &mut Vec<Line<'static>>, app: &App, label: &str) {
    let focused = app.focus == FormFocus::Button;
    let (text, style) = if app.submitting {
        (format!("  {}  ", label), styles::disabled_style())
    } else if focused {
        (format!(" ▶ {} ◀ ", label), styles::selected_style())
    } else {
        (format!("   {}   ", label), styles::list_item_style())
    };
    lines.push(Line::from(vec![
        Span::raw("             ["),
        Span::styled(text, style),
        Span::raw("]"),
    ]));
}

fn push_message(lines: &mut Vec<Line<'static>>, app: &App) {
    if let Some(ref message) = app.message {
        let style = match message.kind {
            MessageKind::Success => styles::success_style(),
            MessageKind::Error => styles::error_style(),
        };
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", message.text), style)));
    }
}

fn render_form_box(frame: &mut Frame, area: Rect, title: &'static str, lines: Vec<Line<'static>>) {
    let height = lines.len() as u16 + 3;
    let area = centered_rect_fixed(FORM_WIDTH, height, area);

    let block = Block::default()
        .title(Span::styled(title, styles::title_style()))
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

// ============================================================================
// Dashboard
// ============================================================================

fn render_dashboard(frame: &mut Frame, app: &App, area: Rect) {
    let lines = match &app.guard {
        // Nothing of the protected view renders until the guard settles
        GuardState::Checking | GuardState::Unauthenticated => vec![
            Line::from(""),
            Line::from(Span::styled(
                format!("  {}", GuardState::placeholder()),
                styles::muted_style(),
            )),
        ],
        GuardState::Authenticated(_) if app.dashboard.loading && app.dashboard.loaded_at.is_none() => {
            vec![
                Line::from(""),
                Line::from(Span::styled("  Loading dashboard…", styles::muted_style())),
            ]
        }
        GuardState::Authenticated(_) => dashboard_lines(app),
    };

    let area = centered_rect_fixed(FORM_WIDTH + 10, lines.len() as u16 + 3, area);
    let block = Block::default()
        .title(Span::styled(" Dashboard ", styles::title_style()))
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn dashboard_lines(app: &App) -> Vec<Line<'static>> {
    let view = &app.dashboard;
    let greeting = view
        .user
        .as_ref()
        .map(|u| u.greeting())
        .unwrap_or_else(|| "Welcome".to_string());
    let (email, id) = match &view.user {
        Some(user) => (user.email_display().to_string(), user.id_display()),
        None => ("—".to_string(), "—".to_string()),
    };
    let status_style = if view.error.is_some() {
        styles::error_style()
    } else {
        styles::success_style()
    };

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(format!("  {}", greeting), styles::highlight_style())),
        Line::from(Span::styled(
            format!("  {}", view.status_line()),
            status_style,
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Email:   ", styles::muted_style()),
            Span::styled(email, styles::list_item_style()),
        ]),
        Line::from(vec![
            Span::styled("  User ID: ", styles::muted_style()),
            Span::styled(id, styles::list_item_style()),
        ]),
        Line::from(""),
    ];
    if view.loading {
        lines.push(Line::from(Span::styled("  Reloading…", styles::muted_style())));
    }
    lines.push(Line::from(vec![
        Span::raw("  "),
        Span::styled("[l]", styles::help_key_style()),
        Span::styled(" Logout", styles::help_desc_style()),
    ]));
    lines
}

// ============================================================================
// Overlays
// ============================================================================

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 20, frame.area());

    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let help_text = vec![
        Line::from(Span::styled("  Authfront", styles::title_style())),
        Line::from(Span::styled(
            format!("  version {}", version),
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Forms", styles::highlight_style())),
        help_line("Tab/↓", "Next field"),
        help_line("S-Tab/↑", "Previous field"),
        help_line("Enter", "Next field / submit"),
        help_line("Ctrl+R", "Switch to registration"),
        help_line("Ctrl+L", "Switch to login"),
        Line::from(""),
        Line::from(Span::styled(" Dashboard", styles::highlight_style())),
        help_line("r", "Reload profile"),
        help_line("l", "Log out"),
        help_line("q / Esc", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

fn help_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::help_key_style()),
        Span::styled(desc, styles::help_desc_style()),
    ])
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_fixed() {
        let outer = Rect::new(0, 0, 100, 40);
        let inner = centered_rect_fixed(50, 10, outer);
        assert_eq!(inner, Rect::new(25, 15, 50, 10));

        // Clamped to the available area
        let small = centered_rect_fixed(50, 10, Rect::new(0, 0, 20, 5));
        assert_eq!(small, Rect::new(0, 0, 20, 5));
    }
}
