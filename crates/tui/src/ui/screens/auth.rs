use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};

use crate::{
    app::{AppState, AuthField},
    ui::{
        components::{centered_box, hints},
        theme::Theme,
    },
};

const LABEL_WIDTH: usize = 10;

pub fn render(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let auth = &state.auth;
    let fields = auth.mode.fields();

    // Fields separated by blank rows, inside a border and a margin.
    let rows_needed = fields.len() * 2 - 1;
    let box_height = rows_needed as u16 + 4;
    let card_area = centered_box(44, box_height, area);
    frame.render_widget(Clear, card_area);

    let block = Block::default()
        .title(format!(" {} ", auth.mode.label()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border));
    let inner = block.inner(card_area);
    frame.render_widget(block, card_area);

    let constraints = vec![Constraint::Length(1); rows_needed];
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .margin(1)
        .split(inner);

    for (i, field) in fields.iter().enumerate() {
        let (label, value, masked) = match field {
            AuthField::Email => ("Email", auth.email.as_str(), false),
            AuthField::Password => ("Password", auth.password.as_str(), true),
            AuthField::Name => ("Name", auth.name.as_str(), false),
        };
        render_input(
            frame,
            rows[i * 2],
            label,
            value,
            masked,
            auth.focus == *field,
            theme,
        );
    }

    let below = |offset: u16| Rect {
        x: card_area.x,
        y: card_area.y.saturating_add(card_area.height + offset),
        width: card_area.width,
        height: 1,
    };

    let status = if auth.submitting {
        Some(Span::styled("Please wait…", Style::default().fg(theme.dim)))
    } else {
        auth.error
            .as_deref()
            .map(|message| Span::styled(message, Style::default().fg(theme.error)))
    };
    if let Some(status) = status {
        frame.render_widget(
            Paragraph::new(status).alignment(Alignment::Center),
            below(1),
        );
    }

    frame.render_widget(
        Paragraph::new(Line::from(hints::hints_to_spans(hints::AUTH, theme)))
            .alignment(Alignment::Center),
        below(2),
    );
}

/// Shown while the stored session is checked at startup.
pub fn render_starting(frame: &mut Frame<'_>, area: Rect, theme: &Theme) {
    let line = centered_box(30, 1, area);
    frame.render_widget(
        Paragraph::new(Span::styled(
            "Restoring session…",
            Style::default().fg(theme.dim),
        ))
        .alignment(Alignment::Center),
        line,
    );
}

fn render_input(
    frame: &mut Frame<'_>,
    area: Rect,
    label: &str,
    value: &str,
    masked: bool,
    focused: bool,
    theme: &Theme,
) {
    let cursor = if focused { "│" } else { "" };
    let shown = if masked {
        mask_password(value)
    } else {
        value.to_string()
    };

    let (label_style, value_style) = if focused {
        (
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
            Style::default().fg(theme.accent),
        )
    } else {
        (Style::default().fg(theme.dim), Style::default().fg(theme.text))
    };

    let line = Line::from(vec![
        Span::styled(format!("{label:<LABEL_WIDTH$}"), label_style),
        Span::styled(format!("{shown}{cursor}"), value_style),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// One bullet per character.
fn mask_password(password: &str) -> String {
    "•".repeat(password.chars().count())
}
