use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};

use crate::{
    app::AppState,
    ui::{
        components::{centered_box, hints},
        theme::Theme,
    },
};

/// Delete prompt for the expense named in `dashboard.confirm_delete`.
pub fn render(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let Some(id) = state.dashboard.confirm_delete.as_deref() else {
        return;
    };
    let subject = state
        .expenses
        .get(id)
        .map(|expense| {
            format!(
                "{} {}",
                expense.amount.format(&state.prefs.currency),
                expense.description
            )
        })
        .unwrap_or_else(|| id.to_string());

    let lines = vec![
        Line::from("Delete this expense?"),
        Line::from(Span::styled(subject, Style::default().fg(theme.text))),
        Line::from(""),
        Line::from(hints::hints_to_spans(hints::CONFIRM, theme)),
    ];

    let popup = centered_box(44, 6, area);
    let block = Block::default()
        .title(" Confirm ")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.error));

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(block),
        popup,
    );
}
