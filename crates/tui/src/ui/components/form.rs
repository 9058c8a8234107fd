use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};

use crate::{
    app::{ExpenseForm, FormField},
    ui::{
        components::{centered_box, hints},
        theme::Theme,
    },
};

const LABEL_WIDTH: usize = 13;

/// Add/edit modal drawn over the dashboard.
pub fn render(frame: &mut Frame<'_>, area: Rect, form: &ExpenseForm, theme: &Theme) {
    let popup = centered_box(52, 12, area);
    let block = Block::default()
        .title(format!(" {} ", form.title()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border_focused));
    let inner = block.inner(popup);

    frame.render_widget(Clear, popup);
    frame.render_widget(block, popup);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .margin(1)
        .split(inner);

    for (row, field) in FormField::ALL.iter().enumerate() {
        let value = match field {
            FormField::Amount => form.amount.clone(),
            FormField::Category => format!("‹ {} ›", form.category.label()),
            FormField::Description => form.description.clone(),
            FormField::Date => form.date.clone(),
        };
        render_field(frame, rows[row], *field, &value, form.focus == *field, theme);
    }

    if let Some(error) = &form.error {
        frame.render_widget(
            Paragraph::new(Span::styled(error.as_str(), Style::default().fg(theme.error))),
            rows[5],
        );
    }
    frame.render_widget(
        Paragraph::new(Line::from(hints::hints_to_spans(hints::FORM, theme))),
        rows[6],
    );
}

fn render_field(
    frame: &mut Frame<'_>,
    area: Rect,
    field: FormField,
    value: &str,
    focused: bool,
    theme: &Theme,
) {
    let cursor = if focused && field != FormField::Category {
        "│"
    } else {
        ""
    };
    let label_style = if focused {
        Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.dim)
    };

    let line = Line::from(vec![
        Span::styled(format!("{:<LABEL_WIDTH$}", field.label()), label_style),
        Span::styled(format!("{value}{cursor}"), Style::default().fg(theme.text)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
