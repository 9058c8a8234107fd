use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};

use crate::{
    app::AppState,
    ui::{
        components::{
            centered_box,
            hints::{self, KeyHint},
        },
        theme::Theme,
    },
};

pub fn render(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    if !state.dashboard.help {
        return;
    }

    let sections: [(&str, &[KeyHint]); 4] = [
        ("Expenses", hints::LIST),
        ("Session", hints::SESSION),
        ("Form", hints::FORM),
        ("Delete prompt", hints::CONFIRM),
    ];

    let mut lines = Vec::new();
    for (title, group) in sections {
        lines.push(Line::from(Span::styled(title, Style::default().fg(theme.dim))));
        for hint in group {
            lines.push(Line::from(vec![
                Span::styled(format!("  {:<7}", hint.key), Style::default().fg(theme.accent)),
                Span::raw(hint.action),
            ]));
        }
        lines.push(Line::from(""));
    }
    lines.push(Line::from(vec![
        Span::styled("Esc", Style::default().fg(theme.accent)),
        Span::raw(" close"),
    ]));

    let popup = centered_box(40, lines.len() as u16 + 2, area);
    let block = Block::default()
        .title(" Keybinds ")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.accent));

    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}
