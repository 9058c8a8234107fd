use chrono::Datelike;
use engine::stats::start_of_week;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph},
};

use crate::{
    app::AppState,
    ui::{
        components::{
            card::{Card, StatCard},
            charts::{ascii_bar, percent},
            confirm, form, help_overlay,
            hints::{self, hint_separator, hints_to_spans},
        },
        theme::Theme,
    },
};

const BREAKDOWN_WIDTH: u16 = 40;

pub fn render(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Info bar
            Constraint::Length(4), // Stat cards
            Constraint::Min(0),    // List + breakdown
            Constraint::Length(1), // Hints
        ])
        .split(area);

    render_info_bar(frame, layout[0], state, theme);
    render_stats(frame, layout[1], state, theme);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(BREAKDOWN_WIDTH)])
        .split(layout[2]);
    render_list(frame, body[0], state, theme);
    render_breakdown(frame, body[1], state, theme);

    render_hints(frame, layout[3], theme);

    if let Some(expense_form) = &state.dashboard.form {
        form::render(frame, area, expense_form, theme);
    }
    confirm::render(frame, area, state, theme);
    help_overlay::render(frame, area, state, theme);
}

fn render_info_bar(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let user = state
        .session
        .user()
        .map(|user| {
            if user.name.is_empty() {
                user.email.clone()
            } else {
                format!("{} <{}>", user.name, user.email)
            }
        })
        .unwrap_or_else(|| "-".to_string());
    let refresh = state
        .last_refresh
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());

    let mut line = vec![
        Span::styled("User", Style::default().fg(theme.dim)),
        Span::raw(format!(": {user}  ")),
        Span::styled("Refresh", Style::default().fg(theme.dim)),
        Span::raw(format!(": {refresh}  ")),
    ];
    if state.dashboard.loading {
        line.push(Span::styled("Loading…", Style::default().fg(theme.accent)));
    } else if let Some(error) = &state.dashboard.error {
        line.push(Span::styled(error.as_str(), Style::default().fg(theme.error)));
    } else {
        line.push(Span::styled("OK", Style::default().fg(theme.positive)));
    }

    frame.render_widget(Paragraph::new(Line::from(line)), area);
}

fn render_stats(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let currency = state.prefs.currency.as_str();
    let stats = &state.stats;
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    let today = state
        .last_refresh
        .map(|dt| dt.date_naive())
        .unwrap_or_default();
    let noun = if stats.count == 1 { "expense" } else { "expenses" };

    StatCard::new("Total", stats.total.format(currency), theme)
        .caption(format!("{} {noun}", stats.count))
        .render(frame, cols[0]);

    let mut month = StatCard::new("This month", stats.this_month.format(currency), theme);
    let mut week = StatCard::new("This week", stats.this_week.format(currency), theme);
    if state.last_refresh.is_some() {
        month = month.caption(today.format("%B %Y").to_string());
        let first = start_of_week(today, state.prefs.week_start);
        week = week.caption(format!("since {} {}", first.format("%a"), first.day()));
    }
    month.render(frame, cols[1]);
    week.render(frame, cols[2]);
}

fn render_list(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let card = Card::new("Expenses", theme).focused(state.dashboard.form.is_none());
    let inner = card.inner(area);
    card.render_frame(frame, area);

    let expenses = state.expenses.items();
    if expenses.is_empty() {
        let message = if state.dashboard.loading {
            Span::styled("Loading expenses…", Style::default().fg(theme.dim))
        } else if state.expenses.error().is_some() {
            Span::styled("Could not load expenses.", Style::default().fg(theme.error))
        } else {
            Span::styled(
                "No expenses yet. Press a to add one.",
                Style::default().fg(theme.dim),
            )
        };
        frame.render_widget(
            Paragraph::new(message).alignment(Alignment::Center),
            inner,
        );
        return;
    }

    let currency = state.prefs.currency.as_str();
    let items = expenses
        .iter()
        .map(|expense| {
            let date = expense.date.format("%Y-%m-%d").to_string();
            let category = expense.category.label();
            let amount = expense.amount.format(currency);
            ListItem::new(Line::from(vec![
                Span::styled(format!("{date}  "), Style::default().fg(theme.dim)),
                Span::raw(format!("{category:<14} ")),
                Span::styled(
                    format!("{amount:>12}  "),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(expense.description.clone()),
            ]))
        })
        .collect::<Vec<_>>();

    let mut list_state = ListState::default();
    list_state.select(Some(state.dashboard.selected));

    let list = List::new(items)
        .highlight_style(
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("» ");

    frame.render_stateful_widget(list, inner, &mut list_state);
}

fn render_breakdown(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let card = Card::new("By category", theme);
    let inner = card.inner(area);
    card.render_frame(frame, area);

    let stats = &state.stats;
    let max = stats
        .by_category
        .first()
        .map(|(_, amount)| amount.cents().max(0) as u64)
        .unwrap_or(0);
    let bar_width = (inner.width as usize).saturating_sub(20).max(4);

    let lines = stats
        .by_category
        .iter()
        .map(|(category, amount)| {
            let cents = amount.cents();
            Line::from(vec![
                Span::raw(format!("{:<14}", category.label())),
                Span::styled(
                    ascii_bar(cents.max(0) as u64, max, bar_width),
                    Style::default().fg(theme.accent),
                ),
                Span::styled(
                    format!(" {:>3}%", percent(cents, stats.total.cents())),
                    Style::default().fg(theme.dim),
                ),
            ])
        })
        .collect::<Vec<_>>();

    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_hints(frame: &mut Frame<'_>, area: Rect, theme: &Theme) {
    let mut spans = hints_to_spans(hints::LIST, theme);
    spans.push(hint_separator(theme));
    spans.extend(hints_to_spans(hints::SESSION, theme));
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
