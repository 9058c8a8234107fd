pub mod components;
pub mod keymap;
pub mod screens;

mod terminal;
mod theme;

use ratatui::Frame;

use crate::app::{AppState, Screen};

pub use terminal::{AppTerminal as Terminal, restore_terminal, setup_terminal};
pub use theme::Theme;

pub fn render(frame: &mut Frame<'_>, state: &AppState) {
    let theme = Theme::default();
    let area = frame.area();
    match state.screen {
        Screen::Starting => screens::auth::render_starting(frame, area, &theme),
        Screen::Auth => screens::auth::render(frame, area, state, &theme),
        Screen::Dashboard => screens::dashboard::render(frame, area, state, &theme),
    }
}
