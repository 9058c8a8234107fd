mod form;

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use engine::{
    Backend, EngineError, ExpenseDraft, ExpensePatch, ExpenseStore, Session, Statistics,
};

use crate::{
    config::AppConfig,
    error::{AppError, Result},
    ui::{
        self,
        keymap::{AppAction, map_key},
    },
};

pub use form::{AuthField, AuthMode, AuthState, ExpenseForm, FormField};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Starting,
    Auth,
    Dashboard,
}

/// Display preferences taken from the config.
#[derive(Debug, Clone)]
pub struct Preferences {
    pub currency: String,
    pub timezone: Tz,
    pub week_start: Weekday,
    pub confirm_delete: bool,
}

#[derive(Debug, Default)]
pub struct DashboardState {
    pub loading: bool,
    pub error: Option<String>,
    pub selected: usize,
    pub form: Option<ExpenseForm>,
    /// Expense awaiting a y/n answer.
    pub confirm_delete: Option<String>,
    pub help: bool,
}

/// Everything the renderer reads.
#[derive(Debug)]
pub struct AppState {
    pub screen: Screen,
    pub session: Session,
    pub expenses: ExpenseStore,
    pub stats: Statistics,
    pub auth: AuthState,
    pub dashboard: DashboardState,
    pub prefs: Preferences,
    pub last_refresh: Option<DateTime<Tz>>,
}

impl AppState {
    pub fn selected_expense(&self) -> Option<&engine::Expense> {
        self.expenses.items().get(self.dashboard.selected)
    }
}

/// Remote work queued by a key press and run by the event loop after the
/// next redraw.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingAction {
    RestoreSession,
    Login {
        email: String,
        password: String,
    },
    Register {
        email: String,
        password: String,
        name: String,
    },
    Logout,
    Refresh,
    Create(ExpenseDraft),
    Update {
        id: String,
        patch: ExpensePatch,
    },
    Delete {
        id: String,
    },
}

pub struct App<B> {
    backend: B,
    pub state: AppState,
    pending: Option<PendingAction>,
    should_quit: bool,
}

impl<B: Backend> App<B> {
    pub fn new(config: &AppConfig, backend: B) -> Result<Self> {
        let state = AppState {
            screen: Screen::Starting,
            session: Session::new(),
            expenses: ExpenseStore::new(config.expense_settings()),
            stats: Statistics::default(),
            auth: AuthState::new(&config.email),
            dashboard: DashboardState::default(),
            prefs: Preferences {
                currency: config.currency.clone(),
                timezone: config.timezone()?,
                week_start: config.week_start()?,
                confirm_delete: config.confirm_delete,
            },
            last_refresh: None,
        };

        Ok(Self {
            backend,
            state,
            pending: Some(PendingAction::RestoreSession),
            should_quit: false,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut terminal = ui::setup_terminal()?;
        let result = self.event_loop(&mut terminal).await;
        ui::restore_terminal(&mut terminal)?;
        result
    }

    async fn event_loop(&mut self, terminal: &mut ui::Terminal) -> Result<()> {
        let tick_rate = Duration::from_millis(200);

        while !self.should_quit {
            terminal
                .draw(|frame| ui::render(frame, &self.state))
                .map_err(|err| AppError::Terminal(err.to_string()))?;

            if let Some(action) = self.pending.take() {
                self.perform(action).await;
                continue;
            }

            if event::poll(tick_rate)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
                    _ => {}
                }
            }
        }

        Ok(())
    }

    /// Queues `action` unless one is already waiting; returns whether it was
    /// accepted.
    fn queue(&mut self, action: PendingAction) -> bool {
        if self.pending.is_some() {
            tracing::debug!("dropping {action:?}: another action is pending");
            return false;
        }
        self.pending = Some(action);
        true
    }

    fn today(&self) -> NaiveDate {
        Utc::now()
            .with_timezone(&self.state.prefs.timezone)
            .date_naive()
    }

    fn user_id(&self) -> Option<String> {
        self.state.session.user().map(|user| user.id.clone())
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let action = map_key(key);
        if action == AppAction::Quit {
            self.should_quit = true;
            return;
        }
        match self.state.screen {
            Screen::Starting => {}
            Screen::Auth => self.handle_auth_key(action),
            Screen::Dashboard => self.handle_dashboard_key(action),
        }
    }

    fn handle_auth_key(&mut self, action: AppAction) {
        let auth = &mut self.state.auth;
        match action {
            AppAction::ToggleMode if !auth.submitting => auth.toggle_mode(),
            AppAction::NextField | AppAction::Down => auth.focus_next(),
            AppAction::PrevField | AppAction::Up => auth.focus_prev(),
            AppAction::Cancel => auth.error = None,
            AppAction::Backspace => {
                auth.active_field_mut().pop();
            }
            AppAction::Input(ch) => auth.active_field_mut().push(ch),
            AppAction::Submit => self.submit_auth(),
            _ => {}
        }
    }

    fn submit_auth(&mut self) {
        if self.state.auth.submitting {
            return;
        }
        let auth = &self.state.auth;
        let action = match auth.mode {
            AuthMode::Login => PendingAction::Login {
                email: auth.email.clone(),
                password: auth.password.clone(),
            },
            AuthMode::Register => PendingAction::Register {
                email: auth.email.clone(),
                password: auth.password.clone(),
                name: auth.name.clone(),
            },
        };
        if self.queue(action) {
            self.state.auth.submitting = true;
            self.state.auth.error = None;
        }
    }

    fn handle_dashboard_key(&mut self, action: AppAction) {
        if self.state.dashboard.form.is_some() {
            self.handle_form_key(action);
            return;
        }
        if let Some(id) = self.state.dashboard.confirm_delete.clone() {
            match action {
                AppAction::Input('y' | 'Y') => {
                    self.state.dashboard.confirm_delete = None;
                    self.queue_mutation(PendingAction::Delete { id });
                }
                AppAction::Input('n' | 'N') | AppAction::Cancel => {
                    self.state.dashboard.confirm_delete = None;
                }
                _ => {}
            }
            return;
        }
        if self.state.dashboard.help {
            if matches!(action, AppAction::Cancel | AppAction::Input('?' | 'q')) {
                self.state.dashboard.help = false;
            }
            return;
        }

        match action {
            AppAction::Input('q') => self.should_quit = true,
            AppAction::Input('?') => self.state.dashboard.help = true,
            AppAction::Input('a') => {
                self.state.dashboard.form = Some(ExpenseForm::new(self.today()));
            }
            AppAction::Input('e') | AppAction::Submit => {
                if let Some(expense) = self.state.selected_expense() {
                    self.state.dashboard.form = Some(ExpenseForm::edit(expense));
                }
            }
            AppAction::Input('d') => {
                if let Some(id) = self.state.selected_expense().map(|e| e.id.clone()) {
                    if self.state.prefs.confirm_delete {
                        self.state.dashboard.confirm_delete = Some(id);
                    } else {
                        self.queue_mutation(PendingAction::Delete { id });
                    }
                }
            }
            AppAction::Input('r') => self.queue_mutation(PendingAction::Refresh),
            AppAction::Input('l') => {
                self.queue(PendingAction::Logout);
            }
            AppAction::Input('j') | AppAction::Down => self.select_next(),
            AppAction::Input('k') | AppAction::Up => self.select_prev(),
            AppAction::Cancel => self.state.dashboard.error = None,
            _ => {}
        }
    }

    fn handle_form_key(&mut self, action: AppAction) {
        let Some(form) = self.state.dashboard.form.as_mut() else {
            return;
        };
        match action {
            AppAction::Cancel => self.state.dashboard.form = None,
            AppAction::NextField | AppAction::Down => form.focus_next(),
            AppAction::PrevField | AppAction::Up => form.focus_prev(),
            AppAction::Left if form.focus == FormField::Category => {
                form.category = form.category.prev();
            }
            AppAction::Right if form.focus == FormField::Category => {
                form.category = form.category.next();
            }
            AppAction::Backspace => {
                if let Some(text) = form.active_text_mut() {
                    text.pop();
                }
            }
            AppAction::Input(ch) => {
                if let Some(text) = form.active_text_mut() {
                    text.push(ch);
                }
            }
            AppAction::Submit => self.submit_form(),
            _ => {}
        }
    }

    fn submit_form(&mut self) {
        let Some(form) = self.state.dashboard.form.as_ref() else {
            return;
        };
        let draft = match form.draft() {
            Ok(draft) => draft,
            Err(err) => {
                if let Some(form) = self.state.dashboard.form.as_mut() {
                    form.error = Some(err.to_string());
                }
                return;
            }
        };

        let action = match &form.target {
            None => PendingAction::Create(draft),
            Some(id) => {
                let Some(current) = self.state.expenses.get(id) else {
                    self.state.dashboard.form = None;
                    return;
                };
                let patch = ExpensePatch::between(current, &draft);
                if patch.is_empty() {
                    self.state.dashboard.form = None;
                    return;
                }
                PendingAction::Update {
                    id: id.clone(),
                    patch,
                }
            }
        };
        self.queue_mutation(action);
    }

    fn queue_mutation(&mut self, action: PendingAction) {
        if self.queue(action) {
            self.state.dashboard.loading = true;
        }
    }

    fn select_next(&mut self) {
        let len = self.state.expenses.items().len();
        if len == 0 {
            return;
        }
        self.state.dashboard.selected = (self.state.dashboard.selected + 1).min(len - 1);
    }

    fn select_prev(&mut self) {
        self.state.dashboard.selected = self.state.dashboard.selected.saturating_sub(1);
    }

    async fn perform(&mut self, action: PendingAction) {
        match action {
            PendingAction::RestoreSession => {
                if self.state.session.restore(&self.backend).await.is_some() {
                    self.enter_dashboard();
                } else {
                    self.state.screen = Screen::Auth;
                }
            }
            PendingAction::Login { email, password } => {
                let result = self
                    .state
                    .session
                    .login(&self.backend, &email, &password)
                    .await
                    .map(|_| ());
                self.finish_auth(result);
            }
            PendingAction::Register {
                email,
                password,
                name,
            } => {
                let result = self
                    .state
                    .session
                    .register(&self.backend, &email, &password, &name)
                    .await
                    .map(|_| ());
                self.finish_auth(result);
            }
            PendingAction::Logout => {
                self.state.session.logout(&self.backend).await;
                self.state.expenses.clear();
                self.state.dashboard = DashboardState::default();
                self.state.last_refresh = None;
                self.state.auth = AuthState::new(&self.state.auth.email);
                self.state.screen = Screen::Auth;
                self.recompute();
            }
            PendingAction::Refresh => self.refresh().await,
            PendingAction::Create(draft) => {
                let result = match self.user_id() {
                    Some(user_id) => self
                        .state
                        .expenses
                        .create(&self.backend, &user_id, draft)
                        .await
                        .map(|expense| expense.id),
                    None => Err(EngineError::NotAuthenticated),
                };
                self.finish_mutation(result);
            }
            PendingAction::Update { id, patch } => {
                let result = self
                    .state
                    .expenses
                    .update(&self.backend, &id, patch)
                    .await
                    .map(|expense| expense.id);
                self.finish_mutation(result);
            }
            PendingAction::Delete { id } => {
                let result = self
                    .state
                    .expenses
                    .delete(&self.backend, &id)
                    .await
                    .map(|()| id);
                self.finish_mutation(result);
            }
        }
    }

    fn finish_auth(&mut self, result: std::result::Result<(), EngineError>) {
        self.state.auth.submitting = false;
        match result {
            Ok(()) => {
                self.state.auth.password.clear();
                self.state.auth.error = None;
                self.enter_dashboard();
            }
            Err(err) => self.state.auth.error = Some(err.to_string()),
        }
    }

    /// Switches to the dashboard and schedules the first fetch.
    fn enter_dashboard(&mut self) {
        self.state.screen = Screen::Dashboard;
        self.state.dashboard = DashboardState {
            loading: true,
            ..DashboardState::default()
        };
        self.pending = Some(PendingAction::Refresh);
    }

    async fn refresh(&mut self) {
        match self.user_id() {
            Some(user_id) => {
                let result = self.state.expenses.fetch_all(&self.backend, &user_id).await;
                self.state.dashboard.error = result.err().map(|err| err.to_string());
                self.state.last_refresh =
                    Some(Utc::now().with_timezone(&self.state.prefs.timezone));
            }
            None => self.state.dashboard.error = Some(EngineError::NotAuthenticated.to_string()),
        }
        self.state.dashboard.loading = false;
        self.recompute();
    }

    /// `Ok` carries the id of the expense to select, if it still exists.
    fn finish_mutation(&mut self, result: std::result::Result<String, EngineError>) {
        self.state.dashboard.loading = false;
        match result {
            Ok(id) => {
                self.state.dashboard.form = None;
                self.state.dashboard.error =
                    self.state.expenses.error().map(str::to_string);
                if let Some(index) = self
                    .state
                    .expenses
                    .items()
                    .iter()
                    .position(|expense| expense.id == id)
                {
                    self.state.dashboard.selected = index;
                }
            }
            Err(err) => {
                let message = err.to_string();
                match self.state.dashboard.form.as_mut() {
                    Some(form) => form.error = Some(message),
                    None => self.state.dashboard.error = Some(message),
                }
            }
        }
        self.recompute();
    }

    /// Recomputes statistics and keeps the selection inside the list.
    fn recompute(&mut self) {
        let today = self.today();
        self.state.stats = self
            .state
            .expenses
            .statistics(today, self.state.prefs.week_start);
        let len = self.state.expenses.items().len();
        self.state.dashboard.selected = self.state.dashboard.selected.min(len.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyModifiers};
    use engine::{Money, memory::MemoryBackend};

    use super::*;

    fn press(app: &mut App<MemoryBackend>, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App<MemoryBackend>, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    async fn settle(app: &mut App<MemoryBackend>) {
        while let Some(action) = app.pending.take() {
            app.perform(action).await;
        }
    }

    async fn started(config: AppConfig) -> App<MemoryBackend> {
        let backend = MemoryBackend::new().with_account("user@example.com", "secret123", "User");
        let mut app = App::new(&config, backend).unwrap();
        settle(&mut app).await;
        app
    }

    fn config() -> AppConfig {
        AppConfig {
            email: "user@example.com".to_string(),
            ..AppConfig::default()
        }
    }

    async fn signed_in() -> App<MemoryBackend> {
        let mut app = started(config()).await;
        type_text(&mut app, "secret123");
        press(&mut app, KeyCode::Enter);
        settle(&mut app).await;
        assert_eq!(app.state.screen, Screen::Dashboard);
        app
    }

    #[tokio::test]
    async fn starts_on_auth_without_session() {
        let app = started(config()).await;
        assert_eq!(app.state.screen, Screen::Auth);
        assert_eq!(app.state.auth.focus, AuthField::Password);
    }

    #[tokio::test]
    async fn valid_login_reaches_dashboard() {
        let app = signed_in().await;
        assert_eq!(
            app.state.session.user().map(|u| u.email.as_str()),
            Some("user@example.com")
        );
        assert!(!app.state.dashboard.loading);
        assert!(app.state.last_refresh.is_some());
        assert!(app.state.auth.password.is_empty());
    }

    #[tokio::test]
    async fn invalid_login_stays_on_auth() {
        let mut app = started(config()).await;
        type_text(&mut app, "wrong");
        press(&mut app, KeyCode::Enter);
        assert!(app.state.auth.submitting);
        settle(&mut app).await;

        assert_eq!(app.state.screen, Screen::Auth);
        assert_eq!(app.state.auth.error.as_deref(), Some("Invalid credentials"));
        assert!(!app.state.auth.submitting);
        assert!(app.state.session.user().is_none());
    }

    #[tokio::test]
    async fn second_submit_while_pending_is_dropped() {
        let mut app = started(config()).await;
        type_text(&mut app, "secret123");
        press(&mut app, KeyCode::Enter);
        let first = app.pending.clone();
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.pending, first);
    }

    #[tokio::test]
    async fn q_is_text_on_the_auth_screen() {
        let mut app = started(AppConfig::default()).await;
        type_text(&mut app, "q@x.io");
        assert!(!app.should_quit);
        assert_eq!(app.state.auth.email, "q@x.io");
    }

    #[tokio::test]
    async fn register_then_dashboard() {
        let mut app = started(AppConfig::default()).await;
        app.handle_key(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL));
        assert_eq!(app.state.auth.mode, AuthMode::Register);

        type_text(&mut app, "New");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "new@example.com");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "password1");
        press(&mut app, KeyCode::Enter);
        settle(&mut app).await;

        assert_eq!(app.state.screen, Screen::Dashboard);
        assert_eq!(app.state.session.user().map(|u| u.name.as_str()), Some("New"));
    }

    #[tokio::test]
    async fn add_edit_delete_updates_list_and_stats() {
        let mut app = signed_in().await;

        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "42.50");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Lunch");
        press(&mut app, KeyCode::Enter);
        settle(&mut app).await;

        assert!(app.state.dashboard.form.is_none());
        let items = app.state.expenses.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].amount, Money::new(4250));
        assert_eq!(items[0].description, "Lunch");
        assert_eq!(app.state.stats.total, Money::new(4250));
        assert_eq!(app.state.stats.this_month, Money::new(4250));

        press(&mut app, KeyCode::Char('e'));
        for _ in 0..5 {
            press(&mut app, KeyCode::Backspace);
        }
        type_text(&mut app, "50.00");
        press(&mut app, KeyCode::Enter);
        settle(&mut app).await;

        assert_eq!(app.state.expenses.items()[0].amount, Money::new(5000));
        assert_eq!(app.state.stats.total, Money::new(5000));

        press(&mut app, KeyCode::Char('d'));
        assert!(app.state.dashboard.confirm_delete.is_some());
        press(&mut app, KeyCode::Char('y'));
        settle(&mut app).await;

        assert!(app.state.expenses.items().is_empty());
        assert_eq!(app.state.stats.total, Money::ZERO);
    }

    #[tokio::test]
    async fn escape_discards_the_form() {
        let mut app = signed_in().await;
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "10");
        press(&mut app, KeyCode::Esc);
        settle(&mut app).await;

        assert!(app.state.dashboard.form.is_none());
        assert!(app.state.expenses.items().is_empty());
    }

    #[tokio::test]
    async fn category_cycles_with_arrows() {
        let mut app = signed_in().await;
        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Left);
        let form = app.state.dashboard.form.as_ref().unwrap();
        assert_eq!(form.category, engine::Category::Rent);
    }

    #[tokio::test]
    async fn invalid_amount_is_shown_in_the_form() {
        let mut app = signed_in().await;
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "abc");
        press(&mut app, KeyCode::Enter);

        let form = app.state.dashboard.form.as_ref().unwrap();
        assert!(form.error.as_deref().unwrap().starts_with("Invalid amount"));
        assert!(app.pending.is_none());
    }

    #[tokio::test]
    async fn failed_save_keeps_form_open_with_error() {
        let mut app = signed_in().await;
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "12");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Taxi");
        app.backend.set_offline(true);
        press(&mut app, KeyCode::Enter);
        settle(&mut app).await;

        let form = app.state.dashboard.form.as_ref().unwrap();
        assert!(form.error.as_deref().unwrap().starts_with("Failed to save changes"));
        assert!(app.state.expenses.items().is_empty());
    }

    #[tokio::test]
    async fn declining_delete_keeps_the_expense() {
        let mut app = signed_in().await;
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "5");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Coffee");
        press(&mut app, KeyCode::Enter);
        settle(&mut app).await;

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('n'));
        settle(&mut app).await;
        assert_eq!(app.state.expenses.items().len(), 1);
    }

    #[tokio::test]
    async fn refresh_failure_empties_the_list() {
        let mut app = signed_in().await;
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "5");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Coffee");
        press(&mut app, KeyCode::Enter);
        settle(&mut app).await;

        app.backend.set_offline(true);
        press(&mut app, KeyCode::Char('r'));
        assert!(app.state.dashboard.loading);
        settle(&mut app).await;

        assert!(app.state.expenses.items().is_empty());
        assert!(app.state.dashboard.error.is_some());
        assert_eq!(app.state.stats.total, Money::ZERO);
    }

    #[tokio::test]
    async fn logout_returns_to_auth() {
        let mut app = signed_in().await;
        press(&mut app, KeyCode::Char('l'));
        settle(&mut app).await;

        assert_eq!(app.state.screen, Screen::Auth);
        assert!(app.state.session.user().is_none());
        assert!(app.state.expenses.items().is_empty());
        assert_eq!(app.state.auth.email, "user@example.com");
    }

    #[tokio::test]
    async fn restored_session_skips_auth() {
        let backend = MemoryBackend::new().with_account("user@example.com", "secret123", "User");
        backend
            .session_create("user@example.com", "secret123")
            .await
            .unwrap();
        let mut app = App::new(&config(), backend).unwrap();
        settle(&mut app).await;
        assert_eq!(app.state.screen, Screen::Dashboard);
    }
}
