use chrono::NaiveDate;
use engine::{Category, Expense, ExpenseDraft, ResultEngine};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

impl AuthMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Login => Self::Register,
            Self::Register => Self::Login,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Login => "Sign in",
            Self::Register => "Create account",
        }
    }

    pub fn fields(self) -> &'static [AuthField] {
        match self {
            Self::Login => &[AuthField::Email, AuthField::Password],
            Self::Register => &[AuthField::Name, AuthField::Email, AuthField::Password],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthField {
    Email,
    Password,
    Name,
}

#[derive(Debug)]
pub struct AuthState {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    pub name: String,
    pub focus: AuthField,
    /// Set from submit until the remote answers.
    pub submitting: bool,
    pub error: Option<String>,
}

impl AuthState {
    pub fn new(email: &str) -> Self {
        let focus = if email.is_empty() {
            AuthField::Email
        } else {
            AuthField::Password
        };
        Self {
            mode: AuthMode::Login,
            email: email.to_string(),
            password: String::new(),
            name: String::new(),
            focus,
            submitting: false,
            error: None,
        }
    }

    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
        self.focus = self.mode.fields()[0];
        self.error = None;
    }

    pub fn focus_next(&mut self) {
        self.focus = cycle(self.mode.fields(), self.focus, 1);
    }

    pub fn focus_prev(&mut self) {
        let fields = self.mode.fields();
        self.focus = cycle(fields, self.focus, fields.len() - 1);
    }

    pub fn active_field_mut(&mut self) -> &mut String {
        match self.focus {
            AuthField::Email => &mut self.email,
            AuthField::Password => &mut self.password,
            AuthField::Name => &mut self.name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Amount,
    Category,
    Description,
    Date,
}

impl FormField {
    pub const ALL: [FormField; 4] = [
        Self::Amount,
        Self::Category,
        Self::Description,
        Self::Date,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Amount => "Amount",
            Self::Category => "Category",
            Self::Description => "Description",
            Self::Date => "Date",
        }
    }
}

/// Add/edit modal of the dashboard. Field values stay raw text until save.
#[derive(Debug, Clone)]
pub struct ExpenseForm {
    /// Expense being edited; `None` creates a new one.
    pub target: Option<String>,
    pub amount: String,
    pub category: Category,
    pub description: String,
    pub date: String,
    pub focus: FormField,
    pub error: Option<String>,
}

impl ExpenseForm {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            target: None,
            amount: String::new(),
            category: Category::default(),
            description: String::new(),
            date: today.format("%Y-%m-%d").to_string(),
            focus: FormField::Amount,
            error: None,
        }
    }

    pub fn edit(expense: &Expense) -> Self {
        Self {
            target: Some(expense.id.clone()),
            amount: expense.amount.to_string(),
            category: expense.category,
            description: expense.description.clone(),
            date: expense.date.format("%Y-%m-%d").to_string(),
            focus: FormField::Amount,
            error: None,
        }
    }

    pub fn title(&self) -> &'static str {
        if self.target.is_some() {
            "Edit expense"
        } else {
            "New expense"
        }
    }

    pub fn focus_next(&mut self) {
        self.focus = cycle(&FormField::ALL, self.focus, 1);
    }

    pub fn focus_prev(&mut self) {
        self.focus = cycle(&FormField::ALL, self.focus, FormField::ALL.len() - 1);
    }

    /// Text of the focused field; the category is picked, not typed.
    pub fn active_text_mut(&mut self) -> Option<&mut String> {
        match self.focus {
            FormField::Amount => Some(&mut self.amount),
            FormField::Category => None,
            FormField::Description => Some(&mut self.description),
            FormField::Date => Some(&mut self.date),
        }
    }

    pub fn draft(&self) -> ResultEngine<ExpenseDraft> {
        ExpenseDraft::parse(&self.amount, self.category, &self.description, &self.date)
    }
}

fn cycle<T: Copy + PartialEq>(items: &[T], current: T, step: usize) -> T {
    let index = items.iter().position(|item| *item == current).unwrap_or(0);
    items[(index + step) % items.len()]
}

#[cfg(test)]
mod tests {
    use engine::Money;

    use super::*;

    #[test]
    fn register_mode_adds_name_field() {
        let mut auth = AuthState::new("");
        auth.toggle_mode();
        assert_eq!(auth.mode, AuthMode::Register);
        assert_eq!(auth.focus, AuthField::Name);
        auth.focus_prev();
        assert_eq!(auth.focus, AuthField::Password);
        auth.toggle_mode();
        auth.focus = AuthField::Password;
        auth.focus_next();
        assert_eq!(auth.focus, AuthField::Email);
    }

    #[test]
    fn form_builds_draft_from_text() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let mut form = ExpenseForm::new(today);
        form.amount = "42,5".to_string();
        form.description = "Lunch".to_string();
        form.category = form.category.next();

        let draft = form.draft().unwrap();
        assert_eq!(draft.amount, Money::new(4250));
        assert_eq!(draft.category, Category::Rent);
        assert_eq!(draft.date, today);

        form.focus = FormField::Category;
        assert!(form.active_text_mut().is_none());
    }
}
