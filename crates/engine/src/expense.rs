use api_types::{
    document::Document,
    expense::{Category, ExpenseFields, ExpensePatchFields},
};
use chrono::{DateTime, NaiveDate, Utc};

use crate::{EngineError, Money, ResultEngine, backend::BackendError};

/// An expense record owned by one user.
#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    pub id: String,
    pub user_id: String,
    pub amount: Money,
    pub category: Category,
    pub description: String,
    /// Day the expense occurred.
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<&Document> for Expense {
    type Error = EngineError;

    fn try_from(document: &Document) -> ResultEngine<Self> {
        let malformed = |reason: String| {
            EngineError::Backend(BackendError::Server(format!(
                "malformed expense {}: {reason}",
                document.id
            )))
        };
        let fields: ExpenseFields = document.decode().map_err(|err| malformed(err.to_string()))?;
        let amount = Money::from_f64(fields.amount).map_err(|err| malformed(err.to_string()))?;

        Ok(Self {
            id: document.id.clone(),
            user_id: fields.user_id,
            amount,
            category: fields.category,
            description: fields.description,
            date: fields.date,
            created_at: fields.created_at,
            updated_at: fields.updated_at,
        })
    }
}

/// Validated input for a new expense.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseDraft {
    pub amount: Money,
    pub category: Category,
    pub description: String,
    pub date: NaiveDate,
}

impl ExpenseDraft {
    pub fn new(
        amount: Money,
        category: Category,
        description: &str,
        date: NaiveDate,
    ) -> ResultEngine<Self> {
        if amount.is_negative() {
            return Err(EngineError::InvalidAmount(
                "amount cannot be negative".to_string(),
            ));
        }
        let description = description.trim();
        if description.is_empty() {
            return Err(EngineError::Validation("Description is required".to_string()));
        }
        Ok(Self {
            amount,
            category,
            description: description.to_string(),
            date,
        })
    }

    /// Builds a draft from raw form text.
    pub fn parse(
        amount: &str,
        category: Category,
        description: &str,
        date: &str,
    ) -> ResultEngine<Self> {
        let amount = amount.parse::<Money>()?;
        let date = date.trim();
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
            EngineError::InvalidDate(format!("\"{date}\", expected YYYY-MM-DD"))
        })?;
        Self::new(amount, category, description, date)
    }

    pub(crate) fn into_fields(self, user_id: &str, now: DateTime<Utc>) -> ExpenseFields {
        ExpenseFields {
            user_id: user_id.to_string(),
            amount: self.amount.to_f64(),
            category: self.category,
            description: self.description,
            date: self.date,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields to change on an existing expense; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpensePatch {
    pub amount: Option<Money>,
    pub category: Option<Category>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
}

impl ExpensePatch {
    /// Patch holding only the fields where `draft` differs from `current`.
    pub fn between(current: &Expense, draft: &ExpenseDraft) -> Self {
        Self {
            amount: (draft.amount != current.amount).then_some(draft.amount),
            category: (draft.category != current.category).then_some(draft.category),
            description: (draft.description != current.description)
                .then(|| draft.description.clone()),
            date: (draft.date != current.date).then_some(draft.date),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.date.is_none()
    }

    pub(crate) fn validate(&self) -> ResultEngine<()> {
        if self.amount.is_some_and(Money::is_negative) {
            return Err(EngineError::InvalidAmount(
                "amount cannot be negative".to_string(),
            ));
        }
        if self
            .description
            .as_deref()
            .is_some_and(|d| d.trim().is_empty())
        {
            return Err(EngineError::Validation("Description is required".to_string()));
        }
        Ok(())
    }

    pub(crate) fn into_fields(self, updated_at: DateTime<Utc>) -> ExpensePatchFields {
        ExpensePatchFields {
            amount: self.amount.map(Money::to_f64),
            category: self.category,
            description: self.description.map(|d| d.trim().to_string()),
            date: self.date,
            updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn draft_parses_form_text() {
        let draft = ExpenseDraft::parse("42.50", Category::Food, " Lunch ", "2026-10-16").unwrap();
        assert_eq!(draft.amount, Money::new(4250));
        assert_eq!(draft.description, "Lunch");
        assert_eq!(draft.date, day("2026-10-16"));
    }

    #[test]
    fn draft_rejects_invalid_input() {
        assert!(matches!(
            ExpenseDraft::parse("-1", Category::Food, "x", "2026-10-16"),
            Err(EngineError::InvalidAmount(_))
        ));
        assert!(matches!(
            ExpenseDraft::parse("1", Category::Food, "  ", "2026-10-16"),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            ExpenseDraft::parse("1", Category::Food, "x", "16/10/2026"),
            Err(EngineError::InvalidDate(_))
        ));
        assert!(matches!(
            ExpenseDraft::parse("90071992547409.93", Category::Food, "x", "2026-10-16"),
            Err(EngineError::InvalidAmount(_))
        ));
    }

    #[test]
    fn unknown_category_is_a_malformed_document() {
        let document: Document = serde_json::from_value(serde_json::json!({
            "$id": "e1",
            "$createdAt": "2026-10-16T10:00:00Z",
            "$updatedAt": "2026-10-16T10:00:00Z",
            "userId": "u1",
            "amount": 12.5,
            "category": "groceries",
            "description": "Milk",
            "date": "2026-10-16",
            "createdAt": "2026-10-16T10:00:00Z",
            "updatedAt": "2026-10-16T10:00:00Z",
        }))
        .unwrap();

        let err = Expense::try_from(&document).unwrap_err();
        assert!(matches!(
            &err,
            EngineError::Backend(BackendError::Server(message)) if message.contains("e1")
        ));
    }

    #[test]
    fn patch_between_keeps_only_changes() {
        let now = Utc::now();
        let current = Expense {
            id: "e1".to_string(),
            user_id: "u1".to_string(),
            amount: Money::new(4250),
            category: Category::Food,
            description: "Lunch".to_string(),
            date: day("2026-10-16"),
            created_at: now,
            updated_at: now,
        };
        let draft = ExpenseDraft::parse("50.00", Category::Food, "Lunch", "2026-10-16").unwrap();

        let patch = ExpensePatch::between(&current, &draft);
        assert_eq!(
            patch,
            ExpensePatch {
                amount: Some(Money::new(5000)),
                ..Default::default()
            }
        );

        let fields = serde_json::to_value(patch.into_fields(now)).unwrap();
        let keys: Vec<_> = fields.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["amount", "updatedAt"]);
    }
}
