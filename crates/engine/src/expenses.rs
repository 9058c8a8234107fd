//! Expense-collection layer: the signed-in user's expenses.
//!
//! The store keeps the last fetched list and keeps it in step with every
//! mutation, either by splicing the remote's answer into the list or by
//! fetching the whole collection again ([`SyncMode`]).

use api_types::{permission::Permission, query::Query};
use chrono::{NaiveDate, Utc, Weekday};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    EngineError, Expense, ExpenseDraft, ExpensePatch, ResultEngine,
    backend::{Backend, BackendError, Collection},
    stats::Statistics,
};

/// Documents requested per list call.
pub const PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListOrder {
    /// Newest `created_at` first.
    #[default]
    NewestFirst,
    /// Whatever order the remote returns.
    Server,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    #[default]
    Splice,
    Refetch,
}

#[derive(Debug, Clone)]
pub struct ExpenseSettings {
    pub collection: Collection,
    pub order: ListOrder,
    pub sync: SyncMode,
    /// Grant read/update/delete on each new document to its owner only.
    pub owner_permissions: bool,
}

impl ExpenseSettings {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            order: ListOrder::default(),
            sync: SyncMode::default(),
            owner_permissions: true,
        }
    }
}

#[derive(Debug)]
pub struct ExpenseStore {
    settings: ExpenseSettings,
    items: Vec<Expense>,
    error: Option<String>,
    owner: Option<String>,
}

fn mutation_error(operation: &str, err: BackendError) -> EngineError {
    tracing::warn!("expense {operation} failed: {err}");
    EngineError::Mutation(err)
}

fn encode<T: serde::Serialize>(fields: T) -> ResultEngine<serde_json::Value> {
    serde_json::to_value(fields).map_err(|err| EngineError::Validation(err.to_string()))
}

impl ExpenseStore {
    pub fn new(settings: ExpenseSettings) -> Self {
        Self {
            settings,
            items: Vec::new(),
            error: None,
            owner: None,
        }
    }

    pub fn settings(&self) -> &ExpenseSettings {
        &self.settings
    }

    pub fn items(&self) -> &[Expense] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&Expense> {
        self.items.iter().find(|expense| expense.id == id)
    }

    /// Message of the last failed fetch, cleared by the next successful one.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn statistics(&self, today: NaiveDate, week_start: Weekday) -> Statistics {
        Statistics::compute(&self.items, today, week_start)
    }

    /// Forgets everything, e.g. after logout.
    pub fn clear(&mut self) {
        self.items.clear();
        self.error = None;
        self.owner = None;
    }

    /// Replaces the list with every expense owned by `user_id`.
    ///
    /// On failure the list is emptied and the error flag set; nothing is
    /// retried.
    pub async fn fetch_all<B: Backend>(
        &mut self,
        backend: &B,
        user_id: &str,
    ) -> ResultEngine<&[Expense]> {
        self.owner = Some(user_id.to_string());
        match self.load(backend, user_id).await {
            Ok(items) => {
                tracing::debug!(count = items.len(), "expenses loaded");
                self.items = items;
                self.error = None;
                Ok(&self.items)
            }
            Err(err) => {
                tracing::warn!("failed to load expenses: {err}");
                self.items.clear();
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn load<B: Backend>(&self, backend: &B, user_id: &str) -> ResultEngine<Vec<Expense>> {
        let mut items = Vec::new();
        let mut offset = 0;

        loop {
            let mut queries = vec![Query::equal("userId", user_id)];
            if self.settings.order == ListOrder::NewestFirst {
                queries.push(Query::order_desc("createdAt"));
            }
            queries.push(Query::limit(PAGE_SIZE));
            queries.push(Query::offset(offset));

            let page = backend
                .list_documents(&self.settings.collection, &queries)
                .await
                .map_err(EngineError::Fetch)?;

            let received = page.documents.len() as u64;
            for document in &page.documents {
                match Expense::try_from(document) {
                    Ok(expense) => items.push(expense),
                    Err(err) => tracing::warn!("skipping expense: {err}"),
                }
            }

            offset += received;
            if received == 0 || offset >= page.total {
                break;
            }
        }

        Ok(items)
    }

    pub async fn create<B: Backend>(
        &mut self,
        backend: &B,
        user_id: &str,
        draft: ExpenseDraft,
    ) -> ResultEngine<Expense> {
        let id = Uuid::new_v4().simple().to_string();
        let data = encode(draft.into_fields(user_id, Utc::now()))?;
        let permissions = if self.settings.owner_permissions {
            Permission::owner_only(user_id)
        } else {
            Vec::new()
        };

        let document = backend
            .create_document(&self.settings.collection, &id, data, &permissions)
            .await
            .map_err(|err| mutation_error("create", err))?;
        let expense = Expense::try_from(&document)?;
        tracing::info!(expense_id = %expense.id, "expense created");

        self.owner = Some(user_id.to_string());
        match self.settings.sync {
            SyncMode::Splice => {
                self.items.push(expense.clone());
                self.arrange();
            }
            SyncMode::Refetch => self.refetch(backend).await,
        }
        Ok(expense)
    }

    /// Sends only the patched fields plus a fresh update timestamp.
    pub async fn update<B: Backend>(
        &mut self,
        backend: &B,
        id: &str,
        patch: ExpensePatch,
    ) -> ResultEngine<Expense> {
        patch.validate()?;

        let now = Utc::now();
        let updated_at = self
            .get(id)
            .map_or(now, |current| now.max(current.updated_at));
        let data = encode(patch.into_fields(updated_at))?;

        let document = backend
            .update_document(&self.settings.collection, id, data)
            .await
            .map_err(|err| mutation_error("update", err))?;
        let expense = Expense::try_from(&document)?;
        tracing::info!(expense_id = %expense.id, "expense updated");

        match self.settings.sync {
            SyncMode::Splice => {
                match self.items.iter_mut().find(|item| item.id == expense.id) {
                    Some(slot) => *slot = expense.clone(),
                    None => self.items.push(expense.clone()),
                }
                self.arrange();
            }
            SyncMode::Refetch => self.refetch(backend).await,
        }
        Ok(expense)
    }

    pub async fn delete<B: Backend>(&mut self, backend: &B, id: &str) -> ResultEngine<()> {
        backend
            .delete_document(&self.settings.collection, id)
            .await
            .map_err(|err| mutation_error("delete", err))?;
        tracing::info!(expense_id = %id, "expense deleted");

        match self.settings.sync {
            SyncMode::Splice => self.items.retain(|item| item.id != id),
            SyncMode::Refetch => self.refetch(backend).await,
        }
        Ok(())
    }

    /// A failed re-fetch after a successful mutation only sets the error flag.
    async fn refetch<B: Backend>(&mut self, backend: &B) {
        if let Some(owner) = self.owner.clone() {
            let _ = self.fetch_all(backend, &owner).await;
        }
    }

    fn arrange(&mut self) {
        if self.settings.order == ListOrder::NewestFirst {
            self.items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
    }
}
