//! In-process implementation of [`Backend`].
//!
//! Mirrors the remote service closely enough for the engine and UI test
//! suites: accounts with one current session, per-collection documents with
//! per-document permissions, and the `equal` / `order*` / `limit` / `offset`
//! queries the engine issues.

use std::{
    cmp::Ordering,
    sync::{Mutex, MutexGuard},
};

use api_types::{
    document::{Document, DocumentList},
    permission::{Action, Permission, Role},
    query::Query,
    user::{AccountNew, Session, User},
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::backend::{Backend, BackendError, BackendResult, Collection};

/// Page size the remote applies when a list call carries no `limit`.
pub const DEFAULT_LIST_LIMIT: u64 = 25;

#[derive(Debug)]
struct Account {
    user: User,
    password: String,
}

#[derive(Debug)]
struct Stored {
    collection: Collection,
    document: Document,
}

#[derive(Debug, Default)]
struct Inner {
    accounts: Vec<Account>,
    current: Option<String>,
    documents: Vec<Stored>,
    offline: bool,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an account without opening a session.
    pub fn with_account(self, email: &str, password: &str, name: &str) -> Self {
        if let Ok(mut inner) = self.inner.lock() {
            inner.accounts.push(Account {
                user: User {
                    id: Uuid::new_v4().simple().to_string(),
                    name: name.to_string(),
                    email: email.to_string(),
                },
                password: password.to_string(),
            });
        }
        self
    }

    /// While offline every call fails with [`BackendError::Transport`].
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.offline = offline;
        }
    }

    /// All documents of a collection, ignoring permissions.
    pub fn documents(&self, collection: &Collection) -> Vec<Document> {
        self.inner
            .lock()
            .map(|inner| {
                inner
                    .documents
                    .iter()
                    .filter(|stored| &stored.collection == collection)
                    .map(|stored| stored.document.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn lock(&self) -> BackendResult<MutexGuard<'_, Inner>> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| BackendError::Server("backend state poisoned".to_string()))?;
        if inner.offline {
            return Err(BackendError::Transport("connection refused".to_string()));
        }
        Ok(inner)
    }
}

impl Inner {
    fn session_user(&self) -> BackendResult<&User> {
        let id = self.current.as_deref().ok_or_else(|| {
            BackendError::Unauthorized("User (role: guests) missing scope (account)".to_string())
        })?;
        self.accounts
            .iter()
            .map(|account| &account.user)
            .find(|user| user.id == id)
            .ok_or_else(|| BackendError::Unauthorized("session user not found".to_string()))
    }

    fn find_mut(&mut self, collection: &Collection, id: &str) -> BackendResult<&mut Document> {
        self.documents
            .iter_mut()
            .find(|stored| &stored.collection == collection && stored.document.id == id)
            .map(|stored| &mut stored.document)
            .ok_or_else(|| {
                BackendError::NotFound(
                    "Document with the requested ID could not be found.".to_string(),
                )
            })
    }
}

fn allows(document: &Document, action: Action, user_id: &str) -> bool {
    // Documents without their own permissions fall back to the collection,
    // which grants every signed-in user full access.
    if document.permissions.is_empty() {
        return true;
    }
    document
        .permissions
        .iter()
        .filter_map(|raw| raw.parse::<Permission>().ok())
        .any(|p| {
            p.action == action
                && match &p.role {
                    Role::Any | Role::Users => true,
                    Role::User(id) => id == user_id,
                }
        })
}

fn unauthorized_action() -> BackendError {
    BackendError::Unauthorized(
        "The current user is not authorized to perform the requested action.".to_string(),
    )
}

fn attribute(document: &Document, name: &str) -> Option<Value> {
    match name {
        "$id" => Some(Value::String(document.id.clone())),
        "$createdAt" => Some(Value::String(document.created_at.to_rfc3339())),
        "$updatedAt" => Some(Value::String(document.updated_at.to_rfc3339())),
        other => document.data.get(other).cloned(),
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => {
            match (
                DateTime::parse_from_rfc3339(a),
                DateTime::parse_from_rfc3339(b),
            ) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => a.cmp(b),
            }
        }
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

impl Backend for MemoryBackend {
    async fn account_get(&self) -> BackendResult<User> {
        let inner = self.lock()?;
        inner.session_user().cloned()
    }

    async fn account_create(&self, account: AccountNew) -> BackendResult<User> {
        let mut inner = self.lock()?;
        if !account.email.contains('@') {
            return Err(BackendError::Validation(
                "Invalid `email` param: Value must be a valid email address".to_string(),
            ));
        }
        if !(8..=256).contains(&account.password.chars().count()) {
            return Err(BackendError::Validation(
                "Invalid `password` param: Password must be between 8 and 256 characters long."
                    .to_string(),
            ));
        }
        let taken = inner.accounts.iter().any(|existing| {
            existing.user.id == account.user_id
                || existing.user.email.eq_ignore_ascii_case(&account.email)
        });
        if taken {
            return Err(BackendError::Conflict(
                "A user with the same id, email, or phone already exists in this project."
                    .to_string(),
            ));
        }

        let user = User {
            id: account.user_id,
            name: account.name,
            email: account.email,
        };
        inner.accounts.push(Account {
            user: user.clone(),
            password: account.password,
        });
        Ok(user)
    }

    async fn session_create(&self, email: &str, password: &str) -> BackendResult<Session> {
        let mut inner = self.lock()?;
        let user_id = inner
            .accounts
            .iter()
            .find(|account| {
                account.user.email.eq_ignore_ascii_case(email) && account.password == password
            })
            .map(|account| account.user.id.clone())
            .ok_or_else(|| {
                BackendError::Unauthorized(
                    "Invalid credentials. Please check the email and password.".to_string(),
                )
            })?;
        inner.current = Some(user_id.clone());
        Ok(Session {
            id: Uuid::new_v4().simple().to_string(),
            user_id,
            secret: Uuid::new_v4().simple().to_string(),
            expire: None,
        })
    }

    async fn session_delete(&self) -> BackendResult<()> {
        let mut inner = self.lock()?;
        inner.session_user()?;
        inner.current = None;
        Ok(())
    }

    async fn list_documents(
        &self,
        collection: &Collection,
        queries: &[Query],
    ) -> BackendResult<DocumentList> {
        let inner = self.lock()?;
        let user_id = inner.session_user()?.id.clone();

        let mut documents: Vec<Document> = inner
            .documents
            .iter()
            .filter(|stored| &stored.collection == collection)
            .map(|stored| &stored.document)
            .filter(|doc| allows(doc, Action::Read, &user_id))
            .filter(|doc| {
                queries.iter().all(|query| match query {
                    Query::Equal { attribute: name, values } => attribute(doc, name)
                        .is_some_and(|value| values.contains(&value)),
                    _ => true,
                })
            })
            .cloned()
            .collect();

        // Later order queries break ties of earlier ones.
        for query in queries.iter().rev() {
            match query {
                Query::OrderAsc { attribute: name } => documents.sort_by(|a, b| {
                    compare_values(attribute(a, name).as_ref(), attribute(b, name).as_ref())
                }),
                Query::OrderDesc { attribute: name } => documents.sort_by(|a, b| {
                    compare_values(attribute(b, name).as_ref(), attribute(a, name).as_ref())
                }),
                _ => {}
            }
        }

        let total = documents.len() as u64;
        let mut limit = DEFAULT_LIST_LIMIT;
        let mut offset = 0;
        for query in queries {
            match query {
                Query::Limit { values } => limit = values.first().copied().unwrap_or(limit),
                Query::Offset { values } => offset = values.first().copied().unwrap_or(0),
                _ => {}
            }
        }

        let documents = documents
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok(DocumentList { total, documents })
    }

    async fn create_document(
        &self,
        collection: &Collection,
        document_id: &str,
        data: Value,
        permissions: &[Permission],
    ) -> BackendResult<Document> {
        let mut inner = self.lock()?;
        let user_id = inner.session_user()?.id.clone();

        let Value::Object(data) = data else {
            return Err(BackendError::Validation(
                "Invalid `data` param: Value must be a valid JSON object".to_string(),
            ));
        };
        for permission in permissions {
            let own = match &permission.role {
                Role::Any | Role::Users => true,
                Role::User(id) => id == &user_id,
            };
            if !own {
                return Err(unauthorized_action());
            }
        }
        let exists = inner
            .documents
            .iter()
            .any(|stored| &stored.collection == collection && stored.document.id == document_id);
        if exists {
            return Err(BackendError::Conflict(
                "Document with the requested ID already exists.".to_string(),
            ));
        }

        let now = Utc::now();
        let document = Document {
            id: document_id.to_string(),
            created_at: now,
            updated_at: now,
            permissions: permissions.iter().map(ToString::to_string).collect(),
            data,
        };
        inner.documents.push(Stored {
            collection: collection.clone(),
            document: document.clone(),
        });
        Ok(document)
    }

    async fn update_document(
        &self,
        collection: &Collection,
        document_id: &str,
        data: Value,
    ) -> BackendResult<Document> {
        let mut inner = self.lock()?;
        let user_id = inner.session_user()?.id.clone();

        let Value::Object(patch) = data else {
            return Err(BackendError::Validation(
                "Invalid `data` param: Value must be a valid JSON object".to_string(),
            ));
        };
        let document = inner.find_mut(collection, document_id)?;
        if !allows(document, Action::Update, &user_id) {
            return Err(unauthorized_action());
        }
        document.data.extend(patch);
        document.updated_at = Utc::now();
        Ok(document.clone())
    }

    async fn delete_document(
        &self,
        collection: &Collection,
        document_id: &str,
    ) -> BackendResult<()> {
        let mut inner = self.lock()?;
        let user_id = inner.session_user()?.id.clone();

        let document = inner.find_mut(collection, document_id)?;
        if !allows(document, Action::Delete, &user_id) {
            return Err(unauthorized_action());
        }
        inner.documents.retain(|stored| {
            !(&stored.collection == collection && stored.document.id == document_id)
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn expenses() -> Collection {
        Collection::new("main", "expenses")
    }

    async fn signed_in() -> MemoryBackend {
        let backend = MemoryBackend::new().with_account("a@example.com", "password1", "A");
        backend.session_create("a@example.com", "password1").await.unwrap();
        backend
    }

    #[tokio::test]
    async fn guests_cannot_read_the_account() {
        let backend = MemoryBackend::new().with_account("a@example.com", "password1", "A");
        let err = backend.account_get().await.unwrap_err();
        assert!(matches!(err, BackendError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let backend = MemoryBackend::new().with_account("a@example.com", "password1", "A");
        let err = backend.session_create("a@example.com", "nope").await.unwrap_err();
        assert!(matches!(err, BackendError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let backend = MemoryBackend::new().with_account("a@example.com", "password1", "A");
        let err = backend
            .account_create(AccountNew {
                user_id: "other".to_string(),
                email: "A@example.com".to_string(),
                password: "password2".to_string(),
                name: "B".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Conflict(_)));
    }

    #[tokio::test]
    async fn owner_permissions_hide_documents_from_other_users() {
        let backend = signed_in()
            .await
            .with_account("b@example.com", "password2", "B");
        let owner = backend.account_get().await.unwrap();
        backend
            .create_document(
                &expenses(),
                "d1",
                json!({ "userId": owner.id }),
                &Permission::owner_only(&owner.id),
            )
            .await
            .unwrap();

        backend.session_create("b@example.com", "password2").await.unwrap();
        let list = backend.list_documents(&expenses(), &[]).await.unwrap();
        assert_eq!(list.total, 0);
        let err = backend.delete_document(&expenses(), "d1").await.unwrap_err();
        assert!(matches!(err, BackendError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn queries_filter_order_and_page() {
        let backend = signed_in().await;
        for (id, amount) in [("a", 3), ("b", 1), ("c", 2)] {
            backend
                .create_document(&expenses(), id, json!({ "userId": "u", "amount": amount }), &[])
                .await
                .unwrap();
        }
        backend
            .create_document(&expenses(), "x", json!({ "userId": "other", "amount": 9 }), &[])
            .await
            .unwrap();

        let list = backend
            .list_documents(
                &expenses(),
                &[
                    Query::equal("userId", "u"),
                    Query::order_desc("amount"),
                    Query::limit(2),
                    Query::offset(1),
                ],
            )
            .await
            .unwrap();
        assert_eq!(list.total, 3);
        let ids: Vec<_> = list.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["c", "b"]);
    }

    #[tokio::test]
    async fn ascending_order_breaks_ties_with_later_queries() {
        let backend = signed_in().await;
        let rows = [
            ("a", 2, "2026-10-03"),
            ("b", 1, "2026-10-02"),
            ("c", 2, "2026-10-01"),
        ];
        for (id, amount, day) in rows {
            backend
                .create_document(&expenses(), id, json!({ "amount": amount, "date": day }), &[])
                .await
                .unwrap();
        }

        let list = backend
            .list_documents(
                &expenses(),
                &[Query::order_asc("amount"), Query::order_asc("date")],
            )
            .await
            .unwrap();
        let ids: Vec<_> = list.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[tokio::test]
    async fn update_merges_attributes() {
        let backend = signed_in().await;
        backend
            .create_document(&expenses(), "d1", json!({ "amount": 1, "description": "x" }), &[])
            .await
            .unwrap();
        let doc = backend
            .update_document(&expenses(), "d1", json!({ "amount": 2 }))
            .await
            .unwrap();
        assert_eq!(doc.data["amount"], json!(2));
        assert_eq!(doc.data["description"], json!("x"));
    }

    #[tokio::test]
    async fn offline_fails_with_transport() {
        let backend = signed_in().await;
        backend.set_offline(true);
        let err = backend.list_documents(&expenses(), &[]).await.unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));
    }
}
