//! Seam between the engine and the remote auth + document service.

use std::future::Future;

use api_types::{
    document::{Document, DocumentList},
    permission::Permission,
    query::Query,
    user::{AccountNew, Session, User},
};
use serde_json::Value;
use thiserror::Error;

pub type BackendResult<T> = Result<T, BackendError>;

/// Failure reported by the remote, classified by HTTP-like status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("server error: {0}")]
    Server(String),
    #[error("server unreachable: {0}")]
    Transport(String),
}

/// Database + collection pair addressing a set of documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub database_id: String,
    pub collection_id: String,
}

impl Collection {
    pub fn new(database_id: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Self {
            database_id: database_id.into(),
            collection_id: collection_id.into(),
        }
    }
}

/// Operations the remote service must provide.
///
/// Implementations keep the current session themselves, the way the remote
/// SDK keeps its cookie: every call after `session_create` runs as that user.
pub trait Backend: Send + Sync {
    /// Returns the account owning the current session.
    fn account_get(&self) -> impl Future<Output = BackendResult<User>> + Send;

    fn account_create(&self, account: AccountNew)
    -> impl Future<Output = BackendResult<User>> + Send;

    /// Exchanges email and password for a session.
    fn session_create(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = BackendResult<Session>> + Send;

    fn session_delete(&self) -> impl Future<Output = BackendResult<()>> + Send;

    fn list_documents(
        &self,
        collection: &Collection,
        queries: &[Query],
    ) -> impl Future<Output = BackendResult<DocumentList>> + Send;

    fn create_document(
        &self,
        collection: &Collection,
        document_id: &str,
        data: Value,
        permissions: &[Permission],
    ) -> impl Future<Output = BackendResult<Document>> + Send;

    /// Applies a partial update: attributes absent from `data` are kept.
    fn update_document(
        &self,
        collection: &Collection,
        document_id: &str,
        data: Value,
    ) -> impl Future<Output = BackendResult<Document>> + Send;

    fn delete_document(
        &self,
        collection: &Collection,
        document_id: &str,
    ) -> impl Future<Output = BackendResult<()>> + Send;
}
