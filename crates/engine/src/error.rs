//! The module contains the errors the engine can return.
//!
//! Remote failures arrive as [`BackendError`] and are classified by the
//! operation that saw them:
//!
//! - [`Authentication`] when credentials are rejected.
//! - [`AccountCreation`] when registration is refused.
//! - [`Fetch`] when listing expenses fails.
//! - [`Mutation`] when create, update or delete fails.
//!
//!  [`Authentication`]: EngineError::Authentication
//!  [`AccountCreation`]: EngineError::AccountCreation
//!  [`Fetch`]: EngineError::Fetch
//!  [`Mutation`]: EngineError::Mutation
use thiserror::Error;

use crate::backend::BackendError;

#[derive(Error, Debug, PartialEq)]
pub enum EngineError {
    #[error("Invalid credentials")]
    Authentication,
    #[error("Account creation failed: {0}")]
    AccountCreation(String),
    #[error("Failed to load expenses: {0}")]
    Fetch(BackendError),
    #[error("Failed to save changes: {0}")]
    Mutation(BackendError),
    #[error("Not signed in")]
    NotAuthenticated,
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}
