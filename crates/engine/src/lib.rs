//! Expense tracker core.
//!
//! - [`Session`]: who is signed in.
//! - [`ExpenseStore`]: that user's expenses, kept in step with the remote.
//! - [`Statistics`]: totals computed from the store after every change.
//!
//! All persistence and authentication go through a [`Backend`]. The layers
//! hold no backend themselves; each remote operation takes one as argument,
//! so the caller owns both the state and the connection.

pub use api_types::{expense::Category, user::User};
pub use backend::{Backend, BackendError, BackendResult, Collection};
pub use error::EngineError;
pub use expense::{Expense, ExpenseDraft, ExpensePatch};
pub use expenses::{ExpenseSettings, ExpenseStore, ListOrder, SyncMode};
pub use money::Money;
pub use session::Session;
pub use stats::Statistics;

pub mod backend;
pub mod memory;
pub mod stats;

mod error;
mod expense;
mod expenses;
mod money;
mod session;

pub type ResultEngine<T> = Result<T, EngineError>;
