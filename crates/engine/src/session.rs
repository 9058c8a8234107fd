//! Session layer: the signed-in user, if any.
//!
//! Every operation delegates to the remote auth service; the only local state
//! is the cached [`User`].

use api_types::user::{AccountNew, User};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    backend::{Backend, BackendError},
};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Default)]
pub struct Session {
    user: Option<User>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Asks the remote for the account of the current session.
    ///
    /// Never fails: any error publishes `None`.
    pub async fn restore<B: Backend>(&mut self, backend: &B) -> Option<&User> {
        match backend.account_get().await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "session restored");
                self.user = Some(user);
            }
            Err(BackendError::Unauthorized(_)) => {
                tracing::debug!("no active session");
                self.user = None;
            }
            Err(err) => {
                tracing::warn!("session restore failed: {err}");
                self.user = None;
            }
        }
        self.user.as_ref()
    }

    pub async fn login<B: Backend>(
        &mut self,
        backend: &B,
        email: &str,
        password: &str,
    ) -> ResultEngine<&User> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(EngineError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        backend
            .session_create(email, password)
            .await
            .map_err(|err| match err {
                BackendError::Unauthorized(_)
                | BackendError::Forbidden(_)
                | BackendError::NotFound(_) => {
                    tracing::info!("login rejected for {email}");
                    EngineError::Authentication
                }
                other => EngineError::Backend(other),
            })?;

        let user = backend.account_get().await.map_err(|err| match err {
            BackendError::Unauthorized(_) => EngineError::Authentication,
            other => {
                tracing::warn!("account lookup after login failed: {other}");
                EngineError::Backend(other)
            }
        })?;
        tracing::info!(user_id = %user.id, "signed in");
        Ok(&*self.user.insert(user))
    }

    /// Creates the account, then signs in with the same credentials.
    pub async fn register<B: Backend>(
        &mut self,
        backend: &B,
        email: &str,
        password: &str,
        name: &str,
    ) -> ResultEngine<&User> {
        let email = email.trim();
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::AccountCreation("Name is required".to_string()));
        }
        if !email.contains('@') {
            return Err(EngineError::AccountCreation(
                "Email address is not valid".to_string(),
            ));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(EngineError::AccountCreation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let account = AccountNew {
            user_id: Uuid::new_v4().simple().to_string(),
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
        };
        let user = backend
            .account_create(account)
            .await
            .map_err(|err| match err {
                BackendError::Conflict(_) => EngineError::AccountCreation(
                    "An account with this email already exists".to_string(),
                ),
                BackendError::Validation(message) => EngineError::AccountCreation(message),
                other => EngineError::Backend(other),
            })?;
        tracing::info!(user_id = %user.id, "account created");

        self.login(backend, email, password).await
    }

    /// Ends the remote session. Remote failures are logged, not returned; the
    /// local user is cleared either way.
    pub async fn logout<B: Backend>(&mut self, backend: &B) {
        if let Err(err) = backend.session_delete().await {
            tracing::warn!("logout failed: {err}");
        }
        if let Some(user) = self.user.take() {
            tracing::info!(user_id = %user.id, "signed out");
        }
    }
}
