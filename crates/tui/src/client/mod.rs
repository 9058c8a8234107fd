//! [`Backend`] over the remote REST API.

use std::sync::RwLock;

use api_types::{
    ErrorBody,
    document::{Document, DocumentList, DocumentNew, DocumentUpdate},
    permission::Permission,
    query::Query,
    user::{AccountNew, EmailCredentials, Session, User},
};
use engine::{Backend, BackendError, BackendResult, Collection};
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    error::{AppError, Result},
    local_state::LocalState,
};

const PROJECT_HEADER: &str = "X-Appwrite-Project";
const SESSION_HEADER: &str = "X-Appwrite-Session";
const FALLBACK_COOKIES_HEADER: &str = "X-Fallback-Cookies";

#[derive(Debug)]
pub struct HttpBackend {
    base_url: Url,
    endpoint: String,
    project_id: String,
    http: reqwest::Client,
    secret: RwLock<Option<String>>,
    state_file: Option<String>,
}

impl HttpBackend {
    pub fn new(endpoint: &str, project_id: &str) -> Result<Self> {
        // `Url::join` drops the last path segment unless it ends with a slash.
        let base = format!("{}/", endpoint.trim_end_matches('/'));
        let base_url = Url::parse(&base).map_err(|err| AppError::Setting {
            key: "endpoint",
            message: err.to_string(),
        })?;
        Ok(Self {
            base_url,
            endpoint: endpoint.to_string(),
            project_id: project_id.to_string(),
            http: reqwest::Client::new(),
            secret: RwLock::new(None),
            state_file: None,
        })
    }

    /// Keeps the session secret in `path` so a later run can restore it.
    pub fn with_state_file(mut self, path: &str) -> Result<Self> {
        let state = LocalState::load(path)?;
        let secret = state
            .secret_for(&self.endpoint, &self.project_id)
            .map(str::to_string);
        self.secret = RwLock::new(secret);
        self.state_file = Some(path.to_string());
        Ok(self)
    }

    pub fn has_secret(&self) -> bool {
        self.secret().is_some()
    }

    fn secret(&self) -> Option<String> {
        self.secret.read().ok().and_then(|slot| slot.clone())
    }

    fn store_secret(&self, secret: Option<String>) {
        if let Ok(mut slot) = self.secret.write() {
            *slot = secret.clone();
        }
        let Some(path) = &self.state_file else {
            return;
        };
        let saved = LocalState::load(path).and_then(|mut state| {
            state.set_secret(&self.endpoint, &self.project_id, secret.as_deref());
            state.save(path)
        });
        if let Err(err) = saved {
            tracing::warn!("failed to persist session: {err}");
        }
    }

    fn request(&self, method: Method, path: &str) -> BackendResult<RequestBuilder> {
        let url = self
            .base_url
            .join(path)
            .map_err(|err| BackendError::Server(format!("invalid endpoint: {err}")))?;
        let mut builder = self
            .http
            .request(method, url)
            .header(PROJECT_HEADER, &self.project_id);
        if let Some(secret) = self.secret() {
            builder = builder.header(SESSION_HEADER, secret);
        }
        Ok(builder)
    }

    async fn execute(&self, builder: RequestBuilder) -> BackendResult<Response> {
        let res = builder
            .send()
            .await
            .map_err(|err| BackendError::Transport(err.to_string()))?;

        if res.status().is_success() {
            return Ok(res);
        }

        let status = res.status();
        let body = res
            .json::<ErrorBody>()
            .await
            .map(|err| err.message)
            .unwrap_or_else(|_| "unknown error".to_string());
        tracing::debug!(status = status.as_u16(), "remote error: {body}");

        let err = match status.as_u16() {
            401 => BackendError::Unauthorized(body),
            403 => BackendError::Forbidden(body),
            404 => BackendError::NotFound(body),
            409 => BackendError::Conflict(body),
            400 | 422 => BackendError::Validation(body),
            _ => BackendError::Server(body),
        };
        Err(err)
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> BackendResult<T> {
        self.execute(builder)
            .await?
            .json::<T>()
            .await
            .map_err(|err| BackendError::Server(format!("unexpected response: {err}")))
    }
}

fn documents_path(collection: &Collection) -> String {
    format!(
        "databases/{}/collections/{}/documents",
        collection.database_id, collection.collection_id
    )
}

fn document_path(collection: &Collection, document_id: &str) -> String {
    format!("{}/{document_id}", documents_path(collection))
}

/// Session secret carried by the fallback cookie header, used when the
/// response body holds none.
fn fallback_secret(res: &Response) -> Option<String> {
    let raw = res.headers().get(FALLBACK_COOKIES_HEADER)?.to_str().ok()?;
    let cookies: serde_json::Map<String, Value> = serde_json::from_str(raw).ok()?;
    cookies
        .into_iter()
        .find(|(name, _)| name.starts_with("a_session_"))
        .and_then(|(_, value)| value.as_str().map(str::to_string))
}

impl Backend for HttpBackend {
    async fn account_get(&self) -> BackendResult<User> {
        self.fetch(self.request(Method::GET, "account")?).await
    }

    async fn account_create(&self, account: AccountNew) -> BackendResult<User> {
        self.fetch(self.request(Method::POST, "account")?.json(&account))
            .await
    }

    async fn session_create(&self, email: &str, password: &str) -> BackendResult<Session> {
        let credentials = EmailCredentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let builder = self
            .request(Method::POST, "account/sessions/email")?
            .json(&credentials);
        let res = self.execute(builder).await?;
        let fallback = fallback_secret(&res);
        let mut session = res
            .json::<Session>()
            .await
            .map_err(|err| BackendError::Server(format!("unexpected response: {err}")))?;

        if session.secret.is_empty() {
            session.secret = fallback.unwrap_or_default();
        }
        if session.secret.is_empty() {
            tracing::warn!("session created without a secret; it will not survive a restart");
        } else {
            self.store_secret(Some(session.secret.clone()));
        }
        Ok(session)
    }

    async fn session_delete(&self) -> BackendResult<()> {
        let result = match self.request(Method::DELETE, "account/sessions/current") {
            Ok(builder) => self.execute(builder).await.map(|_| ()),
            Err(err) => Err(err),
        };
        self.store_secret(None);
        result
    }

    async fn list_documents(
        &self,
        collection: &Collection,
        queries: &[Query],
    ) -> BackendResult<DocumentList> {
        let params: Vec<(&str, String)> = queries
            .iter()
            .map(|query| ("queries[]", query.to_param()))
            .collect();
        let builder = self
            .request(Method::GET, &documents_path(collection))?
            .query(&params);
        self.fetch(builder).await
    }

    async fn create_document(
        &self,
        collection: &Collection,
        document_id: &str,
        data: Value,
        permissions: &[Permission],
    ) -> BackendResult<Document> {
        let payload = DocumentNew {
            document_id: document_id.to_string(),
            data,
            permissions: permissions.iter().map(ToString::to_string).collect(),
        };
        let builder = self
            .request(Method::POST, &documents_path(collection))?
            .json(&payload);
        self.fetch(builder).await
    }

    async fn update_document(
        &self,
        collection: &Collection,
        document_id: &str,
        data: Value,
    ) -> BackendResult<Document> {
        let builder = self
            .request(Method::PATCH, &document_path(collection, document_id))?
            .json(&DocumentUpdate { data });
        self.fetch(builder).await
    }

    async fn delete_document(
        &self,
        collection: &Collection,
        document_id: &str,
    ) -> BackendResult<()> {
        let builder = self.request(Method::DELETE, &document_path(collection, document_id))?;
        self.execute(builder).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Json, Router,
        extract::{Path, Query as UrlQuery, State},
        http::{HeaderMap, StatusCode},
        routing::{delete, get, post},
    };
    use serde_json::json;

    use super::*;

    const SECRET: &str = "s3cr3t";

    #[derive(Clone, Default)]
    struct Recorded {
        queries: Arc<Mutex<Vec<String>>>,
    }

    fn error(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
        (
            status,
            Json(json!({ "message": message, "code": status.as_u16(), "type": "test" })),
        )
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get("x-appwrite-project").and_then(|v| v.to_str().ok()) == Some("p1")
            && headers.get("x-appwrite-session").and_then(|v| v.to_str().ok()) == Some(SECRET)
    }

    async fn session_email(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        if body["password"] != json!("password1") {
            return error(StatusCode::UNAUTHORIZED, "Invalid credentials.");
        }
        (
            StatusCode::CREATED,
            Json(json!({ "$id": "sess", "userId": "u1", "secret": SECRET })),
        )
    }

    async fn account(headers: HeaderMap) -> (StatusCode, Json<Value>) {
        if !authorized(&headers) {
            return error(StatusCode::UNAUTHORIZED, "missing scope (account)");
        }
        (
            StatusCode::OK,
            Json(json!({ "$id": "u1", "name": "User", "email": "user@example.com" })),
        )
    }

    async fn list(
        State(recorded): State<Recorded>,
        UrlQuery(params): UrlQuery<Vec<(String, String)>>,
    ) -> Json<Value> {
        if let Ok(mut queries) = recorded.queries.lock() {
            queries.extend(params.into_iter().map(|(_, value)| value));
        }
        Json(json!({
            "total": 1,
            "documents": [{
                "$id": "d1",
                "$createdAt": "2026-10-16T10:00:00.000+00:00",
                "$updatedAt": "2026-10-16T10:00:00.000+00:00",
                "$permissions": [],
                "userId": "u1",
                "amount": 42.5,
                "category": "food",
                "description": "Lunch",
                "date": "2026-10-16",
                "createdAt": "2026-10-16T10:00:00Z",
                "updatedAt": "2026-10-16T10:00:00Z"
            }]
        }))
    }

    async fn create() -> (StatusCode, Json<Value>) {
        error(StatusCode::CONFLICT, "Document with the requested ID already exists.")
    }

    async fn remove(Path(id): Path<String>) -> StatusCode {
        if id == "d1" {
            StatusCode::NO_CONTENT
        } else {
            StatusCode::NOT_FOUND
        }
    }

    async fn fake_remote() -> (String, Recorded) {
        let recorded = Recorded::default();
        let documents = "/v1/databases/main/collections/expenses/documents";
        let router = Router::new()
            .route("/v1/account/sessions/email", post(session_email))
            .route("/v1/account", get(account))
            .route(documents, get(list).post(create))
            .route(&format!("{documents}/{{id}}"), delete(remove))
            .with_state(recorded.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        (format!("http://{addr}/v1"), recorded)
    }

    fn expenses() -> Collection {
        Collection::new("main", "expenses")
    }

    #[tokio::test]
    async fn login_sends_session_header_afterwards() {
        let (endpoint, _) = fake_remote().await;
        let backend = HttpBackend::new(&endpoint, "p1").unwrap();

        let err = backend.account_get().await.unwrap_err();
        assert!(matches!(err, BackendError::Unauthorized(_)));

        let session = backend
            .session_create("user@example.com", "password1")
            .await
            .unwrap();
        assert_eq!(session.secret, SECRET);
        assert!(backend.has_secret());

        let user = backend.account_get().await.unwrap();
        assert_eq!(user.id, "u1");
    }

    #[tokio::test]
    async fn rejected_login_maps_to_unauthorized() {
        let (endpoint, _) = fake_remote().await;
        let backend = HttpBackend::new(&endpoint, "p1").unwrap();
        let err = backend
            .session_create("user@example.com", "wrong")
            .await
            .unwrap_err();
        assert_eq!(err, BackendError::Unauthorized("Invalid credentials.".to_string()));
        assert!(!backend.has_secret());
    }

    #[tokio::test]
    async fn list_sends_each_query_as_a_parameter() {
        let (endpoint, recorded) = fake_remote().await;
        let backend = HttpBackend::new(&endpoint, "p1").unwrap();

        let list = backend
            .list_documents(
                &expenses(),
                &[Query::equal("userId", "u1"), Query::limit(100)],
            )
            .await
            .unwrap();
        assert_eq!(list.total, 1);
        assert_eq!(list.documents[0].id, "d1");

        let queries = recorded.queries.lock().unwrap().clone();
        assert_eq!(
            queries,
            vec![
                r#"{"method":"equal","attribute":"userId","values":["u1"]}"#.to_string(),
                r#"{"method":"limit","values":[100]}"#.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn status_codes_map_to_backend_errors() {
        let (endpoint, _) = fake_remote().await;
        let backend = HttpBackend::new(&endpoint, "p1").unwrap();

        let err = backend
            .create_document(&expenses(), "d1", json!({}), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Conflict(_)));

        backend.delete_document(&expenses(), "d1").await.unwrap();
        let err = backend.delete_document(&expenses(), "d2").await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[tokio::test]
    async fn unreachable_remote_is_a_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = HttpBackend::new(&format!("http://{addr}/v1"), "p1").unwrap();
        let err = backend.account_get().await.unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));
    }

    #[tokio::test]
    async fn secret_survives_in_state_file() {
        let (endpoint, _) = fake_remote().await;
        let path = std::env::temp_dir()
            .join(format!("spendlog_client_{}.json", std::process::id()))
            .to_string_lossy()
            .into_owned();
        let _ = std::fs::remove_file(&path);

        let backend = HttpBackend::new(&endpoint, "p1")
            .unwrap()
            .with_state_file(&path)
            .unwrap();
        backend
            .session_create("user@example.com", "password1")
            .await
            .unwrap();

        let restarted = HttpBackend::new(&endpoint, "p1")
            .unwrap()
            .with_state_file(&path)
            .unwrap();
        assert_eq!(restarted.account_get().await.unwrap().id, "u1");

        // The fake remote has no logout route; the secret is dropped anyway.
        let _ = restarted.session_delete().await;
        let again = HttpBackend::new(&endpoint, "p1")
            .unwrap()
            .with_state_file(&path)
            .unwrap();
        assert!(!again.has_secret());

        let _ = std::fs::remove_file(&path);
    }
}
