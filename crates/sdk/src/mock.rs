//! Mock backend for SDK integration testing.
//!
//! A controllable in-memory implementation of the console's REST surface,
//! wired in as a [`Transport`] so the gateway, list engine, and notification
//! feed are exercised end to end without a real backend.
//!
//! # Features
//!
//! - **Collection storage**: seed articles, users, and notifications
//! - **Auth simulation**: accounts, minted tokens, revocation
//! - **Failure injection**: queue error statuses or add latency
//! - **Request counting**: per-route counters for verification
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use masthead_sdk::mock::MockBackend;
//! use masthead_sdk::{ClientConfig, ConsoleClient};
//!
//! # async fn example() -> masthead_sdk::Result<()> {
//! let backend = Arc::new(MockBackend::new());
//! backend.add_account("staff@masthead.io", "hunter2");
//!
//! let config = ClientConfig::builder().with_base_url("https://console.test/").build()?;
//! let client = ConsoleClient::with_transport(config, backend.clone())?;
//! client.login("staff@masthead.io", "hunter2").await?;
//! # Ok(())
//! # }
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use masthead_types::{
    ActionTag, AdminIdentity, Article, ArticleId, Notification, NotificationId, User, UserId,
    UserStatus,
};
use parking_lot::{Mutex, RwLock};
use serde_json::{Value, json};
use url::Url;

use crate::error::{Result, SdkError};
use crate::transport::{Method, Transport, TransportRequest, TransportResponse};

/// Shared state for the mock backend.
#[derive(Debug, Default)]
struct MockState {
    articles: RwLock<Vec<Article>>,
    users: RwLock<Vec<User>>,
    notifications: RwLock<Vec<Notification>>,

    /// Login accounts: email -> (password, identity).
    accounts: RwLock<HashMap<String, (String, AdminIdentity)>>,

    /// Tokens currently accepted by authenticated routes.
    valid_tokens: RwLock<HashSet<String>>,
    token_counter: AtomicUsize,

    /// Error statuses to return for upcoming requests, in order.
    fail_queue: Mutex<VecDeque<u16>>,

    /// Artificial latency per request (milliseconds).
    delay_ms: AtomicU64,

    /// Requests seen, keyed by "METHOD /path".
    counts: RwLock<HashMap<String, usize>>,
}

/// Controllable in-memory console backend.
#[derive(Debug, Default)]
pub struct MockBackend {
    state: MockState,
}

impl MockBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------

    /// Replaces the article collection.
    pub fn set_articles(&self, articles: Vec<Article>) {
        *self.state.articles.write() = articles;
    }

    /// Replaces the user collection.
    pub fn set_users(&self, users: Vec<User>) {
        *self.state.users.write() = users;
    }

    /// Replaces the notification collection.
    pub fn set_notifications(&self, notifications: Vec<Notification>) {
        *self.state.notifications.write() = notifications;
    }

    /// Registers a login account with a staff identity derived from the
    /// email.
    pub fn add_account(&self, email: &str, password: &str) {
        let identity = AdminIdentity {
            id: format!("adm-{}", self.state.accounts.read().len() + 1),
            email: email.to_owned(),
            role: "editor".to_owned(),
        };
        self.state
            .accounts
            .write()
            .insert(email.to_owned(), (password.to_owned(), identity));
    }

    /// Marks a token as valid without going through login, for tests seeding
    /// a persisted session.
    pub fn authorize_token(&self, token: &str) {
        self.state.valid_tokens.write().insert(token.to_owned());
    }

    // ------------------------------------------------------------------
    // Failure injection
    // ------------------------------------------------------------------

    /// Queues an error status for the next request.
    pub fn fail_next(&self, status: u16) {
        self.state.fail_queue.lock().push_back(status);
    }

    /// Adds artificial latency to every request.
    pub fn set_delay(&self, delay: Duration) {
        self.state.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Invalidates every token: subsequent authenticated requests get 401.
    pub fn revoke_tokens(&self) {
        self.state.valid_tokens.write().clear();
    }

    // ------------------------------------------------------------------
    // Verification
    // ------------------------------------------------------------------

    /// Requests seen for one route.
    #[must_use]
    pub fn request_count(&self, method: Method, path: &str) -> usize {
        let key = format!("{method} {path}");
        self.state.counts.read().get(&key).copied().unwrap_or(0)
    }

    /// Requests seen in total.
    #[must_use]
    pub fn total_requests(&self) -> usize {
        self.state.counts.read().values().sum()
    }

    /// Current article state, for asserting server-side effects.
    #[must_use]
    pub fn articles(&self) -> Vec<Article> {
        self.state.articles.read().clone()
    }

    /// Current notification state.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.state.notifications.read().clone()
    }

    // ------------------------------------------------------------------
    // Routing
    // ------------------------------------------------------------------

    fn authorized(&self, request: &TransportRequest) -> bool {
        let Some(bearer) = &request.bearer else { return false };
        let token = bearer.strip_prefix("Bearer ").unwrap_or(bearer);
        self.state.valid_tokens.read().contains(token)
    }

    fn handle(&self, request: &TransportRequest, path: &str, query_limit: Option<usize>) -> TransportResponse {
        let segments: Vec<&str> = path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();

        if request.method == Method::Post && segments == ["admin", "login"] {
            return self.handle_login(request);
        }

        if !self.authorized(request) {
            return respond(401, json!({ "message": "unauthorized" }));
        }

        match (request.method, segments.as_slice()) {
            (Method::Post, ["admin", "logout"]) => {
                if let Some(bearer) = &request.bearer {
                    let token = bearer.strip_prefix("Bearer ").unwrap_or(bearer);
                    self.state.valid_tokens.write().remove(token);
                }
                respond(200, json!({ "message": "logged out" }))
            }

            (Method::Get, ["articles"]) => {
                let articles = self.state.articles.read();
                respond(200, to_json(&*articles))
            }
            (Method::Put, ["articles", id, "action"]) => self.handle_article_action(request, id),
            (Method::Delete, ["articles", id]) => {
                let mut articles = self.state.articles.write();
                let before = articles.len();
                articles.retain(|a| a.id.as_str() != *id);
                if articles.len() == before {
                    respond(404, json!({ "message": "article not found" }))
                } else {
                    respond(200, json!({ "message": "deleted" }))
                }
            }

            (Method::Get, ["users"]) => {
                let users = self.state.users.read();
                respond(200, json!({ "users": to_json(&*users) }))
            }
            (Method::Put, ["users", id, "action"]) => self.handle_user_action(request, id),

            (Method::Get, ["notifications"]) => {
                let notifications = self.state.notifications.read();
                let limit = query_limit.unwrap_or(notifications.len());
                let page: Vec<&Notification> = notifications.iter().take(limit).collect();
                respond(200, json!({ "data": { "notifications": to_json(&page) } }))
            }
            (Method::Put, ["notifications", "read-all"]) => {
                for n in self.state.notifications.write().iter_mut() {
                    n.read = true;
                }
                respond(200, json!({ "message": "ok" }))
            }
            (Method::Put, ["notifications", id, "read"]) => {
                let mut notifications = self.state.notifications.write();
                match notifications.iter_mut().find(|n| n.id.as_str() == *id) {
                    Some(n) => {
                        n.read = true;
                        respond(200, json!({ "message": "ok" }))
                    }
                    None => respond(404, json!({ "message": "notification not found" })),
                }
            }
            (Method::Delete, ["notifications", id]) => {
                let mut notifications = self.state.notifications.write();
                let before = notifications.len();
                notifications.retain(|n| n.id.as_str() != *id);
                if notifications.len() == before {
                    respond(404, json!({ "message": "notification not found" }))
                } else {
                    respond(200, json!({ "message": "deleted" }))
                }
            }
            (Method::Delete, ["notifications"]) => {
                self.state.notifications.write().clear();
                respond(200, json!({ "message": "cleared" }))
            }

            _ => respond(404, json!({ "message": format!("no route for {} {path}", request.method) })),
        }
    }

    fn handle_login(&self, request: &TransportRequest) -> TransportResponse {
        let body = request.body.as_ref().cloned().unwrap_or(Value::Null);
        let email = body.get("email").and_then(Value::as_str).unwrap_or_default();
        let password = body.get("password").and_then(Value::as_str).unwrap_or_default();

        let accounts = self.state.accounts.read();
        match accounts.get(email) {
            Some((expected, identity)) if expected == password => {
                let token =
                    format!("mock-token-{}", self.state.token_counter.fetch_add(1, Ordering::SeqCst) + 1);
                self.state.valid_tokens.write().insert(token.clone());
                respond(200, json!({ "token": token, "admin": to_json(identity) }))
            }
            _ => respond(401, json!({ "message": "Invalid credentials" })),
        }
    }

    fn handle_article_action(&self, request: &TransportRequest, id: &str) -> TransportResponse {
        let Some(action) = action_field(request) else {
            return respond(422, json!({ "message": "missing action" }));
        };
        let tag: ActionTag = match action.parse() {
            Ok(tag) => tag,
            Err(err) => return respond(422, json!({ "message": err.to_string() })),
        };
        let mut articles = self.state.articles.write();
        match articles.iter_mut().find(|a| a.id.as_str() == id) {
            Some(article) => {
                article.action_tag = tag;
                respond(200, json!({ "data": to_json(article) }))
            }
            None => respond(404, json!({ "message": "article not found" })),
        }
    }

    fn handle_user_action(&self, request: &TransportRequest, id: &str) -> TransportResponse {
        let Some(action) = action_field(request) else {
            return respond(422, json!({ "message": "missing action" }));
        };
        let status: UserStatus = match action.parse() {
            Ok(status) => status,
            Err(err) => return respond(422, json!({ "message": err.to_string() })),
        };
        let mut users = self.state.users.write();
        match users.iter_mut().find(|u| u.id.as_str() == id) {
            Some(user) => {
                user.status = status;
                respond(200, json!({ "data": to_json(user) }))
            }
            None => respond(404, json!({ "message": "user not found" })),
        }
    }
}

#[async_trait]
impl Transport for MockBackend {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse> {
        let url = Url::parse(&request.url)
            .map_err(|err| SdkError::Transport { status: None, message: err.to_string() })?;
        let path = url.path().to_owned();
        let query_limit = url
            .query_pairs()
            .find(|(k, _)| k == "limit")
            .and_then(|(_, v)| v.parse().ok());

        {
            let key = format!("{} {}", request.method, path);
            *self.state.counts.write().entry(key).or_insert(0) += 1;
        }

        let delay = self.state.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if let Some(status) = self.state.fail_queue.lock().pop_front() {
            return Ok(respond(status, json!({ "message": "injected failure" })));
        }

        Ok(self.handle(&request, &path, query_limit))
    }
}

fn respond(status: u16, body: Value) -> TransportResponse {
    TransportResponse { status, body: body.to_string().into_bytes() }
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).expect("mock entities serialize")
}

fn action_field(request: &TransportRequest) -> Option<String> {
    request
        .body
        .as_ref()
        .and_then(|b| b.get("action"))
        .and_then(Value::as_str)
        .map(str::to_owned)
}

// ============================================================================
// Sample Data
// ============================================================================

/// An article with sensible defaults for tests.
#[must_use]
pub fn sample_article(id: &str, title: &str, tag: ActionTag) -> Article {
    Article {
        id: ArticleId::new(id),
        title: title.to_owned(),
        meta: format!("{title}: standfirst"),
        author_name: Some("Ada Obi".to_owned()),
        category: "News".to_owned(),
        action_tag: tag,
        published_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        updated_at: None,
        views: 100,
    }
}

/// A user with sensible defaults for tests.
#[must_use]
pub fn sample_user(id: &str, email: &str, status: UserStatus) -> User {
    User {
        id: UserId::new(id),
        first_name: "Sarah".to_owned(),
        last_name: "Johnson".to_owned(),
        email: email.to_owned(),
        role: "Reader".to_owned(),
        status,
        last_active_at: Utc.with_ymd_and_hms(2024, 5, 7, 9, 0, 0).unwrap(),
    }
}

/// A notification with sensible defaults for tests.
#[must_use]
pub fn sample_notification(id: &str, title: &str, read: bool) -> Notification {
    Notification {
        id: NotificationId::new(id),
        kind: "user".to_owned(),
        title: title.to_owned(),
        message: format!("{title}: details"),
        read,
        created_at: Utc.with_ymd_and_hms(2024, 5, 7, 9, 0, 0).unwrap(),
    }
}
