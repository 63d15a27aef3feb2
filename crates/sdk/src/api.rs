//! Typed endpoint wrappers over the gateway.
//!
//! Mirrors the backend's REST surface. Every call routes through the
//! [`Gateway`]; nothing bypasses it. Payload tolerance is asymmetric:
//! a malformed record inside a collection is skipped with a warning (one bad
//! row is not worth blanking a 500-row table), while a malformed
//! authoritative payload (a mutation or login response) is a hard decode
//! error.

use std::sync::Arc;

use async_trait::async_trait;
use masthead_types::{
    ActionTag, AdminIdentity, Article, ArticleId, Notification, NotificationId, User, UserId,
    UserStatus,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::{Result, SdkError};
use crate::gateway::Gateway;
use crate::list::{CollectionSource, RemovableSource};
use crate::transport::Method;

/// Typed console API over the authenticated gateway.
#[derive(Debug, Clone)]
pub struct ConsoleApi {
    gateway: Arc<Gateway>,
    notification_limit: usize,
}

/// Login response document.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    admin: AdminIdentity,
}

impl ConsoleApi {
    /// Creates the API over a gateway.
    #[must_use]
    pub fn new(gateway: Arc<Gateway>, notification_limit: usize) -> Self {
        Self { gateway, notification_limit }
    }

    /// The gateway carrying these calls.
    #[must_use]
    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    // ------------------------------------------------------------------
    // Articles
    // ------------------------------------------------------------------

    /// Fetches the full article collection.
    pub async fn fetch_articles(&self) -> Result<Vec<Article>> {
        let value = self.gateway.request(Method::Get, "articles", None).await?;
        parse_collection(value, "articles")
    }

    /// Applies a status action to one article; returns the authoritative
    /// updated record.
    pub async fn update_article_action(&self, id: &ArticleId, action: ActionTag) -> Result<Article> {
        let path = format!("articles/{id}/action");
        let body = json!({ "action": action.as_str() });
        let value = self.gateway.request(Method::Put, &path, Some(body)).await?;
        parse_entity(value)
    }

    /// Deletes one article.
    pub async fn delete_article(&self, id: &ArticleId) -> Result<()> {
        let path = format!("articles/{id}");
        self.gateway.request(Method::Delete, &path, None).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Fetches the full user collection.
    pub async fn fetch_users(&self) -> Result<Vec<User>> {
        let value = self.gateway.request(Method::Get, "users", None).await?;
        parse_collection(value, "users")
    }

    /// Applies a status action to one user; returns the authoritative
    /// updated record.
    pub async fn update_user_status(&self, id: &UserId, status: UserStatus) -> Result<User> {
        let path = format!("users/{id}/action");
        let body = json!({ "action": status.as_str() });
        let value = self.gateway.request(Method::Put, &path, Some(body)).await?;
        parse_entity(value)
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    /// Fetches the most recent notifications, bounded by the configured
    /// limit.
    pub async fn fetch_notifications(&self) -> Result<Vec<Notification>> {
        let path = format!("notifications?limit={}", self.notification_limit);
        let value = self.gateway.request(Method::Get, &path, None).await?;
        parse_collection(value, "notifications")
    }

    /// Marks one notification as read.
    pub async fn mark_notification_read(&self, id: &NotificationId) -> Result<()> {
        let path = format!("notifications/{id}/read");
        self.gateway.request(Method::Put, &path, None).await?;
        Ok(())
    }

    /// Marks every notification as read.
    pub async fn mark_all_notifications_read(&self) -> Result<()> {
        self.gateway.request(Method::Put, "notifications/read-all", None).await?;
        Ok(())
    }

    /// Deletes one notification.
    pub async fn delete_notification(&self, id: &NotificationId) -> Result<()> {
        let path = format!("notifications/{id}");
        self.gateway.request(Method::Delete, &path, None).await?;
        Ok(())
    }

    /// Deletes every notification.
    pub async fn delete_all_notifications(&self) -> Result<()> {
        self.gateway.request(Method::Delete, "notifications", None).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------

    /// Exchanges credentials for a token and identity. Sent unauthenticated;
    /// the caller installs the result into the session store.
    pub async fn login(&self, email: &str, password: &str) -> Result<(String, AdminIdentity)> {
        let body = json!({ "email": email, "password": password });
        let value = self.gateway.request(Method::Post, "admin/login", Some(body)).await?;
        let response: LoginResponse = parse_entity(value)?;
        Ok((response.token, response.admin))
    }

    /// Invalidates the credential server-side.
    pub async fn logout(&self) -> Result<()> {
        self.gateway.request(Method::Post, "admin/logout", None).await?;
        Ok(())
    }
}

// ============================================================================
// Payload Shapes
// ============================================================================

/// Unwraps a collection from the backend's envelope variants: a bare array,
/// `{"<key>": [...]}`, `{"data": [...]}`, or `{"data": {"<key>": [...]}}`.
fn collection_items(value: Value, key: &str) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            if let Some(inner) = map.remove(key) {
                return collection_items(inner, key);
            }
            if let Some(inner) = map.remove("data") {
                return collection_items(inner, key);
            }
            Err(SdkError::Decode { message: format!("expected a {key} collection") })
        }
        _ => Err(SdkError::Decode { message: format!("expected a {key} collection") }),
    }
}

fn parse_collection<T: DeserializeOwned>(value: Value, key: &str) -> Result<Vec<T>> {
    let items = collection_items(value, key)?;
    let mut records = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<T>(item) {
            Ok(record) => records.push(record),
            Err(err) => {
                tracing::warn!(collection = key, error = %err, "skipping malformed record");
            }
        }
    }
    Ok(records)
}

fn parse_entity<T: DeserializeOwned>(mut value: Value) -> Result<T> {
    if let Value::Object(map) = &mut value
        && let Some(inner) = map.remove("data")
    {
        return parse_entity(inner);
    }
    Ok(serde_json::from_value(value)?)
}

// ============================================================================
// Collection Sources
// ============================================================================

/// The article collection as seen by the list engine.
#[derive(Debug, Clone)]
pub struct ArticleSource {
    api: ConsoleApi,
}

impl ArticleSource {
    /// Creates the source over the typed API.
    #[must_use]
    pub fn new(api: ConsoleApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl CollectionSource for ArticleSource {
    type Item = Article;

    async fn fetch_all(&self) -> Result<Vec<Article>> {
        self.api.fetch_articles().await
    }

    async fn apply_action(&self, id: &str, action: ActionTag) -> Result<Article> {
        self.api.update_article_action(&ArticleId::from(id), action).await
    }
}

#[async_trait]
impl RemovableSource for ArticleSource {
    async fn remove(&self, id: &str) -> Result<()> {
        self.api.delete_article(&ArticleId::from(id)).await
    }
}

/// The user collection as seen by the list engine.
#[derive(Debug, Clone)]
pub struct UserSource {
    api: ConsoleApi,
}

impl UserSource {
    /// Creates the source over the typed API.
    #[must_use]
    pub fn new(api: ConsoleApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl CollectionSource for UserSource {
    type Item = User;

    async fn fetch_all(&self) -> Result<Vec<User>> {
        self.api.fetch_users().await
    }

    async fn apply_action(&self, id: &str, status: UserStatus) -> Result<User> {
        self.api.update_user_status(&UserId::from(id), status).await
    }
}
