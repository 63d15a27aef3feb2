//! The `ConsoleClient` facade.
//!
//! Ties the pieces together: owns the session store and gateway, exposes the
//! typed API, and hands out list controllers and the notification feed bound
//! to them. The embedding application holds one client for the process.

use std::sync::Arc;

use masthead_types::AdminIdentity;

use crate::api::{ArticleSource, ConsoleApi, UserSource};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::feed::NotificationFeed;
use crate::gateway::Gateway;
use crate::http::HttpTransport;
use crate::list::ListController;
use crate::session::{SessionStore, storage_for};
use crate::transport::Transport;

/// High-level client for the Masthead console backend.
#[derive(Debug, Clone)]
pub struct ConsoleClient {
    config: ClientConfig,
    session: Arc<SessionStore>,
    api: ConsoleApi,
}

impl ConsoleClient {
    /// Creates a client over the production HTTP transport.
    ///
    /// The session hydrates from the configured session file (if any);
    /// a structurally invalid persisted session is discarded.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Self::with_transport(config, transport)
    }

    /// Creates a client over a caller-supplied transport (tests use the
    /// [`mock`](crate::mock) backend here).
    ///
    /// # Errors
    ///
    /// Currently infallible; kept fallible to match [`ConsoleClient::new`].
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let session = Arc::new(SessionStore::new(storage_for(config.session_file())));
        let gateway = Arc::new(Gateway::new(
            transport,
            session.clone(),
            config.base_url.clone(),
            config.timeout(),
        ));
        let api = ConsoleApi::new(gateway, config.notification_limit());
        Ok(Self { config, session, api })
    }

    /// The session store (identity and status; never the raw credential).
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// The typed endpoint API, for calls outside the list/feed engines.
    #[must_use]
    pub fn api(&self) -> &ConsoleApi {
        &self.api
    }

    /// Logs in and installs the session. The session is `Authenticating` for
    /// the duration of the call and returns to `Anonymous` on failure.
    ///
    /// # Errors
    ///
    /// `Unauthorized` on rejected credentials; `Transport` on backend
    /// failure; `Storage` when the session cannot be persisted (the
    /// in-memory session is installed regardless).
    pub async fn login(&self, email: &str, password: &str) -> Result<AdminIdentity> {
        self.session.set_authenticating();
        match self.api.login(email, password).await {
            Ok((token, identity)) => {
                self.session.acquire(identity.clone(), &token)?;
                tracing::debug!(email, "session acquired");
                Ok(identity)
            }
            Err(err) => {
                self.session.abort_authentication();
                Err(err)
            }
        }
    }

    /// Ends the session: best-effort server-side invalidation, then local
    /// teardown. The local session is cleared even when the server call
    /// fails.
    pub async fn logout(&self) {
        if self.session.is_authenticated()
            && let Err(err) = self.api.logout().await
        {
            tracing::debug!(error = %err, "server-side logout failed; clearing locally");
        }
        self.session.clear();
    }

    /// A list controller over the article collection.
    #[must_use]
    pub fn articles(&self) -> ListController<ArticleSource> {
        ListController::new(ArticleSource::new(self.api.clone()), self.config.page_size())
    }

    /// A list controller over the user collection.
    #[must_use]
    pub fn users(&self) -> ListController<UserSource> {
        ListController::new(UserSource::new(self.api.clone()), self.config.page_size())
    }

    /// The notification feed, polling at the configured interval once
    /// started.
    #[must_use]
    pub fn notification_feed(&self) -> NotificationFeed {
        NotificationFeed::new(self.api.clone(), self.session.clone(), self.config.poll_interval())
    }
}
