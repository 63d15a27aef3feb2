//! Session store: the single source of truth for authentication state.
//!
//! Holds the authenticated staff identity and credential, persists them
//! across restarts through a [`SessionStorage`], and owns the two teardown
//! signals every other component keys off:
//!
//! - the **epoch**, a counter bumped on [`SessionStore::clear`]; a request
//!   begun under an older epoch is discarded when it resolves
//! - the **cancellation token**, rotated on acquire and cancelled on clear;
//!   background polling ties its lifetime to it
//!
//! No other component touches persistent storage, and the raw credential is
//! only readable by the request gateway.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use masthead_types::AdminIdentity;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, StorageSnafu};

/// Authentication state of the console session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// No credential; requests go out unauthenticated.
    #[default]
    Anonymous,
    /// A login call is in flight.
    Authenticating,
    /// A credential is held and attached to every request.
    Authenticated,
}

/// What callers outside the gateway may see of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// The authenticated identity, when there is one.
    pub identity: Option<AdminIdentity>,
    /// Current authentication state.
    pub status: SessionStatus,
}

/// The persisted session document (token + identity), the same shape the
/// original console kept across reloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    /// Raw credential token.
    pub token: String,
    /// The staff identity the token belongs to.
    pub admin: AdminIdentity,
}

// ============================================================================
// Credential
// ============================================================================

/// A bearer credential normalized to a single canonical prefix form.
///
/// Tokens arrive from login responses and persisted storage in inconsistent
/// shapes (bare, already-prefixed). Normalizing at construction guarantees a
/// header value is never double-prefixed.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct Credential {
    token: String,
}

impl Credential {
    const PREFIX: &'static str = "Bearer ";

    pub(crate) fn new(raw: &str) -> Self {
        let mut token = raw.trim();
        loop {
            match token.get(..Self::PREFIX.len()) {
                Some(prefix) if prefix.eq_ignore_ascii_case(Self::PREFIX) => {
                    token = token[Self::PREFIX.len()..].trim_start();
                }
                _ => break,
            }
        }
        Self { token: token.to_owned() }
    }

    /// The canonical `Authorization` header value.
    pub(crate) fn authorization_value(&self) -> String {
        format!("{}{}", Self::PREFIX, self.token)
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never log the token itself.
        f.debug_struct("Credential").finish_non_exhaustive()
    }
}

// ============================================================================
// Storage
// ============================================================================

/// Persistence backend for the session document.
///
/// Only the [`SessionStore`] calls these; everything else goes through it.
pub trait SessionStorage: Send + Sync + fmt::Debug {
    /// Loads the persisted session; `Ok(None)` when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns an error when stored data exists but cannot be read or is
    /// structurally invalid; the store treats that as "fail closed".
    fn load(&self) -> Result<Option<PersistedSession>>;

    /// Stores the session document.
    ///
    /// # Errors
    ///
    /// Returns an error when the document cannot be written.
    fn store(&self, session: &PersistedSession) -> Result<()>;

    /// Removes any persisted session. Must be idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error when removal fails for a reason other than the
    /// document already being absent.
    fn purge(&self) -> Result<()>;
}

/// File-backed session storage (one JSON document).
#[derive(Debug)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    /// Creates storage rooted at the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> Result<Option<PersistedSession>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err).context(StorageSnafu),
        };
        let session = serde_json::from_str(&raw)?;
        Ok(Some(session))
    }

    fn store(&self, session: &PersistedSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context(StorageSnafu)?;
        }
        let raw = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, raw).context(StorageSnafu)
    }

    fn purge(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).context(StorageSnafu),
        }
    }
}

/// In-memory session storage for tests and ephemeral embedding.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    slot: Mutex<Option<PersistedSession>>,
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> Result<Option<PersistedSession>> {
        Ok(self.slot.lock().clone())
    }

    fn store(&self, session: &PersistedSession) -> Result<()> {
        *self.slot.lock() = Some(session.clone());
        Ok(())
    }

    fn purge(&self) -> Result<()> {
        *self.slot.lock() = None;
        Ok(())
    }
}

// ============================================================================
// Store
// ============================================================================

#[derive(Debug, Default)]
struct Inner {
    status: SessionStatus,
    identity: Option<AdminIdentity>,
    credential: Option<Credential>,
}

/// Process-wide session state with controlled mutation.
///
/// Only [`SessionStore::acquire`] and [`SessionStore::clear`] write the
/// credential; a completed write is visible to the next read (the state sits
/// behind a lock, so there is no cached stale credential after logout).
#[derive(Debug)]
pub struct SessionStore {
    inner: RwLock<Inner>,
    epoch: AtomicU64,
    token: Mutex<CancellationToken>,
    storage: Box<dyn SessionStorage>,
}

impl SessionStore {
    /// Creates a store over the given persistence backend and hydrates from
    /// it. Structurally invalid persisted data clears the store rather than
    /// exposing a partially-formed identity.
    #[must_use]
    pub fn new(storage: Box<dyn SessionStorage>) -> Self {
        let store = Self {
            inner: RwLock::new(Inner::default()),
            epoch: AtomicU64::new(0),
            token: Mutex::new(CancellationToken::new()),
            storage,
        };
        store.hydrate();
        store
    }

    fn hydrate(&self) {
        match self.storage.load() {
            Ok(Some(persisted)) => {
                let mut inner = self.inner.write();
                inner.status = SessionStatus::Authenticated;
                inner.credential = Some(Credential::new(&persisted.token));
                inner.identity = Some(persisted.admin);
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, "discarding invalid persisted session");
                if let Err(purge_err) = self.storage.purge() {
                    tracing::warn!(error = %purge_err, "failed to purge persisted session");
                }
            }
        }
    }

    /// Installs an authenticated session and persists it.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the session document cannot be written;
    /// the in-memory session is installed regardless, so the console stays
    /// usable for the current run.
    pub fn acquire(&self, identity: AdminIdentity, raw_credential: &str) -> Result<()> {
        let credential = Credential::new(raw_credential);
        let persisted =
            PersistedSession { token: credential.token().to_owned(), admin: identity.clone() };
        {
            let mut inner = self.inner.write();
            inner.status = SessionStatus::Authenticated;
            inner.identity = Some(identity);
            inner.credential = Some(credential);
        }
        {
            let mut token = self.token.lock();
            if token.is_cancelled() {
                *token = CancellationToken::new();
            }
        }
        self.storage.store(&persisted)
    }

    /// Tears the session down: anonymous state, purged storage, epoch bump,
    /// cancelled token. Idempotent: a second call is a no-op.
    pub fn clear(&self) {
        {
            let mut inner = self.inner.write();
            if inner.status == SessionStatus::Anonymous
                && inner.identity.is_none()
                && inner.credential.is_none()
            {
                return;
            }
            *inner = Inner::default();
        }
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.token.lock().cancel();
        if let Err(err) = self.storage.purge() {
            tracing::warn!(error = %err, "failed to purge persisted session");
        }
        tracing::debug!("session cleared");
    }

    /// Returns the identity and status without exposing the credential.
    #[must_use]
    pub fn current(&self) -> SessionSnapshot {
        let inner = self.inner.read();
        SessionSnapshot { identity: inner.identity.clone(), status: inner.status }
    }

    /// Whether a credential is currently held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.read().status == SessionStatus::Authenticated
    }

    /// The current session epoch. Bumped on every teardown.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Token cancelled when the session ends; background work ties its
    /// lifetime to a child of this.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.lock().clone()
    }

    /// Marks a login call as in flight. Leaves an authenticated session
    /// untouched.
    pub(crate) fn set_authenticating(&self) {
        let mut inner = self.inner.write();
        if inner.status == SessionStatus::Anonymous {
            inner.status = SessionStatus::Authenticating;
        }
    }

    /// Rolls a failed login back to anonymous.
    pub(crate) fn abort_authentication(&self) {
        let mut inner = self.inner.write();
        if inner.status == SessionStatus::Authenticating {
            inner.status = SessionStatus::Anonymous;
        }
    }

    /// The raw credential, gateway-only.
    pub(crate) fn credential(&self) -> Option<Credential> {
        self.inner.read().credential.clone()
    }
}

/// Convenience constructor used by the client facade.
pub(crate) fn storage_for(session_file: Option<&PathBuf>) -> Box<dyn SessionStorage> {
    match session_file {
        Some(path) => Box::new(FileSessionStorage::new(path.clone())),
        None => Box::new(MemorySessionStorage::default()),
    }
}
