//! SDK error taxonomy with teardown classification.
//!
//! The taxonomy separates:
//! - **Unauthorized**: the session is no longer valid; forces teardown and is
//!   never retried automatically
//! - **Transport**: any other HTTP/network/timeout failure; previously
//!   fetched data is kept and the user refreshes manually
//! - **Busy / MissingRecord**: local per-row conditions raised before a
//!   request is ever issued

use snafu::Snafu;

/// Result type alias for SDK operations.
pub type Result<T, E = SdkError> = std::result::Result<T, E>;

/// Error type for console SDK operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SdkError {
    /// The session credential is invalid or expired. Observing this anywhere
    /// means the session has already been torn down.
    #[snafu(display("session is no longer authorized"))]
    Unauthorized,

    /// Network, server, or timeout failure other than authorization.
    #[snafu(display("transport error: {message}"))]
    Transport {
        /// HTTP status, when the failure came from a response.
        status: Option<u16>,
        /// Failure description, from the response body when available.
        message: String,
    },

    /// A mutation was requested for a record that is already mutating.
    /// Rejected immediately, never queued.
    #[snafu(display("record {id} already has a mutation in flight"))]
    Busy {
        /// The contested record id.
        id: String,
    },

    /// A mutation was requested for an id absent from the fetched collection.
    #[snafu(display("record {id} is not in the current collection"))]
    MissingRecord {
        /// The unknown record id.
        id: String,
    },

    /// An authoritative payload (mutation response, login response) did not
    /// match the expected shape.
    #[snafu(display("malformed response: {message}"))]
    Decode {
        /// Parse failure description.
        message: String,
    },

    /// Configuration validation error.
    #[snafu(display("configuration error: {message}"))]
    Config {
        /// Error description.
        message: String,
    },

    /// Session persistence I/O failure.
    #[snafu(display("session storage error: {source}"))]
    Storage {
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl SdkError {
    /// Returns true if this condition means the session has ended.
    ///
    /// Callers owning background work (polling, refresh loops) stop on this;
    /// navigation is the embedding application's responsibility.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Returns true if this is a local per-record busy rejection.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }

    /// Returns the HTTP status if this is a transport error carrying one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SdkError {
    fn from(source: serde_json::Error) -> Self {
        Self::Decode { message: source.to_string() }
    }
}
