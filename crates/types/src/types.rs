//! Entity definitions for the Masthead console.
//!
//! These types mirror the backend's JSON wire format (camelCase fields,
//! `_id` identifiers) while keeping classifications closed: an article's
//! `actionTag` and a user's `status` only ever hold enumerated values.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Fallback label for an article whose author field is absent or blank.
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Fallback label for a user with no usable name fields.
pub const UNKNOWN_USER: &str = "Unknown User";

// ============================================================================
// Identifier Types
// ============================================================================

/// Generates a newtype wrapper around a `String` for type-safe identifiers.
///
/// Each generated type provides:
/// - Standard derives: Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord
/// - Serde with `#[serde(transparent)]` for wire format compatibility
/// - `From<&str>` / `From<String>` conversions
/// - `Display` rendering the raw identifier
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from a raw value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the raw identifier string.
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

define_id!(
    /// Unique identifier for an article.
    ArticleId
);

define_id!(
    /// Unique identifier for a platform user.
    UserId
);

define_id!(
    /// Unique identifier for an admin notification.
    NotificationId
);

// ============================================================================
// Classifications
// ============================================================================

/// Classification driving an article's displayed status and available
/// transitions.
///
/// The set is closed: wire values outside it are rejected at the boundary
/// rather than carried through as open strings. The parse also accepts the
/// transition command `"unsuspend"`, normalizing it to [`ActionTag::Active`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionTag {
    /// Published and visible.
    Active,
    /// Hidden from the platform.
    Suspend,
    /// Spotlighted on the front page.
    Spot,
    /// Featured in its category.
    Feat,
    /// Featured spotlight (both placements).
    Fspot,
}

impl ActionTag {
    /// Wire representation of the tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ActionTag::Active => "active",
            ActionTag::Suspend => "suspend",
            ActionTag::Spot => "spot",
            ActionTag::Feat => "feat",
            ActionTag::Fspot => "fspot",
        }
    }

    /// Human-readable label for tables and exports.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ActionTag::Active => "Active",
            ActionTag::Suspend => "Suspended",
            ActionTag::Spot => "Spotlight",
            ActionTag::Feat => "Featured",
            ActionTag::Fspot => "Featured Spotlight",
        }
    }

    /// Whether the tag places the article in a spotlight slot.
    #[must_use]
    pub fn is_spotlighted(self) -> bool {
        matches!(self, ActionTag::Spot | ActionTag::Fspot)
    }

    /// Whether the tag hides the article.
    #[must_use]
    pub fn is_suspended(self) -> bool {
        matches!(self, ActionTag::Suspend)
    }
}

impl FromStr for ActionTag {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" | "unsuspend" => Ok(ActionTag::Active),
            "suspend" => Ok(ActionTag::Suspend),
            "spot" => Ok(ActionTag::Spot),
            "feat" => Ok(ActionTag::Feat),
            "fspot" => Ok(ActionTag::Fspot),
            other => Err(TypeError::UnknownActionTag { value: other.to_owned() }),
        }
    }
}

impl fmt::Display for ActionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account standing of a platform user.
///
/// Closed set; the parse also accepts the transition commands `"suspend"`
/// and `"unsuspend"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// Account in good standing.
    Active,
    /// Account suspended by staff.
    Suspended,
}

impl UserStatus {
    /// Wire representation of the status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Suspended => "suspended",
        }
    }

    /// Human-readable label for tables and exports.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            UserStatus::Active => "Active",
            UserStatus::Suspended => "Suspended",
        }
    }
}

impl FromStr for UserStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" | "unsuspend" => Ok(UserStatus::Active),
            "suspended" | "suspend" => Ok(UserStatus::Suspended),
            other => Err(TypeError::UnknownUserStatus { value: other.to_owned() }),
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A long-form article managed through the console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Backend identifier.
    #[serde(rename = "_id")]
    pub id: ArticleId,
    /// Headline.
    pub title: String,
    /// Standfirst / summary line shown under the headline.
    #[serde(default)]
    pub meta: String,
    /// Author display name; may be absent on partial records.
    #[serde(default)]
    pub author_name: Option<String>,
    /// Editorial category.
    #[serde(default)]
    pub category: String,
    /// Current classification.
    pub action_tag: ActionTag,
    /// First publication time.
    pub published_at: DateTime<Utc>,
    /// Last edit time, when the backend reports one.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Lifetime view counter.
    #[serde(default)]
    pub views: u64,
}

impl Article {
    /// Author name with the defined fallback for partial records, so search
    /// and export stay well-defined.
    #[must_use]
    pub fn author_label(&self) -> &str {
        match self.author_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => UNKNOWN_AUTHOR,
        }
    }
}

/// A platform user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Backend identifier.
    #[serde(rename = "_id")]
    pub id: UserId,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Login email.
    pub email: String,
    /// Platform role (reader, author, ...). Open-ended by design.
    #[serde(default)]
    pub role: String,
    /// Account standing.
    pub status: UserStatus,
    /// Last recorded activity.
    pub last_active_at: DateTime<Utc>,
}

impl User {
    /// Full display name, falling back to [`UNKNOWN_USER`] when both name
    /// fields are blank.
    #[must_use]
    pub fn display_name(&self) -> String {
        let joined = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let joined = joined.trim();
        if joined.is_empty() { UNKNOWN_USER.to_owned() } else { joined.to_owned() }
    }
}

/// An admin-facing notification entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Backend identifier.
    #[serde(rename = "_id")]
    pub id: NotificationId,
    /// Notification category (`"user"`, `"article"`, ...).
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Short headline.
    pub title: String,
    /// Body text.
    #[serde(default)]
    pub message: String,
    /// Whether staff have read this entry.
    #[serde(default)]
    pub read: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// The authenticated staff identity, as returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminIdentity {
    /// Backend identifier.
    pub id: String,
    /// Login email.
    pub email: String,
    /// Staff role.
    pub role: String,
}

// ============================================================================
// Resource Trait
// ============================================================================

/// An entity kind manageable through the generic list engine.
///
/// Implementations supply the field projections the engine needs: identity,
/// the ordered text fields eligible for search, the local write performed by
/// an optimistic status mutation, and the fixed column layout for snapshot
/// export.
pub trait Resource: Clone + fmt::Debug + Send + Sync + 'static {
    /// Classification written by a status mutation.
    type Action: Copy + fmt::Debug + Send + Sync + 'static;

    /// Stable unique identifier.
    fn id(&self) -> &str;

    /// Ordered text attributes eligible for search.
    fn searchable_fields(&self) -> Vec<Cow<'_, str>>;

    /// Applies a status mutation to the in-memory record (the optimistic
    /// write; the server's returned representation later replaces it).
    fn apply_action(&mut self, action: Self::Action);

    /// Fixed column order for snapshot export.
    fn export_columns() -> &'static [&'static str];

    /// One export row, aligned with [`Resource::export_columns`].
    fn export_row(&self) -> Vec<String>;
}

impl Resource for Article {
    type Action = ActionTag;

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn searchable_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.title.as_str()),
            Cow::Borrowed(self.author_label()),
            Cow::Borrowed(self.category.as_str()),
        ]
    }

    fn apply_action(&mut self, action: ActionTag) {
        self.action_tag = action;
    }

    fn export_columns() -> &'static [&'static str] {
        &["Title", "Author", "Category", "Status", "Published", "Views"]
    }

    fn export_row(&self) -> Vec<String> {
        vec![
            self.title.clone(),
            self.author_label().to_owned(),
            self.category.clone(),
            self.action_tag.label().to_owned(),
            self.published_at.to_rfc3339(),
            self.views.to_string(),
        ]
    }
}

impl Resource for User {
    type Action = UserStatus;

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn searchable_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Owned(self.display_name()),
            Cow::Borrowed(self.email.as_str()),
            Cow::Borrowed(self.role.as_str()),
            Cow::Borrowed(self.status.label()),
        ]
    }

    fn apply_action(&mut self, action: UserStatus) {
        self.status = action;
    }

    fn export_columns() -> &'static [&'static str] {
        &["Name", "Email", "Role", "Status", "Last Active"]
    }

    fn export_row(&self) -> Vec<String> {
        vec![
            self.display_name(),
            self.email.clone(),
            self.role.clone(),
            self.status.label().to_owned(),
            self.last_active_at.to_rfc3339(),
        ]
    }
}
