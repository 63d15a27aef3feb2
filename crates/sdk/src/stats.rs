//! Aggregate stats projection.
//!
//! Pure derivations over the collections the list controllers already hold,
//! never a separately fetched copy that can drift. `now` is a parameter so
//! every projection is deterministic and reproducible.

use chrono::{DateTime, Utc};
use masthead_types::time::{activity_window, is_within};
use masthead_types::{Article, User, UserStatus};

/// Counts derived from the user collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserOverview {
    /// All users.
    pub total: usize,
    /// Users whose last activity falls within the recency window.
    pub active: usize,
    /// Suspended users.
    pub suspended: usize,
}

/// Counts derived from the article collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArticleOverview {
    /// All articles.
    pub total: usize,
    /// Articles in a spotlight slot (spotlight or featured spotlight).
    pub spotlighted: usize,
    /// Suspended articles.
    pub suspended: usize,
}

/// The dashboard's combined stat row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardOverview {
    /// User counts.
    pub users: UserOverview,
    /// Article counts.
    pub articles: ArticleOverview,
}

/// Projects user counts from an already-fetched collection.
#[must_use]
pub fn project_users(users: &[User], now: DateTime<Utc>) -> UserOverview {
    UserOverview {
        total: users.len(),
        active: users
            .iter()
            .filter(|u| is_within(u.last_active_at, activity_window(), now))
            .count(),
        suspended: users.iter().filter(|u| u.status == UserStatus::Suspended).count(),
    }
}

/// Projects article counts from an already-fetched collection.
#[must_use]
pub fn project_articles(articles: &[Article]) -> ArticleOverview {
    ArticleOverview {
        total: articles.len(),
        spotlighted: articles.iter().filter(|a| a.action_tag.is_spotlighted()).count(),
        suspended: articles.iter().filter(|a| a.action_tag.is_suspended()).count(),
    }
}

/// Projects the full dashboard row from both collections.
#[must_use]
pub fn project_dashboard(
    users: &[User],
    articles: &[Article],
    now: DateTime<Utc>,
) -> DashboardOverview {
    DashboardOverview {
        users: project_users(users, now),
        articles: project_articles(articles),
    }
}
