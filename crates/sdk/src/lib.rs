//! Client core for the Masthead admin console.
//!
//! This crate is the decision-making core the console's presentation layer
//! binds to: session lifecycle, authenticated requests, the generic resource
//! list engine, notification polling, and aggregate stats. Rendering,
//! routing, and styling live in the embedding application; this library
//! exposes view models and mutation handles.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use masthead_sdk::{ClientConfig, ConsoleClient};
//!
//! #[tokio::main]
//! async fn main() -> masthead_sdk::Result<()> {
//!     let config = ClientConfig::builder()
//!         .with_base_url("https://api.masthead.io/admin/")
//!         .with_session_file("~/.masthead/session.json")
//!         .build()?;
//!     let client = ConsoleClient::new(config)?;
//!
//!     client.login("staff@masthead.io", "secret").await?;
//!
//!     let articles = client.articles();
//!     articles.refresh().await?;
//!     articles.set_query("lagos");
//!     let view = articles.view();
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConsoleClient (Public API)                  │
//! │  .login() │ .articles() │ .users() │ .notification_feed()   │
//! ├──────────────────────┬──────────────────────────────────────┤
//! │  ListController      │  NotificationFeed │ stats projector  │
//! │  fetch/filter/page   │  poll + unread    │ pure derivation  │
//! │  optimistic mutation │  overlap guard    │ over collections │
//! ├──────────────────────┴──────────────────────────────────────┤
//! │                   Authenticated Gateway                     │
//! │   credential attach │ teardown on 401/403 │ timeout         │
//! ├─────────────────────────────────────────────────────────────┤
//! │   SessionStore                  │  Transport               │
//! │   acquire/clear/epoch/token     │  HttpTransport │ mock    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod api;
mod client;
mod config;
mod error;
mod feed;
mod gateway;
mod http;
mod list;
pub mod mock;
mod session;
mod stats;
mod transport;

// Public API exports
pub use api::{ArticleSource, ConsoleApi, UserSource};
pub use client::ConsoleClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{Result, SdkError};
pub use feed::{NotificationFeed, PollingHandle};
pub use gateway::Gateway;
pub use http::HttpTransport;
pub use list::{
    CollectionSource, ListController, ListPhase, ListView, RemovableSource, Snapshot, clamp_page,
    filter, page_count, paginate,
};
pub use session::{
    FileSessionStorage, MemorySessionStorage, PersistedSession, SessionSnapshot, SessionStatus,
    SessionStorage, SessionStore,
};
pub use stats::{
    ArticleOverview, DashboardOverview, UserOverview, project_articles, project_dashboard,
    project_users,
};
pub use transport::{Method, Transport, TransportRequest, TransportResponse};

// Re-export commonly used types from masthead-types
pub use masthead_types::{
    ActionTag, AdminIdentity, Article, ArticleId, Notification, NotificationId, Resource, User,
    UserId, UserStatus,
};
