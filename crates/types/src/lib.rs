//! Core entity types for the Masthead admin console.
//!
//! This crate provides the foundational types shared by the console SDK:
//! - Identifier newtypes for articles, users, and notifications
//! - Entity records with their wire (JSON) mapping
//! - Closed classification enums (`ActionTag`, `UserStatus`)
//! - The [`Resource`] trait driving the generic list engine
//! - Relative-time display helpers

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod time;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{Result, TypeError};
pub use types::*;
