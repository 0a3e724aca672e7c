//! Session domain module.
//!
//! # Module Structure
//!
//! - `model`: `Session`, `UserId` and the change events
//! - `feed`: `SessionFeed`, the authentication collaborator interface

mod model;
pub mod feed;

// Re-export public API
pub use feed::{FeedEvent, SESSION_FEED_CAPACITY, SessionFeed, SessionSubscription};
pub use model::{AuthEvent, Session, SessionChange, SessionUser, UserId};
