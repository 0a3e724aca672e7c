//! Session domain model.
//!
//! A session is the ambient proof of the current authenticated user. Absence of a
//! session is modelled as `Option<Session>::None` everywhere rather than as a variant.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of an authenticated user, used as the owner of entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated session together with the bearer credentials the store needs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: SessionUser,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Creates a session for `user_id` with the given access token and no expiry.
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user: SessionUser {
                id: UserId::new(user_id),
                email: None,
            },
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// The user every entry created in this session is attributed to.
    pub fn owner(&self) -> &UserId {
        &self.user.id
    }

    /// Whether the access token has expired at `now`. Sessions without an expiry never do.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Label for display: the email when known, the user id otherwise.
    pub fn display_name(&self) -> &str {
        self.user.email.as_deref().unwrap_or(self.user.id.as_str())
    }
}

// Tokens never reach logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Kind of authentication event reported by the session feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// A single event on the session feed with the session that resulted from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

impl SessionChange {
    pub fn signed_in(session: Session) -> Self {
        Self {
            event: AuthEvent::SignedIn,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            event: AuthEvent::SignedOut,
            session: None,
        }
    }

    pub fn token_refreshed(session: Session) -> Self {
        Self {
            event: AuthEvent::TokenRefreshed,
            session: Some(session),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_debug_redacts_tokens() {
        let mut session = Session::new("user-1", "secret-access");
        session.refresh_token = Some("secret-refresh".to_string());
        let printed = format!("{session:?}");
        assert!(!printed.contains("secret-access"));
        assert!(!printed.contains("secret-refresh"));
        assert!(printed.contains("user-1"));
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let mut session = Session::new("user-1", "token");
        assert!(!session.is_expired_at(now));

        session.expires_at = Some(now - Duration::seconds(1));
        assert!(session.is_expired_at(now));

        session.expires_at = Some(now + Duration::minutes(5));
        assert!(!session.is_expired_at(now));
    }

    #[test]
    fn test_display_name_prefers_email() {
        let mut session = Session::new("user-1", "token");
        assert_eq!(session.display_name(), "user-1");
        session.user.email = Some("me@example.com".to_string());
        assert_eq!(session.display_name(), "me@example.com");
    }
}
