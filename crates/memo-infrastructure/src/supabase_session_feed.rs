//! Supabase auth session feed.
//!
//! Restores the session from the token file, keeps it fresh with a background task that
//! refreshes shortly before expiry, and publishes every sign-in, sign-out and refresh to
//! subscribers.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use memo_core::config::SupabaseSettings;
use memo_core::error::Result;
use memo_core::session::{
    SESSION_FEED_CAPACITY, Session, SessionChange, SessionFeed, SessionSubscription, SessionUser,
    UserId,
};

use crate::session_token_store::SessionTokenStore;
use crate::supabase_entry_store::remote_error;

/// Sessions expiring within this window are refreshed before use.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Wait before retrying a failed background refresh while the token is still valid.
const REFRESH_RETRY_SECS: u64 = 10;

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

/// Token response shared by the password and refresh grants.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| self.expires_in.map(|secs| now + Duration::seconds(secs)));
        Session {
            user: SessionUser {
                id: UserId::new(self.user.id),
                email: self.user.email,
            },
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        }
    }
}

/// How long to wait before refreshing `session`, or `None` if it never expires.
fn refresh_delay(session: &Session, now: DateTime<Utc>) -> Option<std::time::Duration> {
    let expires_at = session.expires_at?;
    let due = expires_at - Duration::seconds(REFRESH_MARGIN_SECS);
    Some((due - now).to_std().unwrap_or_default())
}

/// Auth endpoints plus the persisted token and the change channel.
#[derive(Clone)]
struct AuthClient {
    http_client: reqwest::Client,
    api_url: String,
    anon_key: String,
    token_store: SessionTokenStore,
    tx: broadcast::Sender<SessionChange>,
}

impl AuthClient {
    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.api_url, path)
    }

    fn publish(&self, change: SessionChange) {
        let _ = self.tx.send(change);
    }

    async fn password_grant(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .http_client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&PasswordGrant { email, password })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(remote_error(response, "sign in").await);
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.into_session(Utc::now()))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        let response = self
            .http_client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.anon_key)
            .json(&RefreshGrant { refresh_token })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(remote_error(response, "refresh session").await);
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.into_session(Utc::now()))
    }

    async fn logout(&self, access_token: &str) -> Result<()> {
        let response = self
            .http_client
            .post(self.auth_url("logout"))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(remote_error(response, "sign out").await);
        }
        Ok(())
    }

    /// Refreshes `session` before each expiry until it can no longer be kept.
    ///
    /// A failed refresh is retried while the token is still valid. Once it has expired, or
    /// it expires with no refresh token, the stored session is cleared and `SignedOut` is
    /// published.
    async fn keep_fresh(self, mut session: Session) {
        while let Some(delay) = refresh_delay(&session, Utc::now()) {
            tokio::time::sleep(delay).await;

            let Some(refresh_token) = session.refresh_token.clone() else {
                if let Some(remaining) = session
                    .expires_at
                    .and_then(|expires_at| (expires_at - Utc::now()).to_std().ok())
                {
                    tokio::time::sleep(remaining).await;
                }
                tracing::info!(user_id = %session.owner(), "Session expired without refresh token");
                self.end_locally().await;
                return;
            };

            match self.refresh(&refresh_token).await {
                Ok(refreshed) => {
                    if let Err(e) = self.token_store.save(&refreshed).await {
                        tracing::warn!("Failed to persist refreshed session: {}", e);
                    }
                    tracing::info!(user_id = %refreshed.owner(), "Session refreshed");
                    self.publish(SessionChange::token_refreshed(refreshed.clone()));
                    session = refreshed;
                }
                Err(e) if session.is_expired_at(Utc::now()) => {
                    tracing::warn!("Session refresh failed after expiry, signing out: {}", e);
                    self.end_locally().await;
                    return;
                }
                Err(e) => {
                    tracing::warn!("Session refresh failed, retrying: {}", e);
                    tokio::time::sleep(std::time::Duration::from_secs(REFRESH_RETRY_SECS)).await;
                }
            }
        }
    }

    async fn end_locally(&self) {
        if let Err(e) = self.token_store.clear().await {
            tracing::warn!("Failed to clear stored session: {}", e);
        }
        self.publish(SessionChange::signed_out());
    }
}

pub struct SupabaseSessionFeed {
    auth: AuthClient,
    refresher: Mutex<Option<JoinHandle<()>>>,
}

impl SupabaseSessionFeed {
    pub fn new(settings: &SupabaseSettings, token_store: SessionTokenStore) -> Self {
        let (tx, _) = broadcast::channel(SESSION_FEED_CAPACITY);
        Self {
            auth: AuthClient {
                http_client: reqwest::Client::new(),
                api_url: settings.url.trim_end_matches('/').to_string(),
                anon_key: settings.anon_key.clone(),
                token_store,
                tx,
            },
            refresher: Mutex::new(None),
        }
    }

    /// Signs in with email and password, persists the session and publishes it.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let session = self.auth.password_grant(email, password).await?;
        self.auth.token_store.save(&session).await?;
        tracing::info!(user_id = %session.owner(), "Signed in");
        self.auth.publish(SessionChange::signed_in(session.clone()));
        self.schedule_refresh(&session);
        Ok(session)
    }

    /// Replaces any running refresh task with one following `session`.
    fn schedule_refresh(&self, session: &Session) {
        let task = tokio::spawn(self.auth.clone().keep_fresh(session.clone()));
        let mut refresher = self.refresher.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = refresher.replace(task) {
            previous.abort();
        }
    }

    fn stop_refresh(&self) {
        let mut refresher = self.refresher.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = refresher.take() {
            task.abort();
        }
    }
}

impl Drop for SupabaseSessionFeed {
    fn drop(&mut self) {
        self.stop_refresh();
    }
}

#[async_trait]
impl SessionFeed for SupabaseSessionFeed {
    async fn current_session(&self) -> Result<Option<Session>> {
        let Some(session) = self.auth.token_store.load().await? else {
            return Ok(None);
        };

        let margin = Utc::now() + Duration::seconds(REFRESH_MARGIN_SECS);
        if !session.is_expired_at(margin) {
            self.schedule_refresh(&session);
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.as_deref() else {
            tracing::info!(user_id = %session.owner(), "Stored session expired without refresh token");
            self.auth.token_store.clear().await?;
            return Ok(None);
        };

        match self.auth.refresh(refresh_token).await {
            Ok(refreshed) => {
                self.auth.token_store.save(&refreshed).await?;
                tracing::info!(user_id = %refreshed.owner(), "Session refreshed");
                self.auth.publish(SessionChange::token_refreshed(refreshed.clone()));
                self.schedule_refresh(&refreshed);
                Ok(Some(refreshed))
            }
            Err(e) => {
                tracing::warn!("Session refresh failed, clearing stored session: {}", e);
                self.auth.token_store.clear().await?;
                Ok(None)
            }
        }
    }

    fn subscribe(&self) -> SessionSubscription {
        SessionSubscription::new(self.auth.tx.subscribe())
    }

    async fn sign_out(&self) -> Result<()> {
        self.stop_refresh();
        let remote_result = match self.auth.token_store.load().await {
            Ok(Some(session)) => self.auth.logout(&session.access_token).await,
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };

        // The local session always ends, even when the server call failed
        let cleared = self.auth.token_store.clear().await;
        tracing::info!("Signed out");
        self.auth.publish(SessionChange::signed_out());
        cleared?;
        remote_result
    }
}
