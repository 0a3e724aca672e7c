//! Supabase REST entry store.
//!
//! Talks to the PostgREST endpoint of the project (`/rest/v1/{table}`). Row-level
//! security on the table restricts every request to the bearer's own rows.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;

use memo_core::MemoError;
use memo_core::config::SupabaseSettings;
use memo_core::entry::{Entry, EntryId, EntryPatch, EntryStore, NewEntry};
use memo_core::error::Result;
use memo_core::session::Session;

/// Error body returned by PostgREST and the auth API.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Turns a non-success response into a `Remote` error carrying the server's message.
pub(crate) async fn remote_error(response: Response, action: &str) -> MemoError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::error!(status = %status, body_len = body.len(), "Failed to {}", action);

    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|parsed| parsed.message.or(parsed.msg).or(parsed.error_description))
        .unwrap_or_else(|| format!("Failed to {action}: {status}"));
    MemoError::remote(message)
}

#[derive(Clone)]
pub struct SupabaseEntryStore {
    http_client: reqwest::Client,
    api_url: String,
    anon_key: String,
    table: String,
}

impl SupabaseEntryStore {
    pub fn new(settings: &SupabaseSettings) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_url: settings.url.trim_end_matches('/').to_string(),
            anon_key: settings.anon_key.clone(),
            table: settings.notes_table.clone(),
        }
    }

    /// Build the REST API URL for the notes table.
    fn rest_url(&self) -> String {
        format!("{}/rest/v1/{}", self.api_url, self.table)
    }

    fn authorized(&self, request: RequestBuilder, session: &Session) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .header("Accept", "application/json")
    }

    /// Sends a by-id mutation asking for the affected rows back, so a missing or
    /// foreign id can be told apart from success.
    async fn send_by_id(
        &self,
        request: RequestBuilder,
        session: &Session,
        id: &EntryId,
        action: &str,
    ) -> Result<()> {
        let response = self
            .authorized(request, session)
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(remote_error(response, action).await);
        }

        let affected: Vec<serde_json::Value> = response.json().await?;
        if affected.is_empty() {
            tracing::warn!(entry_id = %id, "No visible row to {}", action);
            return Err(MemoError::remote(format!("Note {id} not found")));
        }
        Ok(())
    }
}

#[async_trait]
impl EntryStore for SupabaseEntryStore {
    async fn list(&self, session: &Session) -> Result<Vec<Entry>> {
        let url = self.rest_url();
        tracing::debug!("Fetching notes from Supabase: {}", url);

        let response = self
            .authorized(self.http_client.get(&url), session)
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", session.owner())),
                ("order", "created_at.desc".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(remote_error(response, "fetch notes").await);
        }

        let entries: Vec<Entry> = response.json().await?;
        tracing::debug!("Fetched {} notes", entries.len());
        Ok(entries)
    }

    async fn insert(&self, session: &Session, entry: NewEntry) -> Result<()> {
        let response = self
            .authorized(self.http_client.post(self.rest_url()), session)
            .header("Content-Type", "application/json")
            .header("Prefer", "return=minimal")
            .json(&entry)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(remote_error(response, "create note").await);
        }
        Ok(())
    }

    async fn update_by_id(
        &self,
        session: &Session,
        id: &EntryId,
        patch: EntryPatch,
    ) -> Result<()> {
        let request = self
            .http_client
            .patch(self.rest_url())
            .header("Content-Type", "application/json")
            .json(&patch);
        self.send_by_id(request, session, id, "update note").await
    }

    async fn delete_by_id(&self, session: &Session, id: &EntryId) -> Result<()> {
        let request = self.http_client.delete(self.rest_url());
        self.send_by_id(request, session, id, "delete note").await
    }
}
