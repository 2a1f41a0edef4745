//! Supabase (PostgREST) upsert client

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{RemoteError, RemoteResult, UpsertOptions, UpsertService};
use crate::auth::Identity;
use crate::config::RemoteConfig;
use crate::models::QueuedRecord;
use crate::util::compact_text;

const UPSERT_TIMEOUT_SECS: u64 = 30;

/// Upserts rows into one PostgREST table
#[derive(Clone)]
pub struct SupabaseUpsertClient {
    endpoint: String,
    anon_key: String,
    client: Client,
}

impl SupabaseUpsertClient {
    pub fn new(config: &RemoteConfig) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(UPSERT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            endpoint: table_endpoint(&config.supabase_url, &config.table),
            anon_key: config.supabase_anon_key.clone(),
            client,
        })
    }
}

impl UpsertService for SupabaseUpsertClient {
    async fn upsert(
        &self,
        identity: &Identity,
        records: &[QueuedRecord],
        options: UpsertOptions,
    ) -> RemoteResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let bearer = identity.access_token.as_deref().ok_or_else(|| {
            RemoteError::InvalidConfiguration(format!(
                "identity '{}' has no access token",
                identity.user_id
            ))
        })?;

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("on_conflict", options.conflict_key)])
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
            .header("Prefer", prefer_header(options))
            .json(records)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Api {
                status: status.as_u16(),
                message: parse_api_error(status, &body),
            });
        }

        tracing::debug!("Upserted {} rows into {}", records.len(), self.endpoint);
        Ok(())
    }
}

fn table_endpoint(supabase_url: &str, table: &str) -> String {
    format!(
        "{}/rest/v1/{}",
        supabase_url.trim_end_matches('/'),
        urlencoding::encode(table)
    )
}

fn prefer_header(options: UpsertOptions) -> &'static str {
    if options.ignore_duplicates {
        "resolution=ignore-duplicates,return=minimal"
    } else {
        "resolution=merge-duplicates,return=minimal"
    }
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
    error: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<PostgrestErrorBody>(body) {
        if let Some(message) = payload
            .message
            .or(payload.error)
            .or(payload.details)
            .or(payload.hint)
        {
            return compact_text(&message);
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        trimmed
    }
}
