use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use growlog_core::auth::{Identity, IdentityProvider, SessionIdentityProvider};
use growlog_core::config::{QueueConfig, RemoteConfig};
use growlog_core::connectivity::ConnectivitySignal;
use growlog_core::remote::{
    RemoteError, RemoteResult, SupabaseUpsertClient, UpsertOptions, UpsertService,
};
use growlog_core::storage::SqliteBuffer;
use growlog_core::util::compact_text;
use growlog_core::{FieldValue, OfflineWriteQueue, QueuedRecord};

use crate::auth::{identity_provider, SessionStore};
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

const PROBE_TIMEOUT: Duration = Duration::from_secs(4);
const BUFFER_CAPACITY_ENV: &str = "GROWLOG_BUFFER_CAPACITY";

pub type CliQueue = OfflineWriteQueue<SqliteBuffer, RemoteStore, CliIdentity>;

/// Everything a command needs to open the queue
#[derive(Debug, Clone)]
pub struct CliContext {
    pub db_path: PathBuf,
    pub profile_name: String,
    pub remote: Option<RemoteConfig>,
    pub queue: QueueConfig,
}

impl CliContext {
    pub fn load(db_path: Option<PathBuf>, profile: Option<&str>) -> Result<Self, CliError> {
        let config = CliProfilesConfig::load().map_err(CliError::Config)?;
        let profile_name = config.resolve_profile_name(profile);
        let remote = config
            .profile(&profile_name)
            .cloned()
            .unwrap_or_default()
            .remote_config(|name| env::var(name).ok())
            .map_err(CliError::Config)?;

        Ok(Self {
            db_path: resolve_db_path(db_path),
            profile_name,
            remote,
            queue: queue_config(|name| env::var(name).ok())?,
        })
    }

    pub fn require_remote(&self) -> Result<&RemoteConfig, CliError> {
        self.remote.as_ref().ok_or(CliError::SyncNotConfigured)
    }
}

/// Remote side of the CLI queue.
///
/// Capturing works without any remote configured; only flushing needs one.
pub enum RemoteStore {
    Supabase(SupabaseUpsertClient),
    Unconfigured,
}

impl UpsertService for RemoteStore {
    async fn upsert(
        &self,
        identity: &Identity,
        records: &[QueuedRecord],
        options: UpsertOptions,
    ) -> RemoteResult<()> {
        match self {
            Self::Supabase(client) => client.upsert(identity, records, options).await,
            Self::Unconfigured => Err(RemoteError::InvalidConfiguration(
                "no Supabase project configured".to_string(),
            )),
        }
    }
}

pub enum CliIdentity {
    Session(SessionIdentityProvider<SessionStore>),
    Anonymous,
}

impl IdentityProvider for CliIdentity {
    async fn resolve_identity(&self) -> Option<Identity> {
        match self {
            Self::Session(provider) => provider.resolve_identity().await,
            Self::Anonymous => None,
        }
    }
}

pub fn open_queue(context: &CliContext, online: bool) -> Result<CliQueue, CliError> {
    let buffer =
        SqliteBuffer::open(&context.db_path)?.with_capacity(context.queue.capacity_bytes);
    let (remote, identity) = match &context.remote {
        Some(config) => (
            RemoteStore::Supabase(
                SupabaseUpsertClient::new(config)
                    .map_err(|error| CliError::Config(error.to_string()))?,
            ),
            CliIdentity::Session(
                identity_provider(&context.profile_name, config)
                    .map_err(|error| CliError::Auth(error.to_string()))?,
            ),
        ),
        None => (RemoteStore::Unconfigured, CliIdentity::Anonymous),
    };

    Ok(OfflineWriteQueue::open_with_config(
        buffer,
        remote,
        identity,
        ConnectivitySignal::new(online),
        context.queue.clone(),
    )?)
}

/// Queue settings; `GROWLOG_BUFFER_CAPACITY` overrides the buffer size in bytes
pub fn queue_config(lookup: impl Fn(&str) -> Option<String>) -> Result<QueueConfig, CliError> {
    let mut config = QueueConfig::default();
    if let Some(raw) = lookup(BUFFER_CAPACITY_ENV) {
        config.capacity_bytes = raw.trim().parse().map_err(|_| {
            CliError::Config(format!(
                "{BUFFER_CAPACITY_ENV} must be a number of bytes, got '{raw}'"
            ))
        })?;
    }
    Ok(config)
}

/// Whether the Supabase project answers at all.
///
/// Any HTTP response counts as reachable; only transport failures mean
/// offline.
pub async fn probe_connectivity(remote: &RemoteConfig) -> bool {
    let client = match reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() {
        Ok(client) => client,
        Err(error) => {
            tracing::debug!("Could not build probe client: {}", error);
            return false;
        }
    };

    match client
        .get(remote.health_url())
        .header("apikey", &remote.supabase_anon_key)
        .send()
        .await
    {
        Ok(response) => {
            tracing::debug!("Reachability probe answered {}", response.status());
            true
        }
        Err(error) => {
            tracing::debug!("Reachability probe failed: {}", error);
            false
        }
    }
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("GROWLOG_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join("growlog")
        .join("growlog.db")
}

/// Parse `key=value`, reading the value as bool, integer, float, or text
pub fn parse_field(raw: &str) -> Result<(String, FieldValue), CliError> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(CliError::InvalidInput(format!(
            "field '{raw}' must look like key=value"
        )));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::InvalidInput(format!(
            "field '{raw}' has an empty name"
        )));
    }

    let value = value.trim();
    let parsed = if let Ok(flag) = value.parse::<bool>() {
        FieldValue::Bool(flag)
    } else if let Ok(number) = value.parse::<i64>() {
        FieldValue::Integer(number)
    } else if let Ok(number) = value.parse::<f64>() {
        FieldValue::Float(number)
    } else {
        FieldValue::Text(value.to_string())
    };
    Ok((key.to_string(), parsed))
}

pub fn format_sync_time(last_sync_time: Option<DateTime<Utc>>) -> String {
    last_sync_time.map_or_else(
        || "never".to_string(),
        |time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_record_lines(records: &[QueuedRecord]) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            let target = record
                .field("target")
                .map_or_else(|| "-".to_string(), ToString::to_string);
            let fields = record
                .payload
                .iter()
                .filter(|(name, _)| name.as_str() != "target")
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(" ");
            let owner = record.owner_id.as_deref().unwrap_or("(unowned)");

            format!(
                "{}  {:<12}  {:<10}  {}",
                record.creation_timestamp,
                target,
                owner,
                compact_text(&fields)
            )
        })
        .collect()
}
