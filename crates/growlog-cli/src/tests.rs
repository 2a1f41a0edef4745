use chrono::{TimeZone, Utc};
use clap::Parser;
use growlog_core::agronomy::vapor_pressure_deficit;
use growlog_core::auth::{AuthSession, AuthUser, SessionPersistence};
use growlog_core::config::{QueueConfig, RemoteConfig};
use growlog_core::{FieldValue, FlushOutcome, FlushSkip, QueuedRecord};
use pretty_assertions::assert_eq;

use crate::auth::SessionStore;
use crate::cli::{Cli, Commands, CompletionShell, LogArgs};
use crate::commands::common::{
    format_record_lines, format_sync_time, open_queue, parse_field, queue_config, CliContext,
};
use crate::commands::completions::render_completions;
use crate::commands::config::{apply_profile_update, redact_key, ProfileUpdate};
use crate::commands::log::{build_observation, run_log};
use crate::commands::sync::run_sync;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

fn log_args(target: &str) -> LogArgs {
    LogArgs {
        target: target.to_string(),
        ..LogArgs::default()
    }
}

fn local_context(dir: &tempfile::TempDir, profile_name: &str) -> CliContext {
    CliContext {
        db_path: dir.path().join("growlog.db"),
        profile_name: profile_name.to_string(),
        remote: None,
        queue: QueueConfig::default(),
    }
}

#[test]
fn log_command_accepts_negative_temperatures() {
    let cli = Cli::try_parse_from([
        "growlog", "log", "--target", "tray-4", "--temp", "-2.5", "--humidity", "80",
    ])
    .unwrap();

    let Commands::Log(args) = cli.command else {
        panic!("expected log command");
    };
    assert_eq!(args.target, "tray-4");
    assert_eq!(args.temperature_c, Some(-2.5));
    assert_eq!(args.humidity, Some(80.0));
}

#[test]
fn build_observation_uses_now_and_derives_vpd() {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 6, 30, 0).unwrap();
    let args = LogArgs {
        ph: Some(5.9),
        temperature_c: Some(24.0),
        humidity: Some(60.0),
        ..log_args("reservoir-1")
    };

    let record = build_observation(&args, now).unwrap();

    let expected_vpd =
        (vapor_pressure_deficit(24.0, 60.0, 0.0).unwrap() * 1000.0).round() / 1000.0;
    assert_eq!(record.creation_timestamp, "2026-03-01T06:30:00.000Z");
    assert_eq!(record.field("target"), Some(&FieldValue::from("reservoir-1")));
    assert_eq!(record.field("ph"), Some(&FieldValue::Float(5.9)));
    assert_eq!(record.field("vpd_kpa"), Some(&FieldValue::Float(expected_vpd)));
    assert_eq!(record.owner_id, None);
}

#[test]
fn build_observation_skips_vpd_without_humidity() {
    let args = LogArgs {
        temperature_c: Some(21.0),
        ..log_args("zone-b")
    };
    let record = build_observation(&args, Utc::now()).unwrap();
    assert!(record.field("vpd_kpa").is_none());
}

#[test]
fn build_observation_honours_explicit_time() {
    let args = LogArgs {
        at: Some("2026-03-01T08:00:00+02:00".to_string()),
        ..log_args("tray-1")
    };
    let record = build_observation(&args, Utc::now()).unwrap();
    assert_eq!(record.creation_timestamp, "2026-03-01T06:00:00.000Z");
}

#[test]
fn build_observation_rejects_bad_input() {
    assert!(matches!(
        build_observation(&log_args("  "), Utc::now()),
        Err(CliError::InvalidInput(_))
    ));

    let bad_time = LogArgs {
        at: Some("yesterday".to_string()),
        ..log_args("tray-1")
    };
    assert!(matches!(
        build_observation(&bad_time, Utc::now()),
        Err(CliError::InvalidInput(_))
    ));

    let reserved = LogArgs {
        fields: vec!["sync_key=forged".to_string()],
        ..log_args("tray-1")
    };
    assert!(matches!(
        build_observation(&reserved, Utc::now()),
        Err(CliError::Core(_))
    ));

    let out_of_range = LogArgs {
        temperature_c: Some(22.0),
        humidity: Some(140.0),
        ..log_args("tray-1")
    };
    assert!(matches!(
        build_observation(&out_of_range, Utc::now()),
        Err(CliError::Agronomy(_))
    ));
}

#[test]
fn parse_field_infers_value_types() {
    assert_eq!(
        parse_field("germinated=true").unwrap(),
        ("germinated".to_string(), FieldValue::Bool(true))
    );
    assert_eq!(
        parse_field("tray_count = 12").unwrap(),
        ("tray_count".to_string(), FieldValue::Integer(12))
    );
    assert_eq!(
        parse_field("weight_g=142.5").unwrap(),
        ("weight_g".to_string(), FieldValue::Float(142.5))
    );
    assert_eq!(
        parse_field("crop=pea shoots").unwrap(),
        ("crop".to_string(), FieldValue::from("pea shoots"))
    );
    assert!(parse_field("no-separator").is_err());
    assert!(parse_field("=5").is_err());
}

#[test]
fn format_sync_time_reports_never() {
    assert_eq!(format_sync_time(None), "never");
    let synced = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 5).unwrap();
    assert_eq!(format_sync_time(Some(synced)), "2026-03-01 12:00:05 UTC");
}

#[test]
fn format_record_lines_lists_target_and_fields() {
    let record = QueuedRecord::new("2026-03-01T06:30:00.000Z")
        .with_field("target", "tray-4")
        .with_field("ph", 6.1);
    let lines = format_record_lines(&[record]);

    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("2026-03-01T06:30:00.000Z  tray-4"));
    assert!(lines[0].contains("(unowned)"));
    assert!(lines[0].ends_with("ph=6.1"));
}

#[test]
fn profile_update_requires_url_and_key_together() {
    let mut config = CliProfilesConfig::default();
    let result = apply_profile_update(
        &mut config,
        "farm",
        ProfileUpdate {
            supabase_url: Some("https://farm.supabase.co".to_string()),
            ..ProfileUpdate::default()
        },
        true,
    );

    assert!(matches!(result, Err(CliError::Config(_))));
    assert!(config.profile("farm").is_none());
    assert_eq!(config.active_profile, None);
}

#[test]
fn profile_update_merges_and_activates() {
    let mut config = CliProfilesConfig::default();
    apply_profile_update(
        &mut config,
        "farm",
        ProfileUpdate {
            supabase_url: Some("https://farm.supabase.co/".to_string()),
            supabase_anon_key: Some("anon".to_string()),
            table: None,
        },
        false,
    )
    .unwrap();
    assert_eq!(config.active_profile, None);

    apply_profile_update(
        &mut config,
        "farm",
        ProfileUpdate {
            table: Some("tray_readings".to_string()),
            ..ProfileUpdate::default()
        },
        true,
    )
    .unwrap();

    let remote = config
        .profile("farm")
        .unwrap()
        .remote_config(|_| None)
        .unwrap();
    assert_eq!(
        remote,
        Some(RemoteConfig {
            supabase_url: "https://farm.supabase.co".to_string(),
            supabase_anon_key: "anon".to_string(),
            table: "tray_readings".to_string(),
        })
    );
    assert_eq!(config.active_profile.as_deref(), Some("farm"));
}

#[test]
fn redact_key_keeps_short_prefix() {
    assert_eq!(redact_key("eyJhbGciOiJIUzI1NiJ9"), "eyJhbG***");
    assert_eq!(redact_key("abc"), "***");
}

#[test]
fn completions_use_binary_name() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("growlog"));
}

#[test]
fn queue_config_reads_capacity_override() {
    let config = queue_config(|name| {
        (name == "GROWLOG_BUFFER_CAPACITY").then(|| " 4096 ".to_string())
    })
    .unwrap();
    assert_eq!(config.capacity_bytes, 4096);
    assert_eq!(config.storage_key, QueueConfig::default().storage_key);

    assert_eq!(queue_config(|_| None).unwrap(), QueueConfig::default());
    assert!(matches!(
        queue_config(|_| Some("lots".to_string())),
        Err(CliError::Config(_))
    ));
}

#[test]
fn open_queue_enforces_configured_capacity() {
    let dir = tempfile::tempdir().unwrap();
    let mut context = local_context(&dir, "default");
    context.queue.capacity_bytes = 64;
    let queue = open_queue(&context, false).unwrap();

    let error = queue
        .enqueue(QueuedRecord::new("2026-02-01T08:00:00Z").with_field("target_id", "tray-3"))
        .unwrap_err();
    assert!(matches!(
        error,
        growlog_core::Error::QuotaExceeded { capacity: 64, .. }
    ));
    assert_eq!(queue.queue_length(), 0);
}

#[test]
fn queue_survives_reopen_without_remote() {
    let dir = tempfile::tempdir().unwrap();
    let context = local_context(&dir, "tests-reopen");

    let queue = open_queue(&context, false).unwrap();
    queue
        .enqueue(build_observation(&log_args("tray-1"), Utc::now()).unwrap())
        .unwrap();
    queue
        .enqueue(build_observation(&log_args("tray-2"), Utc::now()).unwrap())
        .unwrap();
    drop(queue);

    let reopened = open_queue(&context, false).unwrap();
    let pending = reopened.pending().unwrap();
    assert_eq!(reopened.queue_length(), 2);
    assert_eq!(pending[0].field("target"), Some(&FieldValue::from("tray-1")));
    assert_eq!(pending[1].field("target"), Some(&FieldValue::from("tray-2")));
}

#[tokio::test]
async fn unconfigured_queue_never_sends() {
    let dir = tempfile::tempdir().unwrap();
    let context = local_context(&dir, "tests-unconfigured");

    let offline = open_queue(&context, false).unwrap();
    offline
        .enqueue(build_observation(&log_args("tray-1"), Utc::now()).unwrap())
        .unwrap();
    assert_eq!(
        offline.flush().await.unwrap(),
        FlushOutcome::Skipped(FlushSkip::Offline)
    );
    drop(offline);

    let online = open_queue(&context, true).unwrap();
    assert_eq!(
        online.flush().await.unwrap(),
        FlushOutcome::Skipped(FlushSkip::NoIdentity)
    );
    assert_eq!(online.queue_length(), 1);
}

#[tokio::test]
async fn sync_requires_remote_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let context = local_context(&dir, "tests-sync");
    assert!(matches!(
        run_sync(false, &context).await,
        Err(CliError::SyncNotConfigured)
    ));
}

#[test]
fn log_stamps_owner_from_stored_session() {
    let dir = tempfile::tempdir().unwrap();
    let context = local_context(&dir, "tests-owner");
    SessionStore::new("tests-owner")
        .save_session(&AuthSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: 4_000_000_000,
            user: AuthUser {
                id: "farmerA".to_string(),
                email: Some("a@farm.test".to_string()),
            },
        })
        .unwrap();

    let args = LogArgs {
        at: Some("2026-03-01T06:30:00Z".to_string()),
        ..log_args("tray-9")
    };
    run_log(&args, &context).unwrap();

    let pending = open_queue(&context, false).unwrap().pending().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].owner_id.as_deref(), Some("farmerA"));
    assert_eq!(
        pending[0].sync_key.as_deref(),
        Some("farmerA_2026-03-01T06:30:00.000Z")
    );
}
