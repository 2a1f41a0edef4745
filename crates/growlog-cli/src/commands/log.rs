use chrono::{DateTime, SecondsFormat, Utc};
use growlog_core::agronomy::vapor_pressure_deficit;
use growlog_core::QueuedRecord;

use crate::auth::load_stored_session;
use crate::cli::LogArgs;
use crate::commands::common::{open_queue, parse_field, CliContext};
use crate::error::CliError;

pub fn run_log(args: &LogArgs, context: &CliContext) -> Result<(), CliError> {
    let mut record = build_observation(args, Utc::now())?;

    // The owner is optional here; a flush fills it in from whoever is signed in then
    match load_stored_session(&context.profile_name) {
        Ok(Some(session)) => record.owner_id = Some(session.user.id),
        Ok(None) => {}
        Err(error) => tracing::debug!("No stored session for owner stamping: {}", error),
    }

    let queue = open_queue(context, false)?;
    let queue_length = queue.enqueue(record)?;
    println!("Queued observation ({queue_length} pending)");
    Ok(())
}

/// Turn `log` arguments into a queued record observed at `now` unless
/// `--at` says otherwise.
///
/// When both temperature and humidity are given the air VPD is derived and
/// stored alongside them.
pub fn build_observation(args: &LogArgs, now: DateTime<Utc>) -> Result<QueuedRecord, CliError> {
    let target = args.target.trim();
    if target.is_empty() {
        return Err(CliError::InvalidInput("target must not be empty".to_string()));
    }

    let created_at = match args.at.as_deref().map(str::trim) {
        Some(at) if !at.is_empty() => DateTime::parse_from_rfc3339(at)
            .map_err(|error| CliError::InvalidInput(format!("--at '{at}': {error}")))?
            .with_timezone(&Utc),
        _ => now,
    };

    let mut record = QueuedRecord::new(created_at.to_rfc3339_opts(SecondsFormat::Millis, true))
        .with_field("target", target);

    if let Some(ph) = args.ph {
        record = record.with_field("ph", ph);
    }
    if let Some(ec) = args.ec {
        record = record.with_field("ec", ec);
    }
    if let Some(temperature_c) = args.temperature_c {
        record = record.with_field("temperature_c", temperature_c);
    }
    if let Some(humidity) = args.humidity {
        record = record.with_field("humidity", humidity);
    }
    if let (Some(temperature_c), Some(humidity)) = (args.temperature_c, args.humidity) {
        let vpd = vapor_pressure_deficit(temperature_c, humidity, 0.0)?;
        record = record.with_field("vpd_kpa", (vpd * 1000.0).round() / 1000.0);
    }

    for raw in &args.fields {
        let (name, value) = parse_field(raw)?;
        record = record.with_field(name, value);
    }

    record.validate()?;
    Ok(record)
}
