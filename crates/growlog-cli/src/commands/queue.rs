use growlog_core::QueuedRecord;
use serde::Serialize;

use crate::commands::common::{format_record_lines, format_sync_time, open_queue, CliContext};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct QueueReport {
    queue_length: usize,
    last_sync_time: Option<String>,
    records: Vec<QueuedRecord>,
}

pub fn run_queue(as_json: bool, context: &CliContext) -> Result<(), CliError> {
    let queue = open_queue(context, false)?;
    let status = queue.status();
    let records = queue.pending()?;

    if as_json {
        let report = QueueReport {
            queue_length: status.queue_length,
            last_sync_time: status.last_sync_time.map(|time| time.to_rfc3339()),
            records,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} pending, last sync {}",
        status.queue_length,
        format_sync_time(status.last_sync_time)
    );
    for line in format_record_lines(&records) {
        println!("{line}");
    }
    Ok(())
}
