use std::sync::Arc;
use std::time::Duration;

use growlog_core::sync::FlushTrigger;

use crate::commands::common::{format_sync_time, open_queue, probe_connectivity, CliContext};
use crate::error::CliError;

/// Keep the queue open, probing reachability every `interval_secs` and
/// flushing on start-up and on each reconnect until Ctrl-C.
///
/// While online, every tick also flushes whatever other `growlog log`
/// invocations queued in the same database since the last one.
pub async fn run_watch(interval_secs: u64, context: &CliContext) -> Result<(), CliError> {
    if interval_secs == 0 {
        return Err(CliError::InvalidInput(
            "--interval must be at least 1 second".to_string(),
        ));
    }
    let remote = context.require_remote()?.clone();

    let online = probe_connectivity(&remote).await;
    let queue = Arc::new(open_queue(context, online)?);
    let trigger = FlushTrigger::new(queue.clone()).spawn();
    let mut status = queue.subscribe();

    println!(
        "Watching {} ({}, {} pending). Press Ctrl-C to stop.",
        remote.supabase_url,
        if online { "online" } else { "offline" },
        queue.queue_length()
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    ticker.tick().await;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            _ = ticker.tick() => {
                let was_online = queue.connectivity().is_online();
                let online = probe_connectivity(&remote).await;
                queue.connectivity().set_online(online);
                if was_online && !online {
                    tracing::info!("Connectivity lost, observations stay queued");
                }
                // Reconnects are flushed by the trigger
                if was_online && online {
                    if let Err(error) = queue.flush().await {
                        tracing::warn!("Flush failed, observations stay queued: {}", error);
                    }
                }
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                if !current.is_syncing {
                    println!(
                        "{} pending, last sync {}",
                        current.queue_length,
                        format_sync_time(current.last_sync_time)
                    );
                }
            }
        }
    }

    trigger.abort();
    println!("Stopped with {} observations pending", queue.queue_length());
    Ok(())
}
