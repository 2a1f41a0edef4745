use growlog_core::{FlushOutcome, FlushSkip};

use crate::commands::common::{open_queue, probe_connectivity, CliContext};
use crate::error::CliError;

pub async fn run_sync(offline: bool, context: &CliContext) -> Result<(), CliError> {
    let remote = context.require_remote()?;
    let online = !offline && probe_connectivity(remote).await;

    let queue = open_queue(context, online)?;
    match queue.flush().await? {
        FlushOutcome::Flushed { count } => {
            println!("Synced {count} observations");
        }
        FlushOutcome::Skipped(FlushSkip::Empty) => println!("Nothing to sync"),
        FlushOutcome::Skipped(FlushSkip::NoIdentity) => {
            println!(
                "Not signed in; {} observations stay queued. Run `growlog auth login`.",
                queue.queue_length()
            );
        }
        FlushOutcome::Skipped(skip) => {
            println!(
                "Sync skipped ({skip}); {} observations stay queued",
                queue.queue_length()
            );
        }
    }
    Ok(())
}
