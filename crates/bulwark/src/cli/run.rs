//! Command handlers.

use bulwark::{Bulwark, BulwarkConfig, BulwarkResult, Input, LoggingModerationClient};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

/// Consume stdin until EOF, printing command replies to stdout.
pub async fn run_engine(config: &BulwarkConfig) -> BulwarkResult<()> {
    let engine = Bulwark::start(config, Arc::new(LoggingModerationClient::default())).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut processed = 0usize;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let input: Input = match serde_json::from_str(&line) {
            Ok(input) => input,
            Err(e) => {
                warn!(error = %e, "Skipping malformed input line");
                continue;
            }
        };
        debug!(?input, "Input received");
        if let Some(reply) = engine.handle_input(&input).await {
            println!("{}", reply);
        }
        processed += 1;
    }

    info!(processed, "Input exhausted, shutting down");
    Ok(())
}

/// Print the protection catalog with the persisted enabled state.
pub async fn list_protections(config: &BulwarkConfig) -> BulwarkResult<()> {
    let engine = Bulwark::start(config, Arc::new(LoggingModerationClient::default())).await?;
    println!("{}", engine.handle_command("protections").await);
    Ok(())
}
