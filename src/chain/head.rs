//! Chain head tracking

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, Span, debug, warn};

use super::ChainClient;

const HEAD_ERROR_BACKOFF: Duration = Duration::from_secs(2);

/// Polls the chain height every `interval` and publishes changes.
///
/// The task ends once every receiver has been dropped.
pub fn spawn_head_tracker(
    client: Arc<dyn ChainClient>,
    interval: Duration,
    span: Span,
) -> (watch::Receiver<u64>, JoinHandle<()>) {
    let (tx, rx) = watch::channel(0u64);

    let handle = tokio::spawn(
        async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    _ = ticker.tick() => {}
                }

                match client.block_number().await {
                    Ok(head) => {
                        let changed = tx.send_if_modified(|current| {
                            if head > *current {
                                *current = head;
                                true
                            } else {
                                false
                            }
                        });
                        if changed {
                            debug!(head, "New chain head");
                        }
                    }
                    Err(e) => {
                        warn!("⚠️ Failed to fetch chain head: {}", e);
                        tokio::time::sleep(HEAD_ERROR_BACKOFF).await;
                    }
                }
            }
        }
        .instrument(span),
    );

    (rx, handle)
}
