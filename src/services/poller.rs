use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::ProductApi;
use crate::models::{ProductId, StatusUpdate};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Handle to a running status poller. Dropping it does not stop the poller.
#[derive(Debug)]
pub struct PollHandle {
    cancel_token: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Stop scheduling further ticks. A fetch already in flight still completes
    /// and its update is still delivered. No-op once the poller has finished.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Poll `GET /products/{id}/status/` every `interval` until the product reaches
/// a terminal status, the fetch fails, or the handle is cancelled.
///
/// Ticks are strictly sequential: the next sleep only starts after `on_update`
/// has returned for the previous fetch. A failed fetch is reported once as a
/// `failed` update and ends the poller.
pub fn start_polling<F>(
    api: Arc<dyn ProductApi>,
    product_id: ProductId,
    interval: Duration,
    mut on_update: F,
) -> PollHandle
where
    F: FnMut(StatusUpdate) + Send + 'static,
{
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    let task = tokio::spawn(async move {
        tracing::debug!("Polling status of {} every {:?}", product_id, interval);
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!("Polling of {} cancelled", product_id);
                    return;
                }
                _ = tokio::time::sleep(interval) => {}
            }

            match api.get_product_status(&product_id).await {
                Ok(update) => {
                    let terminal = update.status.is_terminal();
                    tracing::debug!("Product {} is {}", product_id, update.status.as_str());
                    on_update(update);
                    if terminal {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("Polling error for {}: {}", product_id, e);
                    on_update(StatusUpdate::failed(e.to_string()));
                    break;
                }
            }
        }
        token.cancel();
    });

    PollHandle { cancel_token, task }
}
