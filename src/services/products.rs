use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::conversation::ConversationStore;
use super::poller::{start_polling, PollHandle};
use crate::api::{ApiError, ProductApi, ProductFilter};
use crate::models::{Product, ProductId, ProductStatus, StatusUpdate};

/// Produced by pollers, consumed by [`ProductStore::handle_event`] on the
/// task that owns the store.
#[derive(Debug, Clone)]
pub enum ProductEvent {
    Status {
        id: ProductId,
        poll_seq: u64,
        update: StatusUpdate,
    },
}

struct ActivePoll {
    seq: u64,
    handle: PollHandle,
}

/// The client-side product list. Newest first, at most one entry per id.
pub struct ProductStore {
    api: Arc<dyn ProductApi>,
    products: Vec<Product>,
    filter: ProductFilter,
    pollers: HashMap<ProductId, ActivePoll>,
    next_poll_seq: u64,
    poll_interval: Duration,
    events_tx: mpsc::UnboundedSender<ProductEvent>,
}

impl ProductStore {
    pub fn new(
        api: Arc<dyn ProductApi>,
        poll_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<ProductEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let store = Self {
            api,
            products: Vec::new(),
            filter: ProductFilter::default(),
            pollers: HashMap::new(),
            next_poll_seq: 0,
            poll_interval,
            events_tx,
        };
        (store, events_rx)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }

    pub fn set_filter(&mut self, filter: ProductFilter) {
        self.filter = filter;
    }

    pub fn is_polling(&self, id: &ProductId) -> bool {
        self.pollers
            .get(id)
            .is_some_and(|poll| !poll.handle.is_finished())
    }

    /// Replace the whole list with the backend's current snapshot.
    pub async fn load(&mut self) -> Result<(), ApiError> {
        let products = self.api.list_products(&self.filter).await?;
        tracing::debug!("Loaded {} products", products.len());
        self.products = products;
        Ok(())
    }

    /// Submit `url` for ingestion and start tracking the new product.
    pub async fn add(&mut self, url: &str) -> Result<Product, ApiError> {
        let url = validate_product_url(url)?;
        let product = self.api.add_product(&url).await?;
        tracing::info!("Added product {} ({})", product.id, product.status.as_str());

        // The backend hands back the existing record for a known URL.
        self.products.retain(|p| p.id != product.id);
        self.products.insert(0, product.clone());

        if product.status != ProductStatus::Completed {
            self.start_poller(&product.id);
        }
        Ok(product)
    }

    pub async fn remove(
        &mut self,
        id: &ProductId,
        conversation: &mut ConversationStore,
    ) -> Result<(), ApiError> {
        self.api.delete_product(id).await?;
        tracing::info!("Deleted product {}", id);

        if let Some(poll) = self.pollers.remove(id) {
            poll.handle.cancel();
        }
        self.products.retain(|p| &p.id != id);
        conversation.product_removed(id);
        Ok(())
    }

    /// Restart ingestion of a failed product.
    pub async fn retry(&mut self, id: &ProductId) -> Result<(), ApiError> {
        self.api.retry_product(id).await?;
        tracing::info!("Retrying product {}", id);

        if let Some(product) = self.products.iter_mut().find(|p| &p.id == id) {
            product.status = ProductStatus::Pending;
            product.error_message = None;
        }
        self.start_poller(id);
        Ok(())
    }

    /// Fold a status payload into the product with `id`. Returns false when
    /// no such product is in the list.
    pub fn merge_status(&mut self, id: &ProductId, update: &StatusUpdate) -> bool {
        match self.products.iter_mut().find(|p| &p.id == id) {
            Some(product) => {
                product.apply_status(update);
                true
            }
            None => {
                tracing::debug!("Status for {} ignored; product not in list", id);
                false
            }
        }
    }

    /// Apply a poller event. Completion triggers a full reload so the list
    /// picks up fields the status payload does not carry.
    pub async fn handle_event(&mut self, event: ProductEvent) -> Result<(), ApiError> {
        let ProductEvent::Status {
            id,
            poll_seq,
            update,
        } = event;

        match self.pollers.get(&id) {
            Some(poll) if poll.seq == poll_seq => {}
            _ => {
                tracing::debug!("Dropping status from a stale poller for {}", id);
                return Ok(());
            }
        }

        if update.status.is_terminal() {
            self.pollers.remove(&id);
        }

        if !self.merge_status(&id, &update) {
            return Ok(());
        }

        match update.status {
            ProductStatus::Completed => {
                tracing::info!("Product {} is ready", id);
                self.load().await
            }
            ProductStatus::Failed => {
                tracing::warn!(
                    "Product {} failed: {}",
                    id,
                    update.error_message.as_deref().unwrap_or("unknown error")
                );
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Cancel every running poller.
    pub fn shutdown(&mut self) {
        for (_, poll) in self.pollers.drain() {
            poll.handle.cancel();
        }
    }

    fn start_poller(&mut self, id: &ProductId) {
        if let Some(previous) = self.pollers.remove(id) {
            previous.handle.cancel();
        }

        self.next_poll_seq += 1;
        let seq = self.next_poll_seq;
        let tx = self.events_tx.clone();
        let product_id = id.clone();

        let handle = start_polling(self.api.clone(), id.clone(), self.poll_interval, move |update| {
            let _ = tx.send(ProductEvent::Status {
                id: product_id.clone(),
                poll_seq: seq,
                update,
            });
        });

        self.pollers.insert(id.clone(), ActivePoll { seq, handle });
    }
}

/// Trim the input and require an absolute http(s) URL.
pub fn validate_product_url(input: &str) -> Result<String, ApiError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation("URL is required".to_string()));
    }
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| ApiError::Validation(format!("Invalid URL '{}': {}", trimmed, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(ApiError::Validation(format!(
            "Unsupported URL scheme '{}'",
            other
        ))),
    }
}
