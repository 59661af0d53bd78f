use async_trait::async_trait;

use super::types::{ApiError, AskResponse, ProductFilter};
use crate::models::{ChatSession, Product, ProductDetail, ProductId, StatusUpdate, StoredMessage};

/// One request/response pair per backend operation. Implementations never
/// retry and never cache; failures are handed back to the caller as-is.
#[async_trait]
pub trait ProductApi: Send + Sync {
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, ApiError>;

    async fn get_product(&self, id: &ProductId) -> Result<ProductDetail, ApiError>;

    async fn add_product(&self, url: &str) -> Result<Product, ApiError>;

    async fn get_product_status(&self, id: &ProductId) -> Result<StatusUpdate, ApiError>;

    async fn delete_product(&self, id: &ProductId) -> Result<(), ApiError>;

    async fn retry_product(&self, id: &ProductId) -> Result<(), ApiError>;

    async fn ask_question(
        &self,
        id: &ProductId,
        question: &str,
        session_id: Option<&str>,
    ) -> Result<AskResponse, ApiError>;

    async fn list_chat_sessions(&self, id: &ProductId) -> Result<Vec<ChatSession>, ApiError>;

    async fn chat_messages(&self, session_id: &str) -> Result<Vec<StoredMessage>, ApiError>;
}
