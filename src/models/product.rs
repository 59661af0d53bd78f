use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier assigned by the backend. Stable for the product's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Pending,
    Scraping,
    Embedding,
    Completed,
    Failed,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Pending => "pending",
            ProductStatus::Scraping => "scraping",
            ProductStatus::Embedding => "embedding",
            ProductStatus::Completed => "completed",
            ProductStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ProductStatus::Pending),
            "scraping" => Some(ProductStatus::Scraping),
            "embedding" => Some(ProductStatus::Embedding),
            "completed" => Some(ProductStatus::Completed),
            "failed" => Some(ProductStatus::Failed),
            _ => None,
        }
    }

    /// No further automatic processing happens once a product reaches this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProductStatus::Completed | ProductStatus::Failed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProductStatus::Pending => "Pending...",
            ProductStatus::Scraping => "Scraping...",
            ProductStatus::Embedding => "Processing...",
            ProductStatus::Completed => "Ready",
            ProductStatus::Failed => "Failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub status: ProductStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl Product {
    pub fn is_ready(&self) -> bool {
        self.status == ProductStatus::Completed
    }

    /// Fold a lightweight status payload into this product.
    pub fn apply_status(&mut self, update: &StatusUpdate) {
        self.status = update.status;
        self.error_message = update.error_message.clone();
    }
}

/// Payload of `GET /products/{id}/status/`, and what the poller reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: ProductStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl StatusUpdate {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: ProductStatus::Failed,
            error_message: Some(message.into()),
        }
    }
}

/// Full product record from `GET /products/{id}/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetail {
    pub id: ProductId,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub current_price: Option<String>,
    #[serde(default)]
    pub original_price: Option<String>,
    #[serde(default)]
    pub availability: Option<String>,
    #[serde(default)]
    pub features: Option<String>,
    pub status: ProductStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub vector_count: i64,
    #[serde(default)]
    pub review_count: i64,
}
