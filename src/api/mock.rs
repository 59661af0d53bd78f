//! Scripted in-memory backend used by the store and poller tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::traits::ProductApi;
use super::types::{ApiError, AskResponse, ProductFilter};
use crate::models::{
    ChatSession, Product, ProductDetail, ProductId, ProductStatus, StatusUpdate, StoredMessage,
};

pub fn product(id: &str, status: ProductStatus) -> Product {
    Product {
        id: ProductId::new(id),
        url: format!("https://www.amazon.com/dp/{}", id),
        title: None,
        brand: None,
        image_url: None,
        status,
        error_message: None,
    }
}

pub fn status(status: ProductStatus) -> Result<StatusUpdate, ApiError> {
    Ok(StatusUpdate {
        status,
        error_message: None,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct AskCall {
    pub product_id: ProductId,
    pub question: String,
    pub session_id: Option<String>,
}

#[derive(Default)]
pub struct MockApi {
    /// Snapshot returned by `list_products`.
    pub catalog: Mutex<Vec<Product>>,
    pub added: Mutex<VecDeque<Result<Product, ApiError>>>,
    pub statuses: Mutex<VecDeque<Result<StatusUpdate, ApiError>>>,
    pub answers: Mutex<VecDeque<Result<AskResponse, ApiError>>>,
    pub delete_error: Mutex<Option<ApiError>>,
    pub retry_error: Mutex<Option<ApiError>>,
    pub asks: Mutex<Vec<AskCall>>,
    pub list_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statuses(statuses: Vec<Result<StatusUpdate, ApiError>>) -> Self {
        let api = Self::new();
        *api.statuses.lock().unwrap() = statuses.into();
        api
    }

    pub fn set_catalog(&self, products: Vec<Product>) {
        *self.catalog.lock().unwrap() = products;
    }

    pub fn push_added(&self, result: Result<Product, ApiError>) {
        self.added.lock().unwrap().push_back(result);
    }

    pub fn push_answer(&self, result: Result<AskResponse, ApiError>) {
        self.answers.lock().unwrap().push_back(result);
    }

    pub fn asks(&self) -> Vec<AskCall> {
        self.asks.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductApi for MockApi {
    async fn list_products(&self, _filter: &ProductFilter) -> Result<Vec<Product>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.catalog.lock().unwrap().clone())
    }

    async fn get_product(&self, id: &ProductId) -> Result<ProductDetail, ApiError> {
        Err(ApiError::Server {
            status: 404,
            message: format!("No product {}", id),
        })
    }

    async fn add_product(&self, url: &str) -> Result<Product, ApiError> {
        self.added.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(Product {
                url: url.to_string(),
                ..product("new", ProductStatus::Pending)
            })
        })
    }

    async fn get_product_status(&self, _id: &ProductId) -> Result<StatusUpdate, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| status(ProductStatus::Pending))
    }

    async fn delete_product(&self, _id: &ProductId) -> Result<(), ApiError> {
        match self.delete_error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn retry_product(&self, _id: &ProductId) -> Result<(), ApiError> {
        match self.retry_error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn ask_question(
        &self,
        id: &ProductId,
        question: &str,
        session_id: Option<&str>,
    ) -> Result<AskResponse, ApiError> {
        self.asks.lock().unwrap().push(AskCall {
            product_id: id.clone(),
            question: question.to_string(),
            session_id: session_id.map(str::to_string),
        });
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Network("no scripted answer".to_string())))
    }

    async fn list_chat_sessions(&self, _id: &ProductId) -> Result<Vec<ChatSession>, ApiError> {
        Ok(Vec::new())
    }

    async fn chat_messages(&self, _session_id: &str) -> Result<Vec<StoredMessage>, ApiError> {
        Ok(Vec::new())
    }
}
