use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::traits::ProductApi;
use super::types::{
    parse_error_message, AddProductRequest, AddProductResponse, ApiError, AskRequest, AskResponse,
    ProductFilter, ProductListResponse,
};
use crate::models::{ChatSession, Product, ProductDetail, ProductId, StatusUpdate, StoredMessage};

/// reqwest-backed client for the product Q&A backend.
pub struct HttpApiClient {
    client: Client,
    base_url: String,
}

impl HttpApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.endpoint(path);
        tracing::debug!("API request: {} {}", method, url);
        self.client.request(method, url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(|e| {
            tracing::error!("Request error: {}", e);
            ApiError::Network(e.to_string())
        })?;

        let status = response.status();
        tracing::debug!("API response: {}", status.as_u16());

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = parse_error_message(status.as_u16(), &body);
        tracing::error!("Response error: HTTP {}: {}", status.as_u16(), message);

        if status == reqwest::StatusCode::BAD_REQUEST {
            Err(ApiError::Validation(message))
        } else {
            Err(ApiError::Server {
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl ProductApi for HttpApiClient {
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, ApiError> {
        let request = self.request(Method::GET, "products/").query(filter);
        let list: ProductListResponse = self.send_json(request).await?;
        Ok(list.into_products())
    }

    async fn get_product(&self, id: &ProductId) -> Result<ProductDetail, ApiError> {
        let request = self.request(Method::GET, &format!("products/{}/", id));
        self.send_json(request).await
    }

    async fn add_product(&self, url: &str) -> Result<Product, ApiError> {
        let request = self
            .request(Method::POST, "products/")
            .json(&AddProductRequest { url });
        let response: AddProductResponse = self.send_json(request).await?;
        if let Some(message) = &response.message {
            tracing::info!("Add product {}: {}", response.product.id, message);
        }
        Ok(response.product)
    }

    async fn get_product_status(&self, id: &ProductId) -> Result<StatusUpdate, ApiError> {
        let request = self.request(Method::GET, &format!("products/{}/status/", id));
        self.send_json(request).await
    }

    async fn delete_product(&self, id: &ProductId) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, &format!("products/{}/", id));
        self.send(request).await?;
        Ok(())
    }

    async fn retry_product(&self, id: &ProductId) -> Result<(), ApiError> {
        let request = self.request(Method::POST, &format!("products/{}/retry/", id));
        self.send(request).await?;
        Ok(())
    }

    async fn ask_question(
        &self,
        id: &ProductId,
        question: &str,
        session_id: Option<&str>,
    ) -> Result<AskResponse, ApiError> {
        let request = self
            .request(Method::POST, &format!("products/{}/ask/", id))
            .json(&AskRequest {
                question,
                session_id,
            });
        self.send_json(request).await
    }

    async fn list_chat_sessions(&self, id: &ProductId) -> Result<Vec<ChatSession>, ApiError> {
        let request = self.request(Method::GET, &format!("products/{}/chat-sessions/", id));
        self.send_json(request).await
    }

    async fn chat_messages(&self, session_id: &str) -> Result<Vec<StoredMessage>, ApiError> {
        let request = self.request(Method::GET, &format!("chat-sessions/{}/messages/", session_id));
        self.send_json(request).await
    }
}
