use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ContextChunk, Product, ProductStatus};

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Query parameters accepted by `GET /products/`. Unset fields are not sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// The list endpoint answers either with a paginated envelope or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProductListResponse {
    Bare(Vec<Product>),
    Paginated { results: Vec<Product> },
}

impl ProductListResponse {
    pub fn into_products(self) -> Vec<Product> {
        match self {
            ProductListResponse::Bare(products) => products,
            ProductListResponse::Paginated { results } => results,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AddProductRequest<'a> {
    pub url: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AddProductResponse {
    pub product: Product,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AskRequest<'a> {
    pub question: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub context_chunks: Vec<ContextChunk>,
}

/// Error bodies come in a few shapes: `{"error": ..}`, `{"detail": ..}`,
/// or a field map such as `{"url": ["Please provide ..."]}`.
pub fn parse_error_message(status: u16, body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return format!("HTTP {}: Request failed", status);
    };

    for key in ["error", "detail", "message"] {
        if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
            return text.to_string();
        }
    }

    if let Some(fields) = value.as_object() {
        let messages: Vec<String> = fields
            .iter()
            .flat_map(|(field, errors)| {
                let texts: Vec<String> = match errors {
                    serde_json::Value::Array(items) => items
                        .iter()
                        .filter_map(|e| e.as_str().map(str::to_string))
                        .collect(),
                    serde_json::Value::String(s) => vec![s.clone()],
                    _ => Vec::new(),
                };
                texts.into_iter().map(move |t| format!("{}: {}", field, t))
            })
            .collect();
        if !messages.is_empty() {
            return messages.join("; ");
        }
    }

    format!("HTTP {}: Request failed", status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductId;

    const PRODUCTS: &str = r#"[
        {"id":"b","url":"https://www.amazon.com/dp/B","status":"completed","title":"Kettle"},
        {"id":"a","url":"https://www.amazon.com/dp/A","status":"pending"}
    ]"#;

    #[test]
    fn test_bare_and_paginated_lists_normalize_identically() {
        let bare: ProductListResponse = serde_json::from_str(PRODUCTS).unwrap();
        let paginated: ProductListResponse = serde_json::from_str(&format!(
            r#"{{"count":2,"next":null,"previous":null,"results":{}}}"#,
            PRODUCTS
        ))
        .unwrap();

        let bare = bare.into_products();
        let paginated = paginated.into_products();
        assert_eq!(bare, paginated);
        assert_eq!(
            bare.iter().map(|p| p.id.clone()).collect::<Vec<_>>(),
            vec![ProductId::new("b"), ProductId::new("a")]
        );
    }

    #[test]
    fn test_ask_request_omits_missing_session() {
        let body = serde_json::to_value(AskRequest {
            question: "Price?",
            session_id: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"question": "Price?"}));

        let body = serde_json::to_value(AskRequest {
            question: "Price?",
            session_id: Some("abc"),
        })
        .unwrap();
        assert_eq!(body["session_id"], "abc");
    }

    #[test]
    fn test_filter_serializes_only_set_fields() {
        let filter = ProductFilter {
            status: Some(ProductStatus::Failed),
            ..Default::default()
        };
        let value = serde_json::to_value(&filter).unwrap();
        assert_eq!(value, serde_json::json!({"status": "failed"}));
    }

    #[test]
    fn test_parse_error_message_shapes() {
        assert_eq!(
            parse_error_message(400, r#"{"error":"Product is not in failed state"}"#),
            "Product is not in failed state"
        );
        assert_eq!(parse_error_message(404, r#"{"detail":"Not found."}"#), "Not found.");
        assert_eq!(
            parse_error_message(400, r#"{"url":["Please provide a valid Amazon product URL"]}"#),
            "url: Please provide a valid Amazon product URL"
        );
        assert_eq!(parse_error_message(502, "<html>bad gateway</html>"), "HTTP 502: Request failed");
    }
}
