pub mod client;
#[cfg(test)]
pub mod mock;
pub mod traits;
pub mod types;

pub use client::HttpApiClient;
pub use traits::ProductApi;
pub use types::{ApiError, AskResponse, ProductFilter};
