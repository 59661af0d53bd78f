pub mod chat_session;
pub mod message;
pub mod product;

pub use chat_session::{ChatSession, StoredMessage};
pub use message::{ContextChunk, Message, Role};
pub use product::{Product, ProductDetail, ProductId, ProductStatus, StatusUpdate};
