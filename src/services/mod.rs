pub mod conversation;
pub mod database;
pub mod markdown;
pub mod poller;
pub mod products;
pub mod settings;

pub use conversation::{ConversationState, ConversationStore};
pub use database::Database;
pub use products::{ProductEvent, ProductStore};
pub use settings::{SettingsService, Theme};
