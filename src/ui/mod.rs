pub mod chat_view;
pub mod input;
pub mod sidebar;
