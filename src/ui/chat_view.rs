use crate::models::{ChatSession, ContextChunk, Message, Product, Role, StoredMessage};
use crate::services::markdown::render_markdown;
use crate::services::settings::Theme;
use crate::ui::sidebar::truncate_title;

pub const SUGGESTED_QUESTIONS: [&str; 3] = [
    "What are the main pros and cons?",
    "Is this product worth buying?",
    "What do reviewers say about quality?",
];

const RESET: &str = "\x1b[0m";

pub fn render_header(product: &Product) -> String {
    let mut header = truncate_title(product.title.as_deref());
    if let Some(brand) = product.brand.as_deref().filter(|b| !b.is_empty()) {
        header.push_str(&format!(" by {}", brand));
    }
    header
}

pub fn render_empty_state() -> String {
    let mut out = String::from("Start a Conversation\nAsk me anything about this product! Try:\n");
    for question in SUGGESTED_QUESTIONS {
        out.push_str(&format!("  - {}\n", question));
    }
    out.trim_end().to_string()
}

/// Assistant content is markdown; user content is shown as typed.
pub fn render_message(message: &Message, theme: Theme, ansi: bool) -> String {
    match message.role {
        Role::User => format!("{} {}", label("You:", "\x1b[1m", ansi), message.content),
        Role::Assistant => {
            let body = render_markdown(&message.content, theme, ansi);
            let mut out = format!("{}\n{}", label("Assistant:", theme.accent(), ansi), body);
            if !message.context_chunks.is_empty() {
                let note = format!("({} sources, type `sources` to view)", message.context_chunks.len());
                out.push('\n');
                out.push_str(&label(&note, theme.muted(), ansi));
            }
            out
        }
    }
}

pub fn render_thinking(theme: Theme, ansi: bool) -> String {
    label("Assistant is thinking...", theme.muted(), ansi)
}

pub fn render_sources(chunks: &[ContextChunk]) -> String {
    if chunks.is_empty() {
        return "No sources for the last answer".to_string();
    }
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| match chunk.score {
            Some(score) => format!("[{}] ({:.2}) {}", i + 1, score, chunk.text.trim()),
            None => format!("[{}] {}", i + 1, chunk.text.trim()),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `current` marks the session the live conversation is continuing.
pub fn render_sessions(sessions: &[ChatSession], current: Option<&str>) -> String {
    if sessions.is_empty() {
        return "No previous conversations".to_string();
    }
    sessions
        .iter()
        .map(|s| {
            let marker = if current == Some(s.session_id.as_str()) { '*' } else { ' ' };
            format!(
                "{} {}  {} messages  last active {}",
                marker,
                s.session_id,
                s.message_count,
                s.updated_at.format("%Y-%m-%d %H:%M")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_history(messages: &[StoredMessage], theme: Theme, ansi: bool) -> String {
    if messages.is_empty() {
        return "No messages in this conversation".to_string();
    }
    messages
        .iter()
        .map(|m| match m.role {
            Role::User => format!("{} {}", label("You:", "\x1b[1m", ansi), m.content),
            Role::Assistant => format!(
                "{}\n{}",
                label("Assistant:", theme.accent(), ansi),
                render_markdown(&m.content, theme, ansi)
            ),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn label(text: &str, codes: &str, ansi: bool) -> String {
    if ansi {
        format!("{}{}{}", codes, text, RESET)
    } else {
        text.to_string()
    }
}
