use thiserror::Error;

#[cfg(test)]
use crate::api::ProductApi;
use crate::api::{ApiError, AskResponse};
use crate::models::{Message, Product, ProductId};

/// Appended in place of an answer whenever `ask_question` fails.
pub const FALLBACK_REPLY: &str =
    "Sorry, I encountered an error processing your question. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    NoSelection,
    Idle,
    AwaitingReply,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("No product selected")]
    NoSelection,

    #[error("Question is empty")]
    EmptyQuestion,

    #[error("Still waiting for the previous answer")]
    AwaitingReply,
}

/// A question whose user message is already in the transcript and whose
/// answer has not been applied yet.
#[derive(Debug, Clone)]
pub struct PendingQuestion {
    pub product_id: ProductId,
    pub question: String,
    pub session_id: Option<String>,
    epoch: u64,
}

/// Transcript and session token for the currently selected product.
#[derive(Debug, Default)]
pub struct ConversationStore {
    selected: Option<ProductId>,
    session_id: Option<String>,
    messages: Vec<Message>,
    awaiting_reply: bool,
    // Bumped on every selection change so replies for an old conversation are dropped.
    epoch: u64,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConversationState {
        match (&self.selected, self.awaiting_reply) {
            (None, _) => ConversationState::NoSelection,
            (Some(_), false) => ConversationState::Idle,
            (Some(_), true) => ConversationState::AwaitingReply,
        }
    }

    pub fn selected_product_id(&self) -> Option<&ProductId> {
        self.selected.as_ref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Start a fresh conversation about `product`. Context never carries over,
    /// even when re-selecting the same product.
    pub fn select(&mut self, product: &Product) {
        tracing::debug!("Conversation started for {}", product.id);
        self.reset(Some(product.id.clone()));
    }

    pub fn clear(&mut self) {
        self.reset(None);
    }

    /// Returns true when the removed product was the active selection.
    pub fn product_removed(&mut self, id: &ProductId) -> bool {
        if self.selected.as_ref() == Some(id) {
            tracing::debug!("Selected product {} removed; clearing conversation", id);
            self.clear();
            true
        } else {
            false
        }
    }

    fn reset(&mut self, selected: Option<ProductId>) {
        self.selected = selected;
        self.session_id = None;
        self.messages.clear();
        self.awaiting_reply = false;
        self.epoch += 1;
    }

    /// First phase of a send: append the user's message and enter the
    /// awaiting-reply state.
    pub fn begin_question(&mut self, text: &str) -> Result<PendingQuestion, ConversationError> {
        let product_id = self.selected.clone().ok_or(ConversationError::NoSelection)?;
        if self.awaiting_reply {
            return Err(ConversationError::AwaitingReply);
        }
        let question = text.trim();
        if question.is_empty() {
            return Err(ConversationError::EmptyQuestion);
        }

        self.messages.push(Message::user(question));
        self.awaiting_reply = true;

        Ok(PendingQuestion {
            product_id,
            question: question.to_string(),
            session_id: self.session_id.clone(),
            epoch: self.epoch,
        })
    }

    /// Second phase: append the answer, or the fallback reply on failure.
    /// Returns false when the conversation moved on and the reply was dropped.
    pub fn finish_question(
        &mut self,
        pending: &PendingQuestion,
        result: Result<AskResponse, ApiError>,
    ) -> bool {
        if pending.epoch != self.epoch {
            tracing::debug!(
                "Dropping reply for {} from a previous conversation",
                pending.product_id
            );
            return false;
        }

        let message = match result {
            Ok(response) => {
                if let Some(session_id) = response.session_id.filter(|s| !s.is_empty()) {
                    self.session_id = Some(session_id);
                }
                Message::assistant(response.answer, response.context_chunks)
            }
            Err(e) => {
                tracing::error!("Failed to send message: {}", e);
                Message::assistant(FALLBACK_REPLY, Vec::new())
            }
        };

        self.messages.push(message);
        self.awaiting_reply = false;
        true
    }

    /// Ask `text` about the selected product and wait for the reply. API
    /// failures end up in the transcript rather than in the returned error.
    /// Single-call form of `begin_question` + `finish_question`.
    #[cfg(test)]
    pub async fn send_question(
        &mut self,
        api: &dyn ProductApi,
        text: &str,
    ) -> Result<(), ConversationError> {
        let pending = self.begin_question(text)?;
        let result = api
            .ask_question(
                &pending.product_id,
                &pending.question,
                pending.session_id.as_deref(),
            )
            .await;
        self.finish_question(&pending, result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{product, AskCall, MockApi};
    use crate::models::{ContextChunk, ProductStatus, Role};

    fn answer(text: &str, session_id: Option<&str>) -> Result<AskResponse, ApiError> {
        Ok(AskResponse {
            answer: text.to_string(),
            session_id: session_id.map(str::to_string),
            context_chunks: vec![ContextChunk {
                text: "Rated 4.5 stars".to_string(),
                score: Some(0.82),
            }],
        })
    }

    fn selected_store() -> ConversationStore {
        let mut store = ConversationStore::new();
        store.select(&product("p1", ProductStatus::Completed));
        store
    }

    #[test]
    fn test_initial_state_has_no_selection() {
        let store = ConversationStore::new();
        assert_eq!(store.state(), ConversationState::NoSelection);
        assert!(store.messages().is_empty());
        assert!(store.session_id().is_none());
    }

    #[tokio::test]
    async fn test_session_id_is_reused_on_next_question() {
        let api = MockApi::new();
        api.push_answer(answer("Yes, it is well reviewed.", Some("abc")));
        api.push_answer(answer("$24.99", Some("abc")));
        let mut store = selected_store();

        store.send_question(&api, "Is this good?").await.unwrap();
        store.send_question(&api, "Price?").await.unwrap();

        let asks = api.asks();
        assert_eq!(
            asks[0],
            AskCall {
                product_id: ProductId::new("p1"),
                question: "Is this good?".to_string(),
                session_id: None,
            }
        );
        assert_eq!(asks[1].session_id.as_deref(), Some("abc"));
        assert_eq!(store.session_id(), Some("abc"));
        assert_eq!(store.messages().len(), 4);
        assert_eq!(store.state(), ConversationState::Idle);
    }

    #[tokio::test]
    async fn test_failure_appends_single_fallback_message() {
        let api = MockApi::new();
        api.push_answer(Err(ApiError::Server {
            status: 500,
            message: "Failed to generate answer".to_string(),
        }));
        let mut store = selected_store();

        store.send_question(&api, "Is this good?").await.unwrap();

        let messages = store.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "Is this good?");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, FALLBACK_REPLY);
        assert!(messages[1].context_chunks.is_empty());
        assert!(store.session_id().is_none());
        assert_eq!(store.state(), ConversationState::Idle);
    }

    #[tokio::test]
    async fn test_answer_keeps_context_chunks() {
        let api = MockApi::new();
        api.push_answer(answer("Mostly positive.", Some("s1")));
        let mut store = selected_store();

        store.send_question(&api, "Reviews?").await.unwrap();

        let reply = &store.messages()[1];
        assert_eq!(reply.content, "Mostly positive.");
        assert_eq!(reply.context_chunks.len(), 1);
        assert_eq!(reply.context_chunks[0].score, Some(0.82));
    }

    #[test]
    fn test_user_message_is_visible_before_reply() {
        let mut store = selected_store();
        let pending = store.begin_question("  Price?  ").unwrap();

        assert_eq!(pending.question, "Price?");
        assert_eq!(store.messages().len(), 1);
        assert_eq!(store.messages()[0].content, "Price?");
        assert_eq!(store.state(), ConversationState::AwaitingReply);
    }

    #[test]
    fn test_second_question_rejected_while_awaiting() {
        let mut store = selected_store();
        store.begin_question("First").unwrap();

        assert_eq!(
            store.begin_question("Second").unwrap_err(),
            ConversationError::AwaitingReply
        );
        assert_eq!(store.messages().len(), 1);
    }

    #[test]
    fn test_rejects_empty_question_and_missing_selection() {
        let mut store = ConversationStore::new();
        assert_eq!(
            store.begin_question("hello").unwrap_err(),
            ConversationError::NoSelection
        );

        let mut store = selected_store();
        assert_eq!(
            store.begin_question("   ").unwrap_err(),
            ConversationError::EmptyQuestion
        );
        assert!(store.messages().is_empty());
    }

    #[tokio::test]
    async fn test_selecting_another_product_clears_conversation() {
        let api = MockApi::new();
        api.push_answer(answer("Yes.", Some("abc")));
        let mut store = selected_store();
        store.send_question(&api, "Is this good?").await.unwrap();
        assert_eq!(store.messages().len(), 2);

        store.select(&product("p2", ProductStatus::Completed));

        assert!(store.messages().is_empty());
        assert!(store.session_id().is_none());
        assert_eq!(store.selected_product_id(), Some(&ProductId::new("p2")));
        assert_eq!(store.state(), ConversationState::Idle);
    }

    #[test]
    fn test_late_reply_after_selection_change_is_dropped() {
        let mut store = selected_store();
        let pending = store.begin_question("Is this good?").unwrap();

        store.select(&product("p2", ProductStatus::Completed));
        let applied = store.finish_question(&pending, answer("Yes.", Some("abc")));

        assert!(!applied);
        assert!(store.messages().is_empty());
        assert!(store.session_id().is_none());
        assert_eq!(store.state(), ConversationState::Idle);
    }

    #[test]
    fn test_product_removed_only_clears_matching_selection() {
        let mut store = selected_store();
        store.begin_question("Hi").unwrap();

        assert!(!store.product_removed(&ProductId::new("other")));
        assert_eq!(store.messages().len(), 1);

        assert!(store.product_removed(&ProductId::new("p1")));
        assert_eq!(store.state(), ConversationState::NoSelection);
        assert!(store.messages().is_empty());
    }
}
