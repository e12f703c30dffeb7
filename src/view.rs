//! The chat view-model.
//!
//! Holds everything the screen shows about the conversation. Rendering reads
//! it, the event handler mutates it, and nothing here knows about terminals
//! or HTTP.

use crate::highlight::Highlighter;
use crate::input::InputBuffer;
use crate::state::{Catalog, Message};

pub const CHAT_ERROR_MARKUP: &str = "<h3>Error</h3>I apologize, but I encountered an error processing your request. Please try again later.";

pub const DRUG_ERROR_MARKUP: &str = "<h3>Error</h3>I apologize, but I encountered an error retrieving information about this medication. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    /// A request is in flight; the markup is what to show if it fails.
    Pending { failure_markup: &'static str },
}

/// What the caller should send to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRequest {
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    Response(String),
    Failed,
}

#[derive(Debug, Clone)]
pub struct ViewModel {
    messages: Vec<Message>,
    welcome_visible: bool,
    typing: bool,
    exchange: ExchangeState,
    catalog: Catalog,
    pub input: InputBuffer,
}

impl Default for ViewModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewModel {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            welcome_visible: true,
            typing: false,
            exchange: ExchangeState::Idle,
            catalog: Catalog::default(),
            input: InputBuffer::default(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn welcome_visible(&self) -> bool {
        self.welcome_visible
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    pub fn exchange(&self) -> ExchangeState {
        self.exchange
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.exchange, ExchangeState::Pending { .. })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn set_catalog(&mut self, catalog: Catalog) {
        self.catalog = catalog;
    }

    /// Whether the send affordance is enabled.
    pub fn can_send(&self) -> bool {
        !self.input.is_blank() && !self.is_pending()
    }

    /// Submit the typed message. Returns `None`, leaving everything as it
    /// was, when the input is blank or another exchange is still in flight.
    pub fn submit(&mut self) -> Option<ExchangeRequest> {
        if self.input.is_blank() {
            tracing::debug!("empty message, not sending");
            return None;
        }
        if self.is_pending() {
            tracing::debug!("exchange already in flight, not sending");
            return None;
        }

        let message = self.input.text().trim().to_string();
        self.input.clear();
        Some(self.begin(message.clone(), message, CHAT_ERROR_MARKUP))
    }

    /// Ask about a catalog entry by index.
    pub fn ask_about(&mut self, index: usize) -> Option<ExchangeRequest> {
        if self.is_pending() {
            tracing::debug!("exchange already in flight, ignoring catalog selection");
            return None;
        }
        let name = self.catalog.get(index)?.name.clone();

        let display = format!("Tell me about {name} for Parkinson's disease");
        let prompt = format!(
            "Provide detailed information about {name} for Parkinson's disease, including its mechanism of action, common and severe side effects, and management strategies."
        );
        Some(self.begin(display, prompt, DRUG_ERROR_MARKUP))
    }

    fn begin(
        &mut self,
        display: String,
        prompt: String,
        failure_markup: &'static str,
    ) -> ExchangeRequest {
        self.messages.push(Message::user(display));
        self.welcome_visible = false;
        self.typing = true;
        self.exchange = ExchangeState::Pending { failure_markup };
        ExchangeRequest { prompt }
    }

    /// Finish the in-flight exchange: drop the typing indicator and append
    /// exactly one bot message. Returns false when nothing was pending, e.g.
    /// the view was reset while the request was running.
    pub fn settle(&mut self, outcome: ExchangeOutcome, highlighter: &Highlighter) -> bool {
        let ExchangeState::Pending { failure_markup } = self.exchange else {
            tracing::debug!("discarding response for an abandoned exchange");
            return false;
        };

        self.typing = false;
        self.exchange = ExchangeState::Idle;

        let markup = match &outcome {
            ExchangeOutcome::Response(markup) => markup.as_str(),
            ExchangeOutcome::Failed => failure_markup,
        };
        self.messages.push(Message::bot(markup, highlighter));
        true
    }

    /// Clear the conversation and show the welcome panel again. Any pending
    /// exchange is abandoned.
    pub fn reset(&mut self) {
        tracing::info!(messages = self.messages.len(), "resetting chat");
        self.messages.clear();
        self.typing = false;
        self.exchange = ExchangeState::Idle;
        self.welcome_visible = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{CatalogEntry, ChatRole, MessageBody};

    fn highlighter() -> Highlighter {
        Highlighter::builtin().unwrap()
    }

    fn type_text(view: &mut ViewModel, text: &str) {
        for c in text.chars() {
            view.input.insert(c);
        }
    }

    #[test]
    fn test_blank_input_sends_nothing() {
        let mut view = ViewModel::new();
        assert!(view.submit().is_none());

        type_text(&mut view, "   \t ");
        view.input.newline();
        assert!(!view.can_send());
        assert!(view.submit().is_none());

        assert!(view.messages().is_empty());
        assert!(!view.is_typing());
        assert!(view.welcome_visible());
        assert_eq!(view.exchange(), ExchangeState::Idle);
    }

    #[test]
    fn test_submit_shows_user_message_and_typing() {
        let mut view = ViewModel::new();
        type_text(&mut view, "  What about levodopa?  ");
        assert!(view.can_send());

        let request = view.submit().unwrap();
        assert_eq!(request.prompt, "What about levodopa?");
        assert_eq!(view.messages().len(), 1);
        assert_eq!(view.messages()[0], Message::user("What about levodopa?"));
        assert!(view.is_typing());
        assert!(view.is_pending());
        assert!(!view.welcome_visible());
        assert_eq!(view.input.text(), "");
        assert!(!view.can_send());
    }

    #[test]
    fn test_second_send_while_pending_is_ignored() {
        let mut view = ViewModel::new();
        type_text(&mut view, "first");
        view.submit().unwrap();

        type_text(&mut view, "second");
        assert!(!view.can_send());
        assert!(view.submit().is_none());
        assert_eq!(view.messages().len(), 1);
        // The typed text is kept for when the exchange settles
        assert_eq!(view.input.text(), "second");
    }

    #[test]
    fn test_successful_exchange_appends_highlighted_bot_message() {
        let mut view = ViewModel::new();
        type_text(&mut view, "side effects?");
        view.submit().unwrap();

        let applied = view.settle(
            ExchangeOutcome::Response("<p>Hallucinations are possible.</p>".to_string()),
            &highlighter(),
        );

        assert!(applied);
        assert!(!view.is_typing());
        assert_eq!(view.exchange(), ExchangeState::Idle);
        assert_eq!(view.messages().len(), 2);
        assert_eq!(view.messages()[1].role, ChatRole::Bot);
        assert!(view.messages()[1]
            .to_markup()
            .contains("<span class=\"side-effect-tag severe-tag\">Hallucinations</span>"));
    }

    #[test]
    fn test_failed_exchange_removes_typing_and_shows_one_error() {
        let mut view = ViewModel::new();
        type_text(&mut view, "hello");
        view.submit().unwrap();

        assert!(view.settle(ExchangeOutcome::Failed, &highlighter()));

        assert!(!view.is_typing());
        let bots: Vec<&Message> = view
            .messages()
            .iter()
            .filter(|m| m.role == ChatRole::Bot)
            .collect();
        assert_eq!(bots.len(), 1);
        let MessageBody::Rendered(doc) = &bots[0].body else {
            panic!("bot message should be rendered");
        };
        assert_eq!(doc.blocks[0].text(), "Error");
        assert!(doc.blocks[1].text().contains("error processing your request"));
    }

    #[test]
    fn test_catalog_question_uses_drug_error_text() {
        let mut view = ViewModel::new();
        view.set_catalog(Catalog::from_entries(vec![CatalogEntry {
            name: "Ropinirole".to_string(),
        }]));

        let request = view.ask_about(0).unwrap();
        assert!(request
            .prompt
            .starts_with("Provide detailed information about Ropinirole for Parkinson's disease"));
        assert_eq!(
            view.messages()[0],
            Message::user("Tell me about Ropinirole for Parkinson's disease")
        );

        view.settle(ExchangeOutcome::Failed, &highlighter());
        assert!(view.messages()[1]
            .to_markup()
            .contains("retrieving information about this medication"));
    }

    #[test]
    fn test_ask_about_unknown_index_does_nothing() {
        let mut view = ViewModel::new();
        assert!(view.ask_about(3).is_none());
        assert!(view.messages().is_empty());
        assert!(!view.is_pending());
    }

    #[test]
    fn test_messages_render_in_send_order() {
        let mut view = ViewModel::new();
        let h = highlighter();
        for (question, answer) in [("one", "<p>1</p>"), ("two", "<p>2</p>")] {
            type_text(&mut view, question);
            view.submit().unwrap();
            view.settle(ExchangeOutcome::Response(answer.to_string()), &h);
        }

        let markup: Vec<String> = view.messages().iter().map(Message::to_markup).collect();
        assert_eq!(markup, vec!["<p>one</p>", "<p>1</p>", "<p>two</p>", "<p>2</p>"]);
    }

    #[test]
    fn test_reset_clears_messages_and_restores_welcome() {
        let mut view = ViewModel::new();
        type_text(&mut view, "hello");
        view.submit().unwrap();
        view.settle(ExchangeOutcome::Response("<p>hi</p>".to_string()), &highlighter());
        type_text(&mut view, "again");
        view.submit().unwrap();

        view.reset();

        assert!(view.messages().is_empty());
        assert!(view.welcome_visible());
        assert!(!view.is_typing());
        assert_eq!(view.exchange(), ExchangeState::Idle);
    }

    #[test]
    fn test_response_after_reset_is_discarded() {
        let mut view = ViewModel::new();
        type_text(&mut view, "hello");
        view.submit().unwrap();
        view.reset();

        let applied = view.settle(
            ExchangeOutcome::Response("<p>late</p>".to_string()),
            &highlighter(),
        );

        assert!(!applied);
        assert!(view.messages().is_empty());
        assert!(view.welcome_visible());
    }
}
