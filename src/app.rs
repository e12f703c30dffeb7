use std::path::PathBuf;

use chrono::Local;
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;

use crate::client::{ChatClient, DrugInfo};
use crate::error::NetworkError;
use crate::highlight::Highlighter;
use crate::state::{Catalog, CatalogEntry};
use crate::transcript::Transcript;
use crate::view::{ExchangeOutcome, ExchangeRequest, ViewModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Input,
    Catalog,
}

/// State of the medication detail popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrugPopup {
    Loading(String),
    Loaded(DrugInfo),
    Failed { name: String, message: String },
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub focus: FocusPane,
    pub view: ViewModel,
    pub highlighter: Highlighter,
    pub client: ChatClient,

    // Sidebar
    pub catalog_state: ListState,
    pub drug_popup: Option<DrugPopup>,

    // Chat scrolling (max and height are updated during render)
    pub chat_scroll: u16,
    pub chat_max_scroll: u16,
    pub chat_height: u16,
    pub follow_chat: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    /// One-line notice for the footer, e.g. where a transcript was saved.
    pub status: Option<String>,
    pub transcript_dir: PathBuf,

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub catalog_area: Option<Rect>,

    // Background requests
    exchange_task: Option<JoinHandle<Result<String, NetworkError>>>,
    catalog_task: Option<JoinHandle<Result<Vec<CatalogEntry>, NetworkError>>>,
    info_task: Option<JoinHandle<Result<DrugInfo, NetworkError>>>,
}

impl App {
    pub fn new(client: ChatClient, highlighter: Highlighter, transcript_dir: PathBuf) -> Self {
        Self {
            should_quit: false,
            focus: FocusPane::Input,
            view: ViewModel::new(),
            highlighter,
            client,

            catalog_state: ListState::default(),
            drug_popup: None,

            chat_scroll: 0,
            chat_max_scroll: 0,
            chat_height: 0,
            follow_chat: true,

            animation_frame: 0,

            status: None,
            transcript_dir,

            chat_area: None,
            catalog_area: None,

            exchange_task: None,
            catalog_task: None,
            info_task: None,
        }
    }

    /// Load the sidebar list in the background.
    pub fn start_catalog_fetch(&mut self) {
        let client = self.client.clone();
        self.catalog_task = Some(tokio::spawn(async move { client.fetch_catalog().await }));
    }

    pub fn set_catalog(&mut self, entries: Vec<CatalogEntry>) {
        let catalog = Catalog::from_entries(entries);
        tracing::info!(count = catalog.len(), "drug list loaded");
        self.catalog_state
            .select(if catalog.is_empty() { None } else { Some(0) });
        self.view.set_catalog(catalog);
    }

    /// Send whatever is in the input box.
    pub fn send_message(&mut self) {
        if let Some(request) = self.view.submit() {
            self.start_exchange(request);
        }
    }

    /// Ask about the highlighted sidebar entry.
    pub fn ask_selected_drug(&mut self) {
        let Some(index) = self.catalog_state.selected() else {
            return;
        };
        if let Some(request) = self.view.ask_about(index) {
            self.focus = FocusPane::Input;
            self.start_exchange(request);
        }
    }

    fn start_exchange(&mut self, request: ExchangeRequest) {
        tracing::info!(chars = request.prompt.chars().count(), "sending message");
        self.follow_chat = true;
        self.status = None;

        let client = self.client.clone();
        self.exchange_task = Some(tokio::spawn(async move {
            client.exchange(&request.prompt).await
        }));
    }

    /// Open the detail popup for the highlighted sidebar entry.
    pub fn show_selected_drug_info(&mut self) {
        let Some(name) = self
            .catalog_state
            .selected()
            .and_then(|i| self.view.catalog().get(i))
            .map(|entry| entry.name.clone())
        else {
            return;
        };

        if let Some(task) = self.info_task.take() {
            task.abort();
        }
        self.drug_popup = Some(DrugPopup::Loading(name.clone()));

        let client = self.client.clone();
        self.info_task = Some(tokio::spawn(async move { client.drug_info(&name).await }));
    }

    pub fn close_popup(&mut self) {
        if let Some(task) = self.info_task.take() {
            task.abort();
        }
        self.drug_popup = None;
    }

    /// Clear the conversation, abandoning any request still in flight.
    pub fn reset(&mut self) {
        if let Some(task) = self.exchange_task.take() {
            task.abort();
        }
        self.view.reset();
        self.chat_scroll = 0;
        self.follow_chat = true;
        self.status = None;
    }

    pub fn save_transcript(&mut self) {
        if self.view.messages().is_empty() {
            self.status = Some("Nothing to save yet".to_string());
            return;
        }

        let transcript = Transcript::from_messages(self.view.messages(), Local::now());
        match transcript.save_in(&self.transcript_dir) {
            Ok(path) => {
                tracing::info!(path = %path.display(), "transcript saved");
                self.status = Some(format!("Saved {}", path.display()));
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to save transcript");
                self.status = Some(format!("Could not save transcript: {e}"));
            }
        }
    }

    /// Collect results of finished background requests.
    pub async fn poll_tasks(&mut self) {
        if let Some(task) = take_finished(&mut self.exchange_task) {
            let outcome = match task.await {
                Ok(Ok(markup)) => ExchangeOutcome::Response(markup),
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "error sending message");
                    ExchangeOutcome::Failed
                }
                Err(e) => {
                    tracing::error!(error = %e, "chat request task failed");
                    ExchangeOutcome::Failed
                }
            };
            if self.view.settle(outcome, &self.highlighter) {
                self.follow_chat = true;
            }
        }

        if let Some(task) = take_finished(&mut self.catalog_task) {
            match task.await {
                Ok(Ok(entries)) => self.set_catalog(entries),
                // The sidebar just stays empty
                Ok(Err(e)) => tracing::warn!(error = %e, "error fetching drug list"),
                Err(e) => tracing::warn!(error = %e, "drug list task failed"),
            }
        }

        if let Some(task) = take_finished(&mut self.info_task) {
            let name = match &self.drug_popup {
                Some(DrugPopup::Loading(name)) => name.clone(),
                _ => return,
            };
            self.drug_popup = Some(match task.await {
                Ok(Ok(info)) => DrugPopup::Loaded(info),
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, drug = %name, "error fetching drug info");
                    DrugPopup::Failed {
                        name,
                        message: e.to_string(),
                    }
                }
                Err(e) => DrugPopup::Failed {
                    name,
                    message: e.to_string(),
                },
            });
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.view.is_typing() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_chat = false;
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.chat_max_scroll);
        // Reaching the bottom resumes following new messages
        self.follow_chat = self.chat_scroll >= self.chat_max_scroll;
    }

    pub fn catalog_nav_down(&mut self) {
        let len = self.view.catalog().len();
        if len > 0 {
            let i = self.catalog_state.selected().unwrap_or(0);
            self.catalog_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn catalog_nav_up(&mut self) {
        if !self.view.catalog().is_empty() {
            let i = self.catalog_state.selected().unwrap_or(0);
            self.catalog_state.select(Some(i.saturating_sub(1)));
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            FocusPane::Input if !self.view.catalog().is_empty() => FocusPane::Catalog,
            FocusPane::Input | FocusPane::Catalog => FocusPane::Input,
        };
    }
}

fn take_finished<T>(slot: &mut Option<JoinHandle<T>>) -> Option<JoinHandle<T>> {
    if slot.as_ref().is_some_and(JoinHandle::is_finished) {
        slot.take()
    } else {
        None
    }
}
