//! Terminal chat client for a Parkinson's disease treatment assistant.
//!
//! The backend answers questions with HTML fragments; this crate parses them
//! into a small document model, tags known side-effect terms and renders the
//! conversation with ratatui.

pub mod app;
pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod highlight;
pub mod input;
pub mod markup;
pub mod render;
pub mod state;
pub mod transcript;
pub mod tui;
pub mod ui;
pub mod view;

pub use client::ChatClient;
pub use error::NetworkError;
pub use highlight::{Highlighter, Severity};
pub use view::ViewModel;
