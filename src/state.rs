//! UI-agnostic conversation types
//!
//! These carry no terminal types so they can be rendered, exported or tested
//! without a frame.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::highlight::Highlighter;
use crate::markup::{self, Document};

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    /// What the user typed. Never interpreted as markup.
    Text(String),
    /// Backend markup, parsed and annotated with side-effect terms.
    Rendered(Document),
}

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: ChatRole,
    pub body: MessageBody,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            body: MessageBody::Text(text.into()),
        }
    }

    /// Parse trusted backend markup and tag known terms in it.
    pub fn bot(markup: &str, highlighter: &Highlighter) -> Self {
        let mut document = markup::parse(markup);
        highlighter.annotate(&mut document);
        Self {
            role: ChatRole::Bot,
            body: MessageBody::Rendered(document),
        }
    }

    /// Markup form of the message. User text is escaped so it can never
    /// inject tags.
    pub fn to_markup(&self) -> String {
        match &self.body {
            MessageBody::Text(text) => format!("<p>{}</p>", markup::escape_html(text)),
            MessageBody::Rendered(document) => document.to_markup(),
        }
    }
}

/// A selectable topic (medication) shown in the side list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
}

/// Ordered list of catalog entries with unique display names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Keeps the backend's order; later entries whose name matches an earlier
    /// one (ignoring case and surrounding whitespace) are dropped.
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let mut kept: Vec<CatalogEntry> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for entry in entries {
            let name = entry.name.trim();
            if name.is_empty() {
                continue;
            }
            if !seen.insert(name.to_lowercase()) {
                tracing::warn!(name, "dropping duplicate catalog entry");
                continue;
            }
            kept.push(CatalogEntry {
                name: name.to_string(),
            });
        }
        Self { entries: kept }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&CatalogEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
