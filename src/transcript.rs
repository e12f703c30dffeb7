//! Saving a conversation to disk as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::state::{ChatRole, Message};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: ChatRole,
    pub markup: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub timestamp: DateTime<Local>,
    pub messages: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn from_messages(messages: &[Message], timestamp: DateTime<Local>) -> Self {
        Self {
            timestamp,
            messages: messages
                .iter()
                .map(|m| TranscriptEntry {
                    role: m.role,
                    markup: m.to_markup(),
                })
                .collect(),
        }
    }

    pub fn file_name(&self) -> String {
        format!("conversation_{}.json", self.timestamp.format("%Y%m%d_%H%M%S"))
    }

    /// Write into `dir` (created if needed), returning the file path.
    pub fn save_in(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}
