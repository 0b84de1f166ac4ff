//! Dialogue content types and loader
//!
//! Read-only drill content. The engine never mutates a dialogue; a missing or
//! unparseable dialogue is the one hard failure in the system, since there is
//! no state to recover into.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{DrillError, DrillResult};

/// What kind of turn a step represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// Presented and spoken, no learner response expected
    Instruction,
    /// New word or phrase introduction
    Vocabulary,
    /// Conversational turn the learner must answer
    Conversation,
}

/// One content unit of a dialogue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueStep {
    #[serde(rename = "type")]
    pub kind: StepKind,
    /// Prompt in the learner's native language
    #[serde(default)]
    pub native_text: String,
    /// Prompt shown/spoken by the virtual teacher
    #[serde(default)]
    pub prompt: String,
    /// The answer the learner should produce, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_response: Option<String>,
    /// Alternative accepted phrasings of the answer
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variations: Vec<String>,
    /// Audio for the prompt itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    /// Audio for the expected response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grammar_note: Option<String>,
}

impl DialogueStep {
    /// Steps without an expected response never enter grading
    pub fn requires_response(&self) -> bool {
        self.expected_response
            .as_deref()
            .map(|r| !r.trim().is_empty())
            .unwrap_or(false)
    }
}

/// A complete drill dialogue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dialogue {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub conversation: Vec<DialogueStep>,
}

impl Dialogue {
    /// Load a dialogue from a JSON file
    pub fn load(path: &Path) -> DrillResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DrillError::Content(format!("cannot read dialogue {}: {}", path.display(), e))
        })?;
        let dialogue = Self::from_json(&content)?;
        info!(
            "📖 Loaded dialogue '{}' ({} steps)",
            dialogue.id,
            dialogue.conversation.len()
        );
        Ok(dialogue)
    }

    /// Parse dialogue JSON, rejecting empty content
    pub fn from_json(content: &str) -> DrillResult<Self> {
        let dialogue: Dialogue = serde_json::from_str(content)
            .map_err(|e| DrillError::Content(format!("malformed dialogue: {}", e)))?;
        if dialogue.id.is_empty() {
            return Err(DrillError::Content("dialogue has no id".into()));
        }
        if dialogue.conversation.is_empty() {
            return Err(DrillError::Content(format!(
                "dialogue '{}' has no steps",
                dialogue.id
            )));
        }
        Ok(dialogue)
    }

    pub fn len(&self) -> usize {
        self.conversation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversation.is_empty()
    }

    pub fn step(&self, index: usize) -> Option<&DialogueStep> {
        self.conversation.get(index)
    }
}
