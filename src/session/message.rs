//! Turn-log messages
//!
//! One variant per message kind, so a hint can never carry a similarity score
//! and a prompt can never carry an attempt counter. The log is append-only;
//! the only mutation is patching the latest learner entry after grading.

use serde::{Deserialize, Serialize};

use crate::core::WordCorrection;
use crate::dialogue::StepKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    #[serde(flatten)]
    pub kind: MessageKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageKind {
    /// A teacher prompt presenting a step
    Prompt {
        text: String,
        step_kind: StepKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expected_response: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        grammar_note: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        audio_url: Option<String>,
    },
    /// A graded learner utterance
    Learner {
        text: String,
        original_text: String,
        similarity: f32,
        corrections: Vec<WordCorrection>,
        word_count: usize,
        accepted: bool,
    },
    /// An escalating hint after a failed attempt
    Hint { text: String, attempt: u32 },
    /// The expected answer shown after a forced reveal or skip
    Reveal {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        audio_url: Option<String>,
    },
    /// A short praise line after an accepted answer
    Success {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        audio_url: Option<String>,
    },
}

impl Message {
    pub fn text(&self) -> &str {
        match &self.kind {
            MessageKind::Prompt { text, .. }
            | MessageKind::Learner { text, .. }
            | MessageKind::Hint { text, .. }
            | MessageKind::Reveal { text, .. }
            | MessageKind::Success { text, .. } => text,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self.kind, MessageKind::Learner { .. })
    }
}
