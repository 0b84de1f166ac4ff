//! Dialogue session state machine
//!
//! Turn-based controller around the similarity engine: consumes graded
//! utterances and decides accept / hint / retry / forced reveal / skip /
//! advance / complete. Holds the per-session state, the message log and the
//! persistence hooks. One utterance is graded at a time; audio is a
//! best-effort side channel that can never block progression.

pub mod hints;
pub mod message;
pub mod sequencer;

pub use message::{Message, MessageKind};
pub use sequencer::Sequencer;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::audio::{play_best_effort, AudioArbiter, AudioPlayer, AudioState};
use crate::config::DrillConfig;
use crate::core::SimilarityEngine;
use crate::dialogue::{Dialogue, DialogueStep};
use crate::error::{DrillError, DrillResult};
use crate::storage::{KeyValueStore, ProgressStore};

/// Attempts allowed before the answer is revealed
const MAX_ATTEMPTS: u32 = 3;

/// Where the session currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingInput,
    Grading,
    Advancing,
    Complete,
}

/// Outcome of one learner action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Accepted,
    HintShown,
    AnswerForced,
    Skipped,
    /// Dropped without effect (empty text, mid-grading arrival, no active step)
    Ignored,
}

/// The state machine's memory for one dialogue run
#[derive(Debug, Clone)]
pub struct DialogueState {
    pub current_index: usize,
    pub messages: Vec<Message>,
    pub attempts: u32,
    pub showing_answer: bool,
    pub is_complete: bool,
    pub last_message_id: Option<u64>,
    pub skipped_phrases: HashSet<usize>,
    pub words_spoken: usize,
    pub started_at_ms: Option<i64>,
    pub ended_at_ms: Option<i64>,
}

impl DialogueState {
    fn fresh(now_ms: i64) -> Self {
        Self {
            current_index: 0,
            messages: Vec::new(),
            attempts: 0,
            showing_answer: false,
            is_complete: false,
            last_message_id: None,
            skipped_phrases: HashSet::new(),
            words_spoken: 0,
            started_at_ms: Some(now_ms),
            ended_at_ms: None,
        }
    }
}

/// Serializable projection of `DialogueState` used for resume
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub current_index: usize,
    pub messages: Vec<Message>,
    pub attempts: u32,
    pub showing_answer: bool,
    pub words_spoken: usize,
    pub skipped_phrases: HashSet<usize>,
    pub started_at_ms: Option<i64>,
}

impl Snapshot {
    fn of(state: &DialogueState) -> Self {
        Self {
            current_index: state.current_index,
            messages: state.messages.clone(),
            attempts: state.attempts,
            showing_answer: state.showing_answer,
            words_spoken: state.words_spoken,
            skipped_phrases: state.skipped_phrases.clone(),
            started_at_ms: state.started_at_ms,
        }
    }
}

pub struct DialogueSession<S: KeyValueStore> {
    dialogue: Dialogue,
    state: DialogueState,
    phase: Phase,
    engine: SimilarityEngine,
    config: DrillConfig,
    player: Arc<dyn AudioPlayer>,
    arbiter: AudioArbiter,
    sequencer: Sequencer,
    progress: ProgressStore<S>,
    next_message_id: u64,
}

impl<S: KeyValueStore> DialogueSession<S> {
    pub fn new(
        dialogue: Dialogue,
        config: DrillConfig,
        player: Arc<dyn AudioPlayer>,
        progress: ProgressStore<S>,
    ) -> DrillResult<Self> {
        if dialogue.is_empty() {
            return Err(DrillError::Content(format!(
                "dialogue '{}' has no steps",
                dialogue.id
            )));
        }
        Ok(Self {
            engine: SimilarityEngine::new(config.matching.clone()),
            state: DialogueState::fresh(chrono::Utc::now().timestamp_millis()),
            phase: Phase::AwaitingInput,
            dialogue,
            config,
            player,
            arbiter: AudioArbiter::new(),
            sequencer: Sequencer::new(),
            progress,
            next_message_id: 1,
        })
    }

    /// Begin the session: restore saved progress when present, otherwise
    /// present the first step.
    pub async fn start(&mut self) -> DrillResult<bool> {
        if self.progress.has_progress(&self.dialogue.id) {
            if let Some(snapshot) = self.progress.load::<Snapshot>(&self.dialogue.id) {
                if !snapshot.messages.is_empty()
                    && snapshot.current_index < self.dialogue.len()
                {
                    self.apply_snapshot(snapshot);
                    info!(
                        "🔄 Resuming dialogue '{}' at step {}",
                        self.dialogue.id,
                        self.state.current_index + 1
                    );
                    // A snapshot can land on a presentation-only step whose
                    // prompt is already in the log; move past it without
                    // re-presenting so the session is never stuck awaiting
                    // input nobody can give.
                    while self
                        .dialogue
                        .step(self.state.current_index)
                        .map(|s| !s.requires_response())
                        .unwrap_or(false)
                    {
                        self.bump_index();
                    }
                    if self.state.current_index >= self.dialogue.len() {
                        self.complete();
                    } else {
                        self.phase = Phase::AwaitingInput;
                    }
                    return Ok(true);
                }
            }
            // Unusable snapshot: forget it and start over
            self.progress.clear(&self.dialogue.id);
        }

        info!("🆕 Starting dialogue '{}' from the beginning", self.dialogue.id);
        self.present_current_step().await?;
        Ok(false)
    }

    /// Grade one candidate utterance (final recognition result or an
    /// assembled tile sentence).
    pub async fn submit(&mut self, text: &str) -> DrillResult<Turn> {
        if self.phase == Phase::Complete {
            return Ok(Turn::Ignored);
        }
        if self.phase != Phase::AwaitingInput {
            debug!("🚫 Utterance dropped, grading already in flight");
            return Ok(Turn::Ignored);
        }
        let Some(step) = self.dialogue.step(self.state.current_index).cloned() else {
            return Ok(Turn::Ignored);
        };
        if !step.requires_response() {
            return Ok(Turn::Ignored);
        }
        // A recognition timeout surfaces as an empty candidate: no attempt consumed
        if text.trim().is_empty() {
            return Ok(Turn::Ignored);
        }

        self.phase = Phase::Grading;
        let expected = step.expected_response.clone().unwrap_or_default();
        let result = self
            .engine
            .compare_with_variations(text, &expected, &step.variations);
        debug!(
            "📊 Graded utterance: similarity {:.2}, progressive {}",
            result.similarity, result.is_progressive_match
        );

        let display_text = if result.similarity >= 0.8 {
            result.corrected_text.clone()
        } else {
            text.trim().to_string()
        };
        let word_count = text.split_whitespace().count();
        self.push_message(MessageKind::Learner {
            text: display_text,
            original_text: text.trim().to_string(),
            similarity: result.similarity,
            corrections: result.corrections.clone(),
            word_count,
            accepted: result.is_correct,
        });
        self.state.words_spoken += word_count;
        self.save_progress();

        if result.is_correct {
            info!("✅ Answer accepted ({:.0}%)", result.similarity * 100.0);
            self.celebrate_and_advance(&step).await?;
            return Ok(Turn::Accepted);
        }

        let next_attempt = self.state.attempts + 1;
        if next_attempt >= MAX_ATTEMPTS {
            info!("📣 Third miss, revealing the answer");
            // The failed attempt is not kept; the entry becomes the correct
            // answer as if the learner had said it.
            self.patch_last_learner(&expected);
            self.state.attempts = MAX_ATTEMPTS;
            self.state.showing_answer = true;
            self.save_progress();
            self.celebrate_and_advance(&step).await?;
            return Ok(Turn::AnswerForced);
        }

        self.state.attempts = next_attempt;
        self.state.showing_answer = false;
        self.save_progress();

        self.sequencer
            .delay("hint-transition", self.transition_pause())
            .await;
        let hint = hints::generate_hint(&expected, next_attempt);
        self.push_message(MessageKind::Hint {
            text: hint,
            attempt: next_attempt,
        });
        self.save_progress();
        self.phase = Phase::AwaitingInput;
        Ok(Turn::HintShown)
    }

    /// Skip the current step, revealing its answer
    pub async fn skip(&mut self) -> DrillResult<Turn> {
        if self.phase != Phase::AwaitingInput {
            return Ok(Turn::Ignored);
        }
        let Some(step) = self.dialogue.step(self.state.current_index).cloned() else {
            return Ok(Turn::Ignored);
        };

        info!("⏭️ Step {} skipped", self.state.current_index + 1);
        self.state.skipped_phrases.insert(self.state.current_index);
        self.save_progress();

        if let Some(expected) = step.expected_response.as_deref() {
            self.sequencer
                .delay("skip-transition", self.transition_pause())
                .await;
            self.push_message(MessageKind::Reveal {
                text: expected.to_string(),
                audio_url: step.response_audio_url.clone(),
            });
            self.save_progress();
            if let Some(url) = &step.response_audio_url {
                self.speak(url, AudioState::PlayingResponse).await;
            }
            self.sequencer
                .delay(
                    "skip-pause",
                    Duration::from_millis(self.config.timing.skip_pause_ms),
                )
                .await;
        }

        self.advance().await?;
        Ok(Turn::Skipped)
    }

    /// Abandon the current run: cancel timers, stop audio, wipe local state
    /// and stored records, and present the dialogue from the top.
    pub async fn reset(&mut self) -> DrillResult<()> {
        self.sequencer.cancel_all();
        self.player.stop();
        self.arbiter.force_idle();
        self.progress.reset(&self.dialogue.id);
        self.state = DialogueState::fresh(chrono::Utc::now().timestamp_millis());
        self.next_message_id = 1;
        self.phase = Phase::AwaitingInput;
        self.present_current_step().await
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &DialogueState {
        &self.state
    }

    pub fn dialogue(&self) -> &Dialogue {
        &self.dialogue
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete
    }

    /// The step the learner is currently answering
    pub fn current_step(&self) -> Option<&DialogueStep> {
        self.dialogue.step(self.state.current_index)
    }

    /// Messages appended after the given id (for incremental rendering)
    pub fn messages_since(&self, after_id: u64) -> &[Message] {
        let start = self
            .state
            .messages
            .iter()
            .position(|m| m.id > after_id)
            .unwrap_or(self.state.messages.len());
        &self.state.messages[start..]
    }

    pub fn progress_store(&mut self) -> &mut ProgressStore<S> {
        &mut self.progress
    }

    // --- internals -------------------------------------------------------

    /// Accepted or revealed answer: response audio, praise, pause, advance
    async fn celebrate_and_advance(&mut self, step: &DialogueStep) -> DrillResult<()> {
        if let Some(url) = &step.response_audio_url {
            self.speak(url, AudioState::PlayingResponse).await;
        }
        self.sequencer
            .delay("success-transition", self.transition_pause())
            .await;
        let phrase = hints::pick_success(&mut rand::thread_rng());
        self.push_message(MessageKind::Success {
            text: phrase.to_string(),
            audio_url: None,
        });
        self.save_progress();
        self.sequencer
            .delay(
                "success-pause",
                Duration::from_millis(self.config.timing.success_pause_ms),
            )
            .await;
        self.advance().await
    }

    /// Move past the current step, then present until a step needs input
    async fn advance(&mut self) -> DrillResult<()> {
        self.phase = Phase::Advancing;
        self.bump_index();
        self.present_current_step().await
    }

    /// Present the active step; instruction steps with no expected response
    /// play through and auto-advance until a responsive step (or the end).
    async fn present_current_step(&mut self) -> DrillResult<()> {
        loop {
            let Some(step) = self.dialogue.step(self.state.current_index).cloned() else {
                self.complete();
                return Ok(());
            };

            let text = if !step.prompt.is_empty() {
                step.prompt.clone()
            } else {
                step.native_text.clone()
            };
            if !text.is_empty() {
                self.push_message(MessageKind::Prompt {
                    text,
                    step_kind: step.kind,
                    expected_response: step.expected_response.clone(),
                    grammar_note: step.grammar_note.clone(),
                    audio_url: step.audio_url.clone(),
                });
                self.save_progress();
            }

            if let Some(url) = &step.audio_url {
                self.speak(url, AudioState::Speaking).await;
            }

            if step.requires_response() {
                self.phase = Phase::AwaitingInput;
                return Ok(());
            }

            self.sequencer
                .delay("step-transition", self.transition_pause())
                .await;
            self.bump_index();
        }
    }

    /// The only place attempts reset: moving to a new sentence index
    fn bump_index(&mut self) {
        self.state.current_index += 1;
        self.state.attempts = 0;
        self.state.showing_answer = false;
        self.state.last_message_id = None;
        self.save_progress();
    }

    fn complete(&mut self) {
        let now = chrono::Utc::now().timestamp_millis();
        self.state.is_complete = true;
        self.state.ended_at_ms = Some(now);
        self.phase = Phase::Complete;
        self.progress.mark_completed(&self.dialogue.id, now);
        info!("🎉 Dialogue '{}' complete", self.dialogue.id);
    }

    fn push_message(&mut self, kind: MessageKind) {
        let id = self.next_message_id;
        self.next_message_id += 1;
        self.state.messages.push(Message { id, kind });
        self.state.last_message_id = Some(id);
    }

    /// Patch the latest learner entry to carry the expected answer as correct
    fn patch_last_learner(&mut self, expected: &str) {
        let Some(last_id) = self.state.last_message_id else {
            return;
        };
        if let Some(message) = self
            .state
            .messages
            .iter_mut()
            .rev()
            .find(|m| m.id == last_id)
        {
            if let MessageKind::Learner { text, accepted, .. } = &mut message.kind {
                *text = expected.to_string();
                *accepted = true;
            }
        }
    }

    async fn speak(&mut self, url: &str, claim: AudioState) {
        if self.arbiter.transition(claim).is_err() {
            warn!("⚠️ Audio channel busy, skipping clip {}", url);
            return;
        }
        let timeout = Duration::from_millis(self.config.timing.audio_timeout_ms);
        let watchdog = Duration::from_millis(self.config.timing.speaking_timeout_ms);
        // The watchdog guards the whole speaking phase so a wedged backend can
        // never block progression.
        if tokio::time::timeout(watchdog, play_best_effort(self.player.as_ref(), url, timeout))
            .await
            .is_err()
        {
            warn!("⏱️ Speaking watchdog fired, forcing progression");
            self.player.stop();
        }
        self.arbiter.force_idle();
    }

    fn save_progress(&mut self) {
        if !self.state.is_complete {
            let snapshot = Snapshot::of(&self.state);
            self.progress.save(&self.dialogue.id, &snapshot);
        }
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot) {
        self.next_message_id = snapshot
            .messages
            .iter()
            .map(|m| m.id)
            .max()
            .unwrap_or(0)
            + 1;
        self.state = DialogueState {
            current_index: snapshot.current_index,
            last_message_id: snapshot.messages.last().map(|m| m.id),
            messages: snapshot.messages,
            attempts: snapshot.attempts,
            showing_answer: snapshot.showing_answer,
            is_complete: false,
            skipped_phrases: snapshot.skipped_phrases,
            words_spoken: snapshot.words_spoken,
            started_at_ms: snapshot.started_at_ms,
            ended_at_ms: None,
        };
    }

    fn transition_pause(&self) -> Duration {
        Duration::from_millis(self.config.timing.message_transition_ms)
    }
}
