//! Speech-to-text boundary and live grading monitor
//!
//! Recognition itself is external: something produces text events while a
//! recording session is open. The `LiveMonitor` evaluates interim text
//! continuously against the adaptive threshold to decide when an utterance is
//! confidently correct before the learner even stops the recording.

use async_trait::async_trait;
use std::time::{Duration, Instant};

use crate::config::{LiveConfig, MatchConfig, TimingConfig};
use crate::core::{AdaptiveThreshold, SimilarityEngine};

/// A text event from the recognizer
#[derive(Debug, Clone)]
pub struct TranscriptEvent {
    pub text: String,
    /// Final results end the utterance; interim ones may still be revised
    pub is_final: bool,
}

/// Trait for transcript producers (microphone pipelines, test feeds)
#[async_trait]
pub trait TranscriptSource: Send {
    /// Next event, or `None` once the stream is closed
    async fn next_event(&mut self) -> Option<TranscriptEvent>;

    /// Stop the underlying recognizer
    fn stop(&mut self);
}

/// Verdict on one interim evaluation
#[derive(Debug, Clone, Copy)]
pub struct LiveVerdict {
    pub accept: bool,
    pub similarity: f32,
    pub threshold: f32,
    pub length_ok: bool,
}

/// Continuous evaluation of interim recognition text
pub struct LiveMonitor {
    engine: SimilarityEngine,
    threshold: AdaptiveThreshold,
    recording_timeout: Duration,
    started_at: Option<Instant>,
}

impl LiveMonitor {
    pub fn new(matching: MatchConfig, live: LiveConfig, timing: &TimingConfig) -> Self {
        Self {
            engine: SimilarityEngine::new(matching),
            threshold: AdaptiveThreshold::new(live),
            recording_timeout: Duration::from_millis(timing.recording_timeout_ms),
            started_at: None,
        }
    }

    /// Mark the start of a recording window
    pub fn start_recording(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Close the recording window
    pub fn stop_recording(&mut self) {
        self.started_at = None;
    }

    pub fn is_recording(&self) -> bool {
        self.started_at.is_some()
    }

    /// Has the bounded recording window elapsed without acceptance?
    pub fn timed_out(&self) -> bool {
        self.started_at
            .map(|t| t.elapsed() >= self.recording_timeout)
            .unwrap_or(false)
    }

    /// Evaluate interim text against the expected answer.
    ///
    /// Acceptance needs both the adaptive similarity bar and the
    /// length-sufficiency check; a confident fragment is not enough.
    pub fn evaluate(&self, interim: &str, expected: &str) -> LiveVerdict {
        let elapsed = self
            .started_at
            .map(|t| t.elapsed())
            .unwrap_or(Duration::ZERO);
        self.evaluate_at(interim, expected, elapsed)
    }

    /// Evaluation with an explicit elapsed duration (deterministic for tests)
    pub fn evaluate_at(&self, interim: &str, expected: &str, elapsed: Duration) -> LiveVerdict {
        let threshold = self.threshold.threshold(expected, elapsed);
        let result = self.engine.compare(interim, expected);
        let length_ok = self.engine.length_sufficient(interim, expected);
        LiveVerdict {
            accept: result.similarity >= threshold && length_ok,
            similarity: result.similarity,
            threshold,
            length_ok,
        }
    }
}

/// Debounce for live auto-accept: interim text must hold above the bar for a
/// confirmation window before the answer is submitted, so a transient
/// recognition flicker cannot trigger acceptance.
pub struct AutoSubmit {
    hold: Duration,
    pre_submit: Duration,
    above_bar_since: Option<tokio::time::Instant>,
}

impl AutoSubmit {
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            hold: Duration::from_millis(timing.confirm_hold_ms),
            pre_submit: Duration::from_millis(timing.pre_submit_ms),
            above_bar_since: None,
        }
    }

    /// Feed the latest verdict. Returns `true` once acceptance has held for
    /// the full confirmation window.
    pub fn observe(&mut self, verdict: &LiveVerdict) -> bool {
        if !verdict.accept {
            self.above_bar_since = None;
            return false;
        }
        let since = *self
            .above_bar_since
            .get_or_insert_with(tokio::time::Instant::now);
        since.elapsed() >= self.hold
    }

    /// Pause between confirmation and the actual submission
    pub fn pre_submit_pause(&self) -> Duration {
        self.pre_submit
    }

    pub fn reset(&mut self) {
        self.above_bar_since = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> LiveMonitor {
        LiveMonitor::new(
            MatchConfig::default(),
            LiveConfig::default(),
            &TimingConfig::default(),
        )
    }

    #[test]
    fn test_exact_interim_accepts() {
        let v = monitor().evaluate_at("the patient is stable", "The patient is stable", Duration::ZERO);
        assert!(v.accept);
        assert!(v.length_ok);
    }

    #[test]
    fn test_fragment_blocked_by_length() {
        // High word-level similarity but insufficient coverage
        let v = monitor().evaluate_at("agree", "I agree", Duration::ZERO);
        assert!(!v.length_ok);
        assert!(!v.accept);
    }

    #[test]
    fn test_bar_drops_over_time() {
        let m = monitor();
        let early = m.evaluate_at("x", "the patient is stable", Duration::ZERO);
        let late = m.evaluate_at("x", "the patient is stable", Duration::from_secs(20));
        assert!(late.threshold < early.threshold);
    }

    #[test]
    fn test_timeout_reporting() {
        let mut m = monitor();
        assert!(!m.timed_out());
        m.start_recording();
        // Fresh recording has not timed out
        assert!(!m.timed_out());
        m.stop_recording();
        assert!(!m.is_recording());
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_submit_requires_hold() {
        let mut auto = AutoSubmit::new(&TimingConfig::default());
        let accept = LiveVerdict {
            accept: true,
            similarity: 0.9,
            threshold: 0.7,
            length_ok: true,
        };
        let reject = LiveVerdict {
            accept: false,
            ..accept
        };

        // First observation starts the hold window
        assert!(!auto.observe(&accept));
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert!(auto.observe(&accept));

        // A dip below the bar resets the window
        auto.observe(&reject);
        assert!(!auto.observe(&accept));
    }
}
