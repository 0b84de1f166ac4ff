//! Audio playback seam and arbitration
//!
//! Playback transport is out of scope; the session only needs "play this URL,
//! tell me when you are done or failed". The arbiter serializes who owns the
//! audio channel at any moment, replacing ad-hoc boolean flags with one
//! validated transition function.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{DrillError, DrillResult};

/// Who currently owns the audio channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioState {
    Idle,
    /// Teacher prompt or hint audio is playing
    Speaking,
    /// Microphone is open for the learner
    Recording,
    /// The expected-response audio is playing after an accept/reveal
    PlayingResponse,
    /// Audio held back while a restored session is being replayed
    BlockedForRestore,
}

/// Single-owner arbitration over the audio channel
#[derive(Debug)]
pub struct AudioArbiter {
    state: AudioState,
}

impl AudioArbiter {
    pub fn new() -> Self {
        Self {
            state: AudioState::Idle,
        }
    }

    pub fn state(&self) -> AudioState {
        self.state
    }

    /// Request a transition. Only transitions through `Idle` (or release back
    /// to `Idle`) are legal; anything else means two owners collided.
    pub fn transition(&mut self, next: AudioState) -> DrillResult<()> {
        use AudioState::*;
        let allowed = matches!(
            (self.state, next),
            (_, Idle)
                | (Idle, Speaking)
                | (Idle, Recording)
                | (Idle, PlayingResponse)
                | (Idle, BlockedForRestore)
                | (BlockedForRestore, Speaking)
        );
        if !allowed {
            return Err(DrillError::Session(format!(
                "audio channel busy: {:?} -> {:?}",
                self.state, next
            )));
        }
        debug!("🔈 Audio state {:?} -> {:?}", self.state, next);
        self.state = next;
        Ok(())
    }

    /// Unconditional release, used by reset and watchdog paths
    pub fn force_idle(&mut self) {
        if self.state != AudioState::Idle {
            debug!("🔈 Audio state {:?} forced to Idle", self.state);
            self.state = AudioState::Idle;
        }
    }
}

impl Default for AudioArbiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for audio playback backends
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Play the clip at `url`, resolving when playback ends or fails
    async fn play(&self, url: &str) -> DrillResult<()>;

    /// Stop any in-flight playback
    fn stop(&self);

    /// Get the backend name
    fn name(&self) -> &str;
}

/// Playback backend that only logs. Used headless and in tests.
#[derive(Debug, Default)]
pub struct NullPlayer;

#[async_trait]
impl AudioPlayer for NullPlayer {
    async fn play(&self, url: &str) -> DrillResult<()> {
        debug!("🎵 (null player) would play: {}", url);
        Ok(())
    }

    fn stop(&self) {}

    fn name(&self) -> &str {
        "null"
    }
}

/// Play a clip best-effort: failures and timeouts are logged and swallowed so
/// playback can never block game-logic progression.
pub async fn play_best_effort(player: &dyn AudioPlayer, url: &str, timeout: Duration) {
    match tokio::time::timeout(timeout, player.play(url)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("⚠️ Audio playback failed, continuing: {}", e),
        Err(_) => warn!("⏱️ Audio playback timed out after {:?}, continuing", timeout),
    }
}
