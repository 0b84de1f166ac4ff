//! Cancellable step sequencer
//!
//! Every pause in the dialogue flow (hint display, success pause, transition
//! delay) runs through here as a named, cancellable step. Cancellation works
//! by session generation: a reset bumps the generation and every pending
//! delay belonging to an older generation resolves as cancelled, so a stale
//! timer can never mutate a session that has since moved on.

use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug)]
pub struct Sequencer {
    generation_tx: watch::Sender<u64>,
}

impl Sequencer {
    pub fn new() -> Self {
        let (generation_tx, _) = watch::channel(0);
        Self { generation_tx }
    }

    /// Cancel every pending delay by moving to a new generation
    pub fn cancel_all(&self) {
        self.generation_tx.send_modify(|generation| *generation += 1);
        debug!(
            "⏹️ Sequencer cancelled pending steps (generation {})",
            *self.generation_tx.borrow()
        );
    }

    /// Wait out a named step. Returns `false` if the step was cancelled.
    pub async fn delay(&self, name: &str, duration: Duration) -> bool {
        let mut rx = self.generation_tx.subscribe();
        let my_generation = *rx.borrow();

        let cancelled = async {
            loop {
                if *rx.borrow() > my_generation {
                    return;
                }
                if rx.changed().await.is_err() {
                    // Sender gone: nothing can cancel us anymore
                    std::future::pending::<()>().await;
                }
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = cancelled => {
                debug!("⏹️ Step '{}' cancelled", name);
                false
            }
        }
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}
