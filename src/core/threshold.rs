//! Adaptive acceptance threshold for live recognition
//!
//! Continuous interim recognition is noisier than a final utterance, so its
//! acceptance bar starts lower than the static comparison bar and drops
//! further as sentences grow and as the learner keeps speaking without
//! triggering acceptance.

use std::time::Duration;

use crate::config::LiveConfig;
use crate::core::normalizer;

pub struct AdaptiveThreshold {
    config: LiveConfig,
}

impl AdaptiveThreshold {
    pub fn new(config: LiveConfig) -> Self {
        Self { config }
    }

    /// Acceptance bar for an expected sentence after `elapsed` recording time.
    ///
    /// Clamped to `[min_threshold, base_threshold]`.
    pub fn threshold(&self, expected: &str, elapsed: Duration) -> f32 {
        let config = &self.config;
        let word_count = normalizer::tokenize(expected).len();

        let mut threshold = config.base_threshold;

        if word_count > config.word_count_pivot {
            let reduction = ((word_count - config.word_count_pivot) as f32
                * config.reduction_per_word)
                .min(config.base_threshold - config.min_threshold);
            threshold -= reduction;
        }

        let decay = (elapsed.as_secs_f32() * config.decay_per_second).min(config.max_time_decay);
        threshold -= decay;

        threshold.clamp(config.min_threshold, config.base_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc() -> AdaptiveThreshold {
        AdaptiveThreshold::new(LiveConfig::default())
    }

    #[test]
    fn test_short_sentence_keeps_base() {
        let t = calc().threshold("I agree", Duration::ZERO);
        assert!((t - 0.70).abs() < 1e-6);
    }

    #[test]
    fn test_long_sentence_lowers_bar() {
        // 8 words: 4 past the pivot -> 4 * 0.022 = 0.088 off the base
        let t = calc().threshold(
            "the patient has had a fever since yesterday",
            Duration::ZERO,
        );
        assert!((t - (0.70 - 0.088)).abs() < 1e-6);
    }

    #[test]
    fn test_time_decay_capped() {
        let calc = calc();
        // 5 seconds: 0.04 decay
        let t = calc.threshold("I agree", Duration::from_secs(5));
        assert!((t - (0.70 - 0.04)).abs() < 1e-6);
        // 30 seconds would be 0.24, capped at 0.1
        let t = calc.threshold("I agree", Duration::from_secs(30));
        assert!((t - 0.60).abs() < 1e-6);
    }

    #[test]
    fn test_floor_never_crossed() {
        let long_sentence =
            "this very long sentence keeps going on and on with many many words in total";
        let t = calc().threshold(long_sentence, Duration::from_secs(60));
        assert!(t >= 0.5 - 1e-6);
    }

    #[test]
    fn test_never_exceeds_base() {
        let t = calc().threshold("hi", Duration::ZERO);
        assert!(t <= 0.70 + 1e-6);
    }
}
