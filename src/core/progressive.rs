//! Progressive Sequence Matching
//!
//! Finds the expected sentence embedded anywhere in a longer or noisier
//! utterance ("um so I think the patient is stable") by sliding a window over
//! the spoken token stream and walking both streams forward in lockstep,
//! tolerating exactly one skipped expected token per mismatch.

use crate::config::MatchConfig;
use crate::core::word_match::score_words;

/// Outcome of a window search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowMatch {
    pub matched: bool,
    pub confidence: f32,
}

impl WindowMatch {
    fn none() -> Self {
        Self {
            matched: false,
            confidence: 0.0,
        }
    }
}

/// Does a spoken token count as a match for an expected token inside a window?
fn window_match(spoken: &str, expected: &str, config: &MatchConfig) -> bool {
    score_words(spoken, expected, false) >= config.window_word_threshold
}

/// Search every start offset of the spoken stream for the best-aligned
/// subsequence of the expected stream.
///
/// The skip rule: once alignment has begun, a mismatch may advance the
/// expected index by one and retry the same spoken token. If the retry fails
/// the advance is rolled back entirely, so consecutive mismatches never
/// compound the skip.
pub fn find_best_window(
    spoken: &[String],
    expected: &[String],
    config: &MatchConfig,
) -> WindowMatch {
    if expected.is_empty() {
        return WindowMatch::none();
    }

    let required_ratio = if expected.len() > 5 {
        config.progressive_ratio_long
    } else {
        config.progressive_ratio_short
    };
    let min_required = 2usize.max((expected.len() as f32 * required_ratio).floor() as usize);
    if spoken.len() < min_required {
        return WindowMatch::none();
    }

    let mut best = 0.0f32;
    for start in 0..=(spoken.len() - min_required) {
        let mut matched = 0usize;
        let mut expected_idx = 0usize;

        for spoken_word in &spoken[start..] {
            if expected_idx >= expected.len() {
                break;
            }
            if window_match(spoken_word, &expected[expected_idx], config) {
                matched += 1;
                expected_idx += 1;
            } else if matched > 0
                && expected_idx + 1 < expected.len()
                && window_match(spoken_word, &expected[expected_idx + 1], config)
            {
                // One expected-side skip, kept only because the retry landed
                matched += 1;
                expected_idx += 2;
            }
        }

        let ratio = matched as f32 / expected.len() as f32;
        if ratio >= required_ratio {
            best = best.max(ratio);
        }
    }

    WindowMatch {
        matched: best > 0.0,
        confidence: best,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::normalizer::tokenize;

    fn find(spoken: &str, expected: &str) -> WindowMatch {
        let config = MatchConfig::default();
        find_best_window(&tokenize(spoken), &tokenize(expected), &config)
    }

    #[test]
    fn test_embedded_target_found() {
        let result = find(
            "um so the patient has a fever since yesterday",
            "patient has a fever since yesterday",
        );
        assert!(result.matched);
        assert!(result.confidence >= 0.9);
    }

    #[test]
    fn test_exact_sentence_is_full_confidence() {
        let result = find("the patient is stable", "the patient is stable");
        assert!(result.matched);
        assert!((result.confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_too_few_words_no_match() {
        let result = find("patient", "the patient is stable today");
        assert!(!result.matched);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_extra_spoken_word_tolerated() {
        // The spoken stream carries a word the expected stream lacks; the
        // walker simply consumes it without advancing the expected index.
        let result = find(
            "doctor will review your blood results tomorrow morning",
            "doctor will review blood results tomorrow morning",
        );
        assert!(result.matched);
        assert!((result.confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_single_skip_bridges_one_dropped_word() {
        // The speaker drops "you"; the expected-side skip re-anchors on "in".
        let result = find(
            "the doctor will see in the morning after breakfast",
            "the doctor will see you in the morning after breakfast",
        );
        assert!(result.matched);
        assert!((result.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_consecutive_mismatches_do_not_compound_skip() {
        // After the first failed skip the expected index must be restored, so
        // a later genuine match still aligns to the right token.
        let spoken = tokenize("the nurse blue green checked your temperature chart again");
        let expected = tokenize("the nurse checked your temperature chart again");
        let config = MatchConfig::default();
        let result = find_best_window(&spoken, &expected, &config);
        // 6 of 7 expected words align (all but none are lost to skip drift)
        assert!(result.matched, "skip reset should keep alignment intact");
        assert!(result.confidence >= 6.0 / 7.0 - 1e-6);
    }

    #[test]
    fn test_unrelated_utterance_rejected() {
        let result = find(
            "i would like a cup of coffee please",
            "the patient is stable today",
        );
        assert!(!result.matched);
    }

    #[test]
    fn test_empty_expected_rejected() {
        let config = MatchConfig::default();
        let result = find_best_window(&tokenize("anything"), &[], &config);
        assert!(!result.matched);
    }
}
