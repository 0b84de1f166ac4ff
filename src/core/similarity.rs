//! Similarity Engine
//!
//! Orchestrates the normalizer, word matcher and progressive matcher into a
//! single verdict per utterance: an overall similarity score, the accepted
//! flag, the closest candidate answer, and a word-aligned correction list.
//!
//! Grading never fails: malformed input resolves to a zero-similarity verdict
//! so a turn always produces something the state machine can act on.

use serde::{Deserialize, Serialize};

use crate::config::MatchConfig;
use crate::core::normalizer::{self, format_sentence, normalize, variants};
use crate::core::progressive::find_best_window;
use crate::core::word_match::score_words;

/// One aligned position in the spoken-vs-expected comparison.
///
/// An empty `original` marks a word the learner missed; an empty `correct`
/// marks an extra word the learner added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordCorrection {
    pub original: String,
    pub correct: String,
    pub is_correct: bool,
}

/// Verdict for a single utterance. Immutable, produced fresh per call.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_correct: bool,
    pub similarity: f32,
    pub closest_match: String,
    pub corrected_text: String,
    pub is_progressive_match: bool,
    pub corrections: Vec<WordCorrection>,
}

pub struct SimilarityEngine {
    config: MatchConfig,
}

impl SimilarityEngine {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    /// Compare a spoken utterance against the expected answer.
    pub fn compare(&self, spoken: &str, expected: &str) -> ValidationResult {
        self.compare_with_variations(spoken, expected, &[])
    }

    /// Compare against the expected answer plus alternative accepted phrasings.
    ///
    /// The primary expected answer drives the corrections list; variations only
    /// compete for the similarity score and `closest_match`.
    pub fn compare_with_variations(
        &self,
        spoken: &str,
        expected: &str,
        variations: &[String],
    ) -> ValidationResult {
        let normalized_spoken = normalize(spoken);
        let normalized_expected = normalize(expected);

        let expected_tokens: Vec<String> = normalized_expected
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if expected_tokens.is_empty() {
            // Nothing to grade against; resolve to a rejection, never an error
            return self.zero_verdict(spoken, expected);
        }

        // Exact normalized match against the answer or any variation
        if normalized_spoken == normalized_expected {
            return self.exact_verdict(expected, &expected_tokens);
        }
        for variation in variations {
            if !normalized_spoken.is_empty() && normalized_spoken == normalize(variation) {
                let mut result = self.exact_verdict(variation, &expected_tokens);
                result.corrections =
                    self.align_corrections(&normalized_spoken, &expected_tokens);
                return result;
            }
        }

        let spoken_tokens: Vec<String> = normalized_spoken
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let window = find_best_window(&spoken_tokens, &expected_tokens, &self.config);

        // Best score across the primary answer and all variations
        let mut best_text = expected.to_string();
        let mut best_similarity =
            self.holistic_score(&normalized_spoken, &normalized_expected);
        if window.matched {
            // A strong embedded match overrides weaker holistic comparison
            best_similarity = best_similarity.max(window.confidence);
        }
        for variation in variations {
            let score = self.holistic_score(&normalized_spoken, &normalize(variation));
            if score > best_similarity {
                best_similarity = score;
                best_text = variation.clone();
            }
        }
        let similarity = best_similarity.clamp(0.0, 1.0);

        let threshold = if window.matched {
            self.config.progressive_threshold
        } else {
            self.config.static_threshold
        };
        let is_correct = similarity >= threshold;

        let corrected_text = if is_correct {
            format_sentence(&best_text)
        } else {
            format_sentence(spoken)
        };

        ValidationResult {
            is_correct,
            similarity,
            closest_match: best_text,
            corrected_text,
            is_progressive_match: window.matched,
            corrections: self.align_corrections(&normalized_spoken, &expected_tokens),
        }
    }

    /// Coverage check: did the learner say enough of the sentence?
    ///
    /// Required word coverage scales with target length so long answers cannot
    /// auto-accept off a confident fragment.
    pub fn length_sufficient(&self, spoken: &str, expected: &str) -> bool {
        let spoken_count = normalizer::tokenize(spoken).len();
        let expected_count = normalizer::tokenize(expected).len();
        if expected_count == 0 {
            return false;
        }

        let required = match expected_count {
            0..=2 => 0.9,
            3..=5 => 0.8,
            6..=10 => 0.85,
            _ => 0.9,
        };
        spoken_count as f32 >= expected_count as f32 * required
    }

    fn exact_verdict(&self, matched_text: &str, expected_tokens: &[String]) -> ValidationResult {
        ValidationResult {
            is_correct: true,
            similarity: 1.0,
            closest_match: matched_text.to_string(),
            corrected_text: format_sentence(matched_text),
            is_progressive_match: false,
            corrections: expected_tokens
                .iter()
                .map(|token| WordCorrection {
                    original: token.clone(),
                    correct: token.clone(),
                    is_correct: true,
                })
                .collect(),
        }
    }

    fn zero_verdict(&self, spoken: &str, expected: &str) -> ValidationResult {
        ValidationResult {
            is_correct: false,
            similarity: 0.0,
            closest_match: expected.to_string(),
            corrected_text: format_sentence(spoken),
            is_progressive_match: false,
            corrections: Vec::new(),
        }
    }

    /// Best holistic score across the contraction variants of both strings.
    ///
    /// Each spoken token takes its best word-matcher score over the expected
    /// tokens (with a positional bonus when the indices coincide), bucketed by
    /// strength and divided by the longer word count.
    fn holistic_score(&self, spoken: &str, expected: &str) -> f32 {
        let mut best = 0.0f32;
        for alt_spoken in variants(spoken) {
            for alt_expected in variants(expected) {
                best = best.max(self.variant_pair_score(&alt_spoken, &alt_expected));
            }
        }
        best
    }

    fn variant_pair_score(&self, spoken: &str, expected: &str) -> f32 {
        let words1: Vec<&str> = spoken.split_whitespace().collect();
        let words2: Vec<&str> = expected.split_whitespace().collect();
        if words1.is_empty() || words2.is_empty() {
            return 0.0;
        }

        let mut full = 0.0f32;
        let mut partial = 0.0f32;
        let mut phonetic = 0.0f32;

        for (idx1, word1) in words1.iter().enumerate() {
            let mut best_match = 0.0f32;
            for (idx2, word2) in words2.iter().enumerate() {
                let score = score_words(word1, word2, idx1 == idx2);
                if score > best_match {
                    best_match = score;
                }
            }
            if best_match >= 0.95 {
                full += best_match;
            } else if best_match >= 0.8 {
                partial += best_match;
            } else if best_match >= 0.7 {
                phonetic += best_match;
            }
        }

        let total = full + partial * 0.9 + phonetic * 0.8;
        let max_words = words1.len().max(words2.len()) as f32;
        let mut similarity = total / max_words;

        let count_ratio =
            words1.len().min(words2.len()) as f32 / words1.len().max(words2.len()) as f32;
        if count_ratio > self.config.word_count_bonus_ratio {
            similarity += self.config.word_count_bonus;
        }

        similarity.min(1.0)
    }

    /// Word-level alignment of spoken vs expected tokens via edit-distance
    /// backtrace, yielding aligned pairs plus missing/extra entries.
    fn align_corrections(
        &self,
        normalized_spoken: &str,
        expected_tokens: &[String],
    ) -> Vec<WordCorrection> {
        let spoken_tokens: Vec<&str> = normalized_spoken.split_whitespace().collect();
        let n = spoken_tokens.len();
        let m = expected_tokens.len();

        // cost[i][j]: aligning the first i spoken tokens to the first j expected
        let mut cost = vec![vec![0.0f32; m + 1]; n + 1];
        for (i, row) in cost.iter_mut().enumerate() {
            row[0] = i as f32;
        }
        for j in 0..=m {
            cost[0][j] = j as f32;
        }

        let sub_cost = |s: &str, e: &str| -> f32 {
            let score = score_words(s, e, true);
            if score >= 0.9 {
                0.0
            } else if score_words(s, e, false) >= 0.7 {
                0.5
            } else {
                1.0
            }
        };

        for i in 1..=n {
            for j in 1..=m {
                let substitute =
                    cost[i - 1][j - 1] + sub_cost(spoken_tokens[i - 1], &expected_tokens[j - 1]);
                let extra = cost[i - 1][j] + 1.0;
                let missing = cost[i][j - 1] + 1.0;
                cost[i][j] = substitute.min(extra).min(missing);
            }
        }

        // Backtrace, preferring substitution on ties so pairs stay visible
        let mut corrections = Vec::with_capacity(n.max(m));
        let (mut i, mut j) = (n, m);
        while i > 0 || j > 0 {
            if i > 0 && j > 0 {
                let substitute =
                    cost[i - 1][j - 1] + sub_cost(spoken_tokens[i - 1], &expected_tokens[j - 1]);
                if (cost[i][j] - substitute).abs() < 1e-6 {
                    let spoken_word = spoken_tokens[i - 1];
                    let expected_word = &expected_tokens[j - 1];
                    corrections.push(WordCorrection {
                        original: spoken_word.to_string(),
                        correct: expected_word.clone(),
                        is_correct: score_words(spoken_word, expected_word, true) >= 0.9,
                    });
                    i -= 1;
                    j -= 1;
                    continue;
                }
            }
            if j > 0 && (i == 0 || (cost[i][j] - (cost[i][j - 1] + 1.0)).abs() < 1e-6) {
                corrections.push(WordCorrection {
                    original: String::new(),
                    correct: expected_tokens[j - 1].clone(),
                    is_correct: false,
                });
                j -= 1;
            } else {
                corrections.push(WordCorrection {
                    original: spoken_tokens[i - 1].to_string(),
                    correct: String::new(),
                    is_correct: false,
                });
                i -= 1;
            }
        }
        corrections.reverse();
        corrections
    }
}
