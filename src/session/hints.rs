//! Hint escalation
//!
//! Attempt 1 hints at the shape of the answer, attempt 2 half-reveals it.
//! There is no attempt-3 hint: the third failure forces the full reveal.

use rand::seq::SliceRandom;
use rand::Rng;

/// Praise lines for accepted answers
pub const SUCCESS_PHRASES: &[&str] = &[
    "Great job!",
    "Excellent!",
    "Perfect!",
    "Well done!",
    "That's right!",
    "Exactly!",
];

pub fn pick_success<R: Rng>(rng: &mut R) -> &'static str {
    SUCCESS_PHRASES.choose(rng).copied().unwrap_or("Well done!")
}

/// Build the hint text for the given attempt number (1-based)
pub fn generate_hint(answer: &str, attempt: u32) -> String {
    let words: Vec<&str> = answer.split_whitespace().collect();
    match attempt {
        1 => {
            if words.len() <= 2 {
                // Too short to reveal a whole word; hint at the shape instead
                let first_letter = answer
                    .trim()
                    .chars()
                    .next()
                    .map(|c| c.to_uppercase().to_string())
                    .unwrap_or_default();
                format!(
                    "💡 The answer begins with \"{}\" and has {} characters total",
                    first_letter,
                    answer.trim().chars().count()
                )
            } else {
                format!(
                    "💡 The sentence starts with \"{}\" and has {} words",
                    words.first().copied().unwrap_or(""),
                    words.len()
                )
            }
        }
        _ => format!("🎯 Try this one: {}", masked_answer(answer)),
    }
}

/// Reveal roughly the first half of each word, masking the rest
pub fn masked_answer(answer: &str) -> String {
    answer
        .split_whitespace()
        .map(|word| {
            let len = word.chars().count();
            if len <= 2 {
                return word.to_string();
            }
            let shown = len.div_ceil(2);
            let revealed: String = word.chars().take(shown).collect();
            format!("{}{}", revealed, "_".repeat(len - shown))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_first_hint_short_answer() {
        let hint = generate_hint("I agree", 1);
        assert!(hint.contains("\"I\""));
        assert!(hint.contains("7 characters"));
    }

    #[test]
    fn test_first_hint_long_answer() {
        let hint = generate_hint("The patient is stable", 1);
        assert!(hint.contains("\"The\""));
        assert!(hint.contains("4 words"));
    }

    #[test]
    fn test_second_hint_masks_half() {
        assert_eq!(masked_answer("stable"), "sta___");
        assert_eq!(masked_answer("is"), "is");
        assert_eq!(masked_answer("The patient"), "Th_ pati___");
        let hint = generate_hint("The patient is stable", 2);
        assert!(hint.starts_with("🎯"));
        assert!(hint.contains("pati___"));
    }

    #[test]
    fn test_success_phrase_from_pool() {
        let mut rng = StdRng::seed_from_u64(1);
        let phrase = pick_success(&mut rng);
        assert!(SUCCESS_PHRASES.contains(&phrase));
    }
}
