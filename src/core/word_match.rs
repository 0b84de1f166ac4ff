//! Word-level similarity scoring
//!
//! Pure, stateless scoring of two normalized tokens. Ordered rules: a strong
//! rule firing prevents fallthrough to weaker ones. Thresholds are asymmetric
//! by word length: short words must match exactly, longer words earn fuzzy
//! credit proportional to the information they carry.

use strsim::levenshtein;

/// Articles substitute freely for one another
const ARTICLES: &[&str] = &["a", "an", "the"];

/// Known speech-recognition confusion pairs (checked both directions)
const PHONETIC_PAIRS: &[(&str, &[&str])] = &[
    ("to", &["too", "two"]),
    ("there", &["their", "theyre"]),
    ("your", &["youre"]),
    ("then", &["than"]),
    ("accept", &["except"]),
    ("affect", &["effect"]),
    ("were", &["where"]),
    ("we", &["wee"]),
    ("see", &["sea"]),
    ("be", &["bee"]),
    ("no", &["know"]),
    ("right", &["write"]),
    ("here", &["hear"]),
];

/// Check the phonetic confusion table in both directions
fn phonetically_confusable(a: &str, b: &str) -> bool {
    PHONETIC_PAIRS.iter().any(|(key, values)| {
        (*key == a && values.contains(&b)) || (*key == b && values.contains(&a))
    })
}

/// Character-positional mismatches over the shared prefix, plus the length gap
fn char_budget_diff(a: &str, b: &str) -> usize {
    let mismatches = a
        .chars()
        .zip(b.chars())
        .filter(|(ca, cb)| ca != cb)
        .count();
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    mismatches + len_a.abs_diff(len_b)
}

/// Do the first `n` characters of both words match exactly?
fn shares_prefix(a: &str, b: &str, n: usize) -> bool {
    a.chars().take(n).eq(b.chars().take(n))
}

/// Score the similarity of two tokens in `[0, 1.1]`.
///
/// `position_aligned` grants an exact match a 0.1 bonus for landing in its
/// expected slot; every other rule is symmetric in its arguments.
pub fn score_words(a: &str, b: &str, position_aligned: bool) -> f32 {
    if a == b {
        return if position_aligned { 1.1 } else { 1.0 };
    }

    if phonetically_confusable(a, b) {
        return 0.9;
    }

    if ARTICLES.contains(&a) && ARTICLES.contains(&b) {
        return 0.95;
    }

    let len_a = a.chars().count();
    let len_b = b.chars().count();

    // Short words carry too little signal for fuzzy credit
    if len_a <= 3 || len_b <= 3 {
        return 0.0;
    }

    // Medium words: one character of slack total
    if len_a <= 6 && len_b <= 6 {
        return if char_budget_diff(a, b) <= 1 { 0.85 } else { 0.0 };
    }

    // Longer words: exact prefix over ~75% of the shorter word
    let prefix_len = (len_a.min(len_b) as f32 * 0.75).floor() as usize;
    if prefix_len >= 4 && shares_prefix(a, b, prefix_len) {
        return 0.9;
    }

    // Edit distance, gated so wildly different words score zero
    let max_len = len_a.max(len_b);
    let distance = levenshtein(a, b);
    let max_allowed = 2usize.max((max_len as f32 * 0.25).floor() as usize);
    if distance <= max_allowed {
        (1.0 - distance as f32 / max_len as f32) * 0.9
    } else {
        0.0
    }
}
