//! Text Normalization
//!
//! Canonicalizes raw utterances and expected answers into a comparable token
//! stream before any similarity scoring happens. Handles case, punctuation,
//! recognition filler words and contraction folding.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

/// Standalone tokens speech recognition tends to insert
const FILLER_WORDS: &[&str] = &["um", "uh", "eh", "ah", "like", "well", "so"];

/// Contraction folds (apostrophe already stripped) and their expansions
const CONTRACTIONS: &[(&str, &str)] = &[
    ("im", "i am"),
    ("ive", "i have"),
    ("id", "i would"),
    ("ill", "i will"),
    ("youre", "you are"),
    ("youve", "you have"),
    ("youd", "you would"),
    ("youll", "you will"),
    ("hes", "he is"),
    ("shes", "she is"),
    ("its", "it is"),
    ("theyre", "they are"),
    ("weve", "we have"),
    ("theyve", "they have"),
    ("dont", "do not"),
    ("cant", "cannot"),
    ("wont", "will not"),
    ("isnt", "is not"),
    ("arent", "are not"),
    ("wasnt", "was not"),
    ("werent", "were not"),
    ("havent", "have not"),
    ("hasnt", "has not"),
    ("hadnt", "had not"),
    ("doesnt", "does not"),
    ("didnt", "did not"),
    ("shouldnt", "should not"),
    ("wouldnt", "would not"),
    ("couldnt", "could not"),
];

lazy_static! {
    static ref PUNCT_RE: Regex = Regex::new(r#"[.,!?;:'"()]"#).expect("punctuation regex");
    static ref EXPANSIONS: HashMap<&'static str, &'static str> =
        CONTRACTIONS.iter().copied().collect();
    static ref FOLD_RES: Vec<(Regex, &'static str)> = CONTRACTIONS
        .iter()
        .map(|(fold, full)| {
            let re = Regex::new(&format!(r"\b{}\b", full)).expect("contraction regex");
            (re, *fold)
        })
        .collect();
    static ref QUESTION_RE: Regex = Regex::new(
        r"(?i)^(what|where|when|why|how|who|which|whose|whom|are|is|can|could|would|will|does|do|did|has|have|should|shall|may|might)\b"
    )
    .expect("question regex");
}

/// Normalize text for comparison: lowercase, strip punctuation, collapse
/// whitespace, drop filler words.
///
/// Idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = PUNCT_RE.replace_all(&lowered, "");

    let tokens: Vec<&str> = stripped.split_whitespace().collect();
    let mut kept: Vec<&str> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        // "you know" is a two-token filler
        if tokens[i] == "you" && i + 1 < tokens.len() && tokens[i + 1] == "know" {
            i += 2;
            continue;
        }
        if FILLER_WORDS.contains(&tokens[i]) {
            i += 1;
            continue;
        }
        kept.push(tokens[i]);
        i += 1;
    }
    kept.join(" ")
}

/// Split an already-normalized string into tokens
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Replace folded contractions with their full forms ("dont" -> "do not")
pub fn expand_contractions(text: &str) -> String {
    text.split_whitespace()
        .map(|w| EXPANSIONS.get(w).copied().unwrap_or(w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Replace full forms with folded contractions ("do not" -> "dont")
pub fn contract_phrases(text: &str) -> String {
    let mut out = text.to_string();
    for (re, fold) in FOLD_RES.iter() {
        out = re.replace_all(&out, *fold).into_owned();
    }
    out
}

/// Comparison variants of a normalized string: as-is, contractions expanded,
/// contractions folded. Deduplicated, original form first.
pub fn variants(normalized: &str) -> Vec<String> {
    let mut out = vec![normalized.to_string()];
    for alt in [expand_contractions(normalized), contract_phrases(normalized)] {
        if !out.contains(&alt) {
            out.push(alt);
        }
    }
    out
}

/// Format a sentence for display: collapse whitespace, capitalize, ensure
/// terminal punctuation (question mark when it opens with an interrogative).
pub fn format_sentence(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return collapsed;
    }

    let mut formatted = collapsed;
    if !formatted.ends_with(['.', '!', '?']) {
        if QUESTION_RE.is_match(&formatted) {
            formatted.push('?');
        } else {
            formatted.push('.');
        }
    }

    let mut chars = formatted.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => formatted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_case_and_punctuation() {
        assert_eq!(normalize("Hello, World!"), normalize("hello world"));
        assert_eq!(normalize("I'm fine."), "im fine");
    }

    #[test]
    fn test_normalize_idempotent() {
        let inputs = [
            "Um, well... I think so!",
            "The patient is stable",
            "you know it's FINE",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_normalize_strips_fillers() {
        assert_eq!(
            normalize("um so the patient has a fever"),
            "the patient has a fever"
        );
        assert_eq!(normalize("well you know I agree"), "i agree");
    }

    #[test]
    fn test_filler_inside_word_survives() {
        // "so" embedded in "sore", "ah" in "ahead"
        assert_eq!(normalize("my throat is sore"), "my throat is sore");
        assert_eq!(normalize("go ahead"), "go ahead");
    }

    #[test]
    fn test_contraction_variants() {
        let v = variants("im not sure");
        assert!(v.contains(&"im not sure".to_string()));
        assert!(v.contains(&"i am not sure".to_string()));

        let v = variants("i am not sure");
        assert!(v.contains(&"im not sure".to_string()));
    }

    #[test]
    fn test_expand_and_contract_roundtrip() {
        assert_eq!(expand_contractions("dont worry"), "do not worry");
        assert_eq!(contract_phrases("do not worry"), "dont worry");
    }

    #[test]
    fn test_format_sentence() {
        assert_eq!(format_sentence("the patient is stable"), "The patient is stable.");
        assert_eq!(format_sentence("how are you feeling"), "How are you feeling?");
        assert_eq!(format_sentence("It hurts!"), "It hurts!");
        assert_eq!(format_sentence(""), "");
    }
}
