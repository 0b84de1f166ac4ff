//! Core matching pipeline
//!
//! Contains the text normalizer, word matcher, progressive sequence matcher,
//! similarity engine and adaptive threshold calculator.

pub mod normalizer;
pub mod progressive;
pub mod similarity;
pub mod threshold;
pub mod word_match;

pub use similarity::{SimilarityEngine, ValidationResult, WordCorrection};
pub use threshold::AdaptiveThreshold;
