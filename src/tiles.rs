//! Word-tile input mode
//!
//! Alternative to free speech: the learner assembles the answer from shuffled
//! word tiles. The board knows the correct order, so it can auto-submit once
//! the arrangement is close enough; the assembled sentence still goes through
//! the similarity engine when final validation is required.

use rand::seq::SliceRandom;
use rand::Rng;

/// Fraction of tiles that must sit in their correct slot to auto-submit
const AUTO_SUBMIT_RATIO: f32 = 0.8;

/// One selectable tile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub word: String,
    pub used: bool,
}

/// A shuffled tile board for one expected response
#[derive(Debug, Clone)]
pub struct TileBoard {
    tiles: Vec<Tile>,
    selected: Vec<usize>,
    correct_order: Vec<String>,
}

/// Strip punctuation from a tile word, keeping its display casing
fn tile_word(word: &str) -> String {
    word.chars()
        .filter(|c| !matches!(c, '.' | ',' | '!' | '?' | ';' | ':' | '"' | '(' | ')'))
        .collect()
}

impl TileBoard {
    pub fn new<R: Rng>(expected_response: &str, rng: &mut R) -> Self {
        let words: Vec<String> = expected_response
            .split_whitespace()
            .map(tile_word)
            .filter(|w| !w.is_empty())
            .collect();

        let correct_order: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();

        let mut tiles: Vec<Tile> = words
            .into_iter()
            .map(|word| Tile { word, used: false })
            .collect();
        tiles.shuffle(rng);

        Self {
            tiles,
            selected: Vec::new(),
            correct_order,
        }
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Select an unused tile by board index
    pub fn select(&mut self, index: usize) -> bool {
        match self.tiles.get_mut(index) {
            Some(tile) if !tile.used => {
                tile.used = true;
                self.selected.push(index);
                true
            }
            _ => false,
        }
    }

    /// Return the most recently selected tile to the board
    pub fn undo_last(&mut self) -> bool {
        match self.selected.pop() {
            Some(index) => {
                self.tiles[index].used = false;
                true
            }
            None => false,
        }
    }

    /// The sentence as currently assembled
    pub fn assembled_text(&self) -> String {
        self.selected
            .iter()
            .map(|&i| self.tiles[i].word.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn all_selected(&self) -> bool {
        self.selected.len() >= self.correct_order.len()
    }

    /// Fraction of selected tiles sitting in their correct position
    pub fn correctness_ratio(&self) -> f32 {
        if self.correct_order.is_empty() {
            return 0.0;
        }
        let mut correct = 0usize;
        for (pos, &tile_idx) in self.selected.iter().enumerate() {
            if let Some(wanted) = self.correct_order.get(pos) {
                if *wanted == self.tiles[tile_idx].word.to_lowercase() {
                    correct += 1;
                }
            }
        }
        correct as f32 / self.correct_order.len() as f32
    }

    /// Ready to hand the assembled sentence to grading?
    pub fn auto_submit_ready(&self) -> bool {
        self.all_selected() && self.correctness_ratio() >= AUTO_SUBMIT_RATIO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn board(expected: &str) -> TileBoard {
        let mut rng = StdRng::seed_from_u64(7);
        TileBoard::new(expected, &mut rng)
    }

    fn select_word(board: &mut TileBoard, word: &str) {
        let idx = board
            .tiles()
            .iter()
            .position(|t| !t.used && t.word.eq_ignore_ascii_case(word))
            .unwrap_or_else(|| panic!("tile '{}' not available", word));
        assert!(board.select(idx));
    }

    #[test]
    fn test_tiles_strip_punctuation() {
        let board = board("The patient is stable.");
        assert_eq!(board.tiles().len(), 4);
        assert!(board.tiles().iter().any(|t| t.word == "stable"));
        assert!(board.tiles().iter().all(|t| !t.word.contains('.')));
    }

    #[test]
    fn test_correct_assembly_auto_submits() {
        let mut board = board("The patient is stable");
        for word in ["the", "patient", "is", "stable"] {
            select_word(&mut board, word);
        }
        assert!(board.all_selected());
        assert!((board.correctness_ratio() - 1.0).abs() < 1e-6);
        assert!(board.auto_submit_ready());
        assert_eq!(board.assembled_text().to_lowercase(), "the patient is stable");
    }

    #[test]
    fn test_partial_assembly_not_ready() {
        let mut board = board("The patient is stable");
        select_word(&mut board, "the");
        select_word(&mut board, "patient");
        assert!(!board.auto_submit_ready());
    }

    #[test]
    fn test_wrong_order_below_ratio_blocked() {
        let mut board = board("The patient is stable");
        // Two of four in place (50%) once all are selected
        for word in ["the", "patient", "stable", "is"] {
            select_word(&mut board, word);
        }
        assert!(board.all_selected());
        assert!(board.correctness_ratio() < AUTO_SUBMIT_RATIO);
        assert!(!board.auto_submit_ready());
    }

    #[test]
    fn test_undo_returns_tile() {
        let mut board = board("I agree");
        select_word(&mut board, "i");
        select_word(&mut board, "agree");
        assert!(board.undo_last());
        assert_eq!(board.assembled_text().to_lowercase(), "i");
        let free = board.tiles().iter().filter(|t| !t.used).count();
        assert_eq!(free, 1);
    }

    #[test]
    fn test_double_select_rejected() {
        let mut board = board("I agree");
        let idx = board.tiles().iter().position(|t| t.word.eq_ignore_ascii_case("i")).unwrap();
        assert!(board.select(idx));
        assert!(!board.select(idx));
    }
}
