//! Question pairs and the shared bank rounds draw from.

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// The two prompts of one round: what everyone is asked, and the
/// near-miss the impostor gets instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPair {
    pub normal: String,
    pub impostor: String,
}

impl QuestionPair {
    pub fn new(normal: impl Into<String>, impostor: impl Into<String>) -> Self {
        Self {
            normal: normal.into(),
            impostor: impostor.into(),
        }
    }

    /// The `question` text sent to one participant.
    pub fn prompt_for(&self, is_impostor: bool) -> String {
        if is_impostor {
            format!("You're the impostor. Your question is: {}", self.impostor)
        } else {
            format!("Your question is: {}", self.normal)
        }
    }
}

/// The question pairs loaded at startup, shared by every lobby.
///
/// Cloning is cheap; clones share one immutable list.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    pairs: Arc<[QuestionPair]>,
}

impl QuestionBank {
    pub fn new(pairs: Vec<QuestionPair>) -> Self {
        Self {
            pairs: pairs.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Draws one pair uniformly at random, or `None` if the bank is empty.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<QuestionPair> {
        if self.pairs.is_empty() {
            return None;
        }
        Some(self.pairs[rng.random_range(0..self.pairs.len())].clone())
    }
}

impl From<Vec<QuestionPair>> for QuestionBank {
    fn from(pairs: Vec<QuestionPair>) -> Self {
        Self::new(pairs)
    }
}
