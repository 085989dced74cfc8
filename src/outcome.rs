//! Score classification.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic outcome of one screened row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Outcome {
    /// No candidate was found, or the sentinel "nothing found" score.
    Clear,
    /// A candidate scored below the blocking threshold.
    Hit,
    /// A candidate scored at or above the blocking threshold.
    Match,
}

impl fmt::Display for Outcome {
    /// Renders the labels used in the output CSV's `Result` column.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Clear => write!(f, "Clear"),
            Outcome::Hit => write!(f, "Hit"),
            Outcome::Match => write!(f, "MATCH"),
        }
    }
}

/// Classify a candidate score against the blocking threshold.
///
/// A negative score is the "no candidate found" sentinel and is always Clear,
/// regardless of the threshold. Scores at or above the threshold are Match;
/// anything in between is a Hit worth reviewing.
pub fn classify(score: f64, threshold: f64) -> Outcome {
    if score < 0.0 {
        return Outcome::Clear;
    }
    if score >= threshold {
        return Outcome::Match;
    }
    Outcome::Hit
}
