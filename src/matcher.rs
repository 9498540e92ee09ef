//! Fuzzy answer matching.
//!
//! A spoken candidate is compared against every accepted answer of a word, first
//! exactly and then by Levenshtein distance.

use crate::corpus::Word;
use strsim::levenshtein;

pub const DEFAULT_THRESHOLD: usize = 2;

/// The accepted answer a candidate resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerMatch<'w> {
    /// The answer exactly as written in the corpus.
    pub variant: &'w str,
    /// Edit distance between the normalised candidate and the variant.
    pub distance: usize,
}

impl AnswerMatch<'_> {
    pub fn is_exact(&self) -> bool {
        self.distance == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyMatcher {
    threshold: usize,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl FuzzyMatcher {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Finds the accepted answer `candidate` stands for, if any.
    ///
    /// Exact matches win outright. Otherwise the variant with the smallest edit
    /// distance is returned when that distance is within the threshold; ties go
    /// to the earlier answer.
    pub fn find<'w>(&self, candidate: &str, word: &'w Word) -> Option<AnswerMatch<'w>> {
        let candidate = normalize(candidate);
        if candidate.is_empty() {
            return None;
        }

        if let Some(variant) = word
            .answers
            .iter()
            .find(|answer| normalize(answer) == candidate)
        {
            return Some(AnswerMatch {
                variant,
                distance: 0,
            });
        }

        let mut best: Option<AnswerMatch<'w>> = None;
        for answer in &word.answers {
            let distance = levenshtein(&candidate, &normalize(answer));
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(AnswerMatch {
                    variant: answer,
                    distance,
                });
            }
        }

        best.filter(|m| m.distance <= self.threshold)
    }

    pub fn is_match(&self, candidate: &str, word: &Word) -> bool {
        self.find(candidate, word).is_some()
    }
}

/// Lowercases and trims. Inner whitespace is left alone.
pub fn normalize(input: &str) -> String {
    input.trim().to_lowercase()
}

/// First whitespace-delimited token of a transcript, if it has one.
pub fn first_token(transcript: &str) -> Option<&str> {
    transcript.split_whitespace().next()
}

/// The answer to reveal when nothing matched.
pub fn canonical_answer(word: &Word) -> &str {
    word.answers.first().map(String::as_str).unwrap_or_default()
}

/// All accepted answers for display, e.g. `"house / home"`.
pub fn answer_display(word: &Word) -> String {
    word.answers.join(" / ")
}
