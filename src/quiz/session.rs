use crate::corpus::{Corpus, Word};
use crate::error::CorpusError;
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerOutcome {
    Correct,
    Skipped,
}

/// How one word of the session was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerRecord {
    pub index: usize,
    pub prompt: String,
    /// What the player said, when the word was answered
    pub spoken: Option<String>,
    /// The accepted answer it matched
    pub matched: Option<String>,
    pub outcome: AnswerOutcome,
}

/// One run through the sampled word list.
///
/// The index only moves forward. Each index is resolved at most once, either
/// as correct or as skipped.
#[derive(Debug, Clone)]
pub struct Session {
    words: Vec<Word>,
    words_per_tier: usize,
    current_index: usize,
    correct_indices: BTreeSet<usize>,
    current_resolved: bool,
    active: bool,
    answers: Vec<AnswerRecord>,
    current_streak: u32,
    max_streak: u32,
}

impl Session {
    pub fn new(words: Vec<Word>, words_per_tier: usize) -> Self {
        let active = !words.is_empty();
        Self {
            words,
            words_per_tier,
            current_index: 0,
            correct_indices: BTreeSet::new(),
            current_resolved: false,
            active,
            answers: Vec::new(),
            current_streak: 0,
            max_streak: 0,
        }
    }

    pub fn from_corpus<R: Rng + ?Sized>(
        corpus: &Corpus,
        words_per_tier: usize,
        rng: &mut R,
    ) -> Result<Self, CorpusError> {
        let words = corpus.sample(words_per_tier, rng)?;
        Ok(Self::new(words, words_per_tier))
    }

    /// Marks the current word correct. Returns `false` if it was already resolved.
    pub fn record_correct(&mut self, spoken: &str, matched: &str) -> bool {
        let Some(prompt) = self.unresolved_prompt() else {
            return false;
        };
        self.correct_indices.insert(self.current_index);
        self.current_resolved = true;
        self.current_streak += 1;
        self.max_streak = self.max_streak.max(self.current_streak);
        self.answers.push(AnswerRecord {
            index: self.current_index,
            prompt,
            spoken: Some(spoken.to_string()),
            matched: Some(matched.to_string()),
            outcome: AnswerOutcome::Correct,
        });
        true
    }

    /// Gives up on the current word. Returns `false` if it was already resolved.
    pub fn record_skip(&mut self) -> bool {
        let Some(prompt) = self.unresolved_prompt() else {
            return false;
        };
        self.current_resolved = true;
        self.current_streak = 0;
        self.answers.push(AnswerRecord {
            index: self.current_index,
            prompt,
            spoken: None,
            matched: None,
            outcome: AnswerOutcome::Skipped,
        });
        true
    }

    fn unresolved_prompt(&self) -> Option<String> {
        if !self.active || self.current_resolved {
            return None;
        }
        self.current_word().map(|word| word.text.clone())
    }

    /// Moves to the next word and reports whether the session is now complete.
    pub fn advance(&mut self) -> bool {
        if self.is_complete() {
            return true;
        }
        self.current_index += 1;
        self.current_resolved = false;
        if self.is_complete() {
            self.active = false;
        }
        self.is_complete()
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn current_word(&self) -> Option<&Word> {
        self.words.get(self.current_index)
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words_per_tier(&self) -> usize {
        self.words_per_tier
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_complete(&self) -> bool {
        self.current_index >= self.words.len()
    }

    pub fn is_current_resolved(&self) -> bool {
        self.current_resolved
    }

    /// Accepts more answers for the word on screen.
    pub fn is_open(&self) -> bool {
        self.active && !self.current_resolved && !self.is_complete()
    }

    pub fn is_correct(&self, index: usize) -> bool {
        self.correct_indices.contains(&index)
    }

    pub fn correct_indices(&self) -> &BTreeSet<usize> {
        &self.correct_indices
    }

    pub fn score(&self) -> usize {
        self.correct_indices.len()
    }

    pub fn current_streak(&self) -> u32 {
        self.current_streak
    }

    pub fn max_streak(&self) -> u32 {
        self.max_streak
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::ProficiencyTier;

    fn session() -> Session {
        Session::new(
            vec![
                Word::new("КОШКА", &["cat"], ProficiencyTier::A1),
                Word::new("ДОМ", &["house", "home"], ProficiencyTier::A1),
                Word::new("ВОДА", &["water"], ProficiencyTier::A2),
            ],
            1,
        )
    }

    #[test]
    fn index_resolves_once() {
        let mut s = session();
        assert!(s.record_correct("cat", "cat"));
        assert!(!s.record_correct("cat", "cat"));
        assert!(!s.record_skip());
        assert_eq!(s.score(), 1);
        assert_eq!(s.answers().len(), 1);
    }

    #[test]
    fn skip_is_not_correct() {
        let mut s = session();
        assert!(s.record_skip());
        assert!(!s.is_correct(0));
        assert_eq!(s.answers()[0].outcome, AnswerOutcome::Skipped);
        assert_eq!(s.answers()[0].prompt, "КОШКА");
    }

    #[test]
    fn advancing_past_last_word_completes() {
        let mut s = session();
        assert!(!s.advance());
        assert!(!s.advance());
        assert!(s.is_active());
        assert!(s.advance());
        assert!(s.is_complete());
        assert!(!s.is_active());
        assert_eq!(s.current_word(), None);

        // stays put once complete
        assert!(s.advance());
        assert_eq!(s.current_index(), 3);
        assert!(!s.record_correct("x", "x"));
    }

    #[test]
    fn streak_counts_consecutive_correct_answers() {
        let mut s = session();
        s.record_correct("cat", "cat");
        s.advance();
        s.record_correct("home", "home");
        s.advance();
        assert_eq!(s.current_streak(), 2);
        s.record_skip();
        assert_eq!(s.current_streak(), 0);
        assert_eq!(s.max_streak(), 2);
    }

    #[test]
    fn advance_reopens_next_word() {
        let mut s = session();
        s.record_skip();
        assert!(!s.is_open());
        s.advance();
        assert!(s.is_open());
        assert!(!s.is_current_resolved());
    }
}
