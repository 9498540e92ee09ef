//! Answer arbitration for the word currently on screen.
//!
//! Interim transcripts grow a letter at a time ("c", "ca", "cat"), so an
//! interim candidate is only judged once it has stopped changing for the
//! debounce interval. A candidate that already matches skips the wait, and so
//! does a settled one: a final transcript, or an interim whose first word is
//! followed by a second.

use crate::corpus::Word;
use crate::matcher::{first_token, FuzzyMatcher};
use crate::speech::TranscriptFragment;
use crate::timer::{earliest, Timer};
use log::{debug, trace};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArbiterConfig {
    pub debounce: Duration,
    pub cooldown: Duration,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(400),
            cooldown: Duration::from_millis(400),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbiterPhase {
    /// Waiting for a candidate
    Idle,
    /// A candidate is waiting out the debounce interval
    Pending,
    /// A wrong answer was given; ignoring input until the cooldown ends
    CoolingDown,
    /// Answered correctly; nothing more is accepted for this word
    Correct,
    /// Skipped; nothing more is accepted for this word
    Skipped,
}

/// What the arbiter decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArbiterOutput {
    Correct { spoken: String, variant: String },
    Wrong { spoken: String },
    /// Cooldown over, the same word can be attempted again
    Rearmed,
}

/// Read-only view of the per-word state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArbitrationState {
    pub phase: ArbiterPhase,
    pub pending_candidate: Option<String>,
    pub last_submitted: Option<String>,
    pub cooldown_active: bool,
}

/// Which timer bodies may still act.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Liveness {
    /// The session is running and the current word is unresolved
    pub session_active: bool,
    /// The speech controller is passing fragments on
    pub accepting_input: bool,
}

#[derive(Debug)]
pub struct AnswerArbiter {
    config: ArbiterConfig,
    phase: ArbiterPhase,
    pending_candidate: Option<String>,
    last_submitted: Option<String>,
    debounce: Timer,
    cooldown: Timer,
}

impl AnswerArbiter {
    pub fn new(config: ArbiterConfig) -> Self {
        Self {
            config,
            phase: ArbiterPhase::Idle,
            pending_candidate: None,
            last_submitted: None,
            debounce: Timer::new(),
            cooldown: Timer::new(),
        }
    }

    /// Offer a fragment for the current word.
    ///
    /// Returns a verdict for a matching or settled candidate; otherwise the
    /// candidate waits for [`poll`](Self::poll).
    pub fn on_fragment(
        &mut self,
        fragment: &TranscriptFragment,
        word: &Word,
        matcher: &FuzzyMatcher,
        now: Instant,
    ) -> Option<ArbiterOutput> {
        if !self.is_open() {
            trace!("Ignoring '{}' in phase {:?}", fragment.text, self.phase);
            return None;
        }

        let candidate = first_token(&fragment.text)?;
        if self.last_submitted.as_deref() == Some(candidate) {
            trace!("Ignoring duplicate candidate '{}'", candidate);
            return None;
        }
        self.last_submitted = Some(candidate.to_string());

        if let Some(found) = matcher.find(candidate, word) {
            debug!(
                "Fast path: '{}' matches '{}' ({:?} fragment)",
                candidate, found.variant, fragment.finality
            );
            self.debounce.cancel();
            self.pending_candidate = None;
            self.phase = ArbiterPhase::Correct;
            return Some(ArbiterOutput::Correct {
                spoken: candidate.to_string(),
                variant: found.variant.to_string(),
            });
        }

        let settled = fragment.is_final() || fragment.text.split_whitespace().nth(1).is_some();
        if settled {
            self.debounce.cancel();
            self.pending_candidate = None;
            return Some(self.resolve(candidate.to_string(), word, matcher, now));
        }

        trace!("Candidate '{}' pending", candidate);
        self.pending_candidate = Some(candidate.to_string());
        self.phase = ArbiterPhase::Pending;
        self.debounce.schedule(now, self.config.debounce);
        None
    }

    /// Run whichever timer is due.
    pub fn poll(
        &mut self,
        now: Instant,
        word: &Word,
        matcher: &FuzzyMatcher,
        live: Liveness,
    ) -> Option<ArbiterOutput> {
        if self.cooldown.fire(now) {
            if self.phase == ArbiterPhase::CoolingDown && live.session_active {
                self.phase = ArbiterPhase::Idle;
                self.pending_candidate = None;
                self.last_submitted = None;
                debug!("Cooldown over, listening again");
                return Some(ArbiterOutput::Rearmed);
            }
            return None;
        }

        if self.debounce.fire(now) {
            let candidate = self.pending_candidate.take();
            if self.phase != ArbiterPhase::Pending {
                return None;
            }
            if !live.session_active || !live.accepting_input {
                trace!("Stale debounce ignored");
                self.phase = ArbiterPhase::Idle;
                return None;
            }
            return candidate.map(|spoken| self.resolve(spoken, word, matcher, now));
        }

        None
    }

    fn resolve(
        &mut self,
        spoken: String,
        word: &Word,
        matcher: &FuzzyMatcher,
        now: Instant,
    ) -> ArbiterOutput {
        match matcher.find(&spoken, word) {
            Some(found) => {
                debug!("'{}' accepted as '{}'", spoken, found.variant);
                self.phase = ArbiterPhase::Correct;
                ArbiterOutput::Correct {
                    variant: found.variant.to_string(),
                    spoken,
                }
            }
            None => {
                debug!("'{}' rejected for '{}'", spoken, word.text);
                self.phase = ArbiterPhase::CoolingDown;
                self.cooldown.schedule(now, self.config.cooldown);
                ArbiterOutput::Wrong { spoken }
            }
        }
    }

    /// Give up on the word without consulting the matcher.
    pub fn skip(&mut self) {
        self.clear();
        self.phase = ArbiterPhase::Skipped;
    }

    /// The word was answered through another path.
    pub fn settle(&mut self) {
        self.clear();
        self.phase = ArbiterPhase::Correct;
    }

    /// Fresh state for a new word.
    pub fn reset(&mut self) {
        self.clear();
        self.phase = ArbiterPhase::Idle;
    }

    fn clear(&mut self) {
        self.debounce.cancel();
        self.cooldown.cancel();
        self.pending_candidate = None;
        self.last_submitted = None;
    }

    fn is_open(&self) -> bool {
        matches!(self.phase, ArbiterPhase::Idle | ArbiterPhase::Pending)
    }

    pub fn phase(&self) -> ArbiterPhase {
        self.phase
    }

    pub fn state(&self) -> ArbitrationState {
        ArbitrationState {
            phase: self.phase,
            pending_candidate: self.pending_candidate.clone(),
            last_submitted: self.last_submitted.clone(),
            cooldown_active: self.phase == ArbiterPhase::CoolingDown,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        earliest([self.debounce.deadline(), self.cooldown.deadline()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::ProficiencyTier;

    const LIVE: Liveness = Liveness {
        session_active: true,
        accepting_input: true,
    };

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn cat() -> Word {
        Word::new("КОШКА", &["cat"], ProficiencyTier::A1)
    }

    fn water() -> Word {
        Word::new("ВОДА", &["water"], ProficiencyTier::A1)
    }

    fn arbiter() -> AnswerArbiter {
        AnswerArbiter::new(ArbiterConfig::default())
    }

    #[test]
    fn growing_transcript_resolves_as_soon_as_it_matches() {
        let t0 = Instant::now();
        let word = water();
        let matcher = FuzzyMatcher::default();
        let mut a = arbiter();

        let w = TranscriptFragment::interim("w");
        assert_eq!(a.on_fragment(&w, &word, &matcher, t0), None);
        let wa = TranscriptFragment::interim("wa");
        assert_eq!(a.on_fragment(&wa, &word, &matcher, t0 + ms(100)), None);
        assert_eq!(a.state().pending_candidate.as_deref(), Some("wa"));
        assert_eq!(a.next_deadline(), Some(t0 + ms(500)));

        let wat = TranscriptFragment::interim("wat");
        let verdict = a.on_fragment(&wat, &word, &matcher, t0 + ms(200));
        assert_eq!(
            verdict,
            Some(ArbiterOutput::Correct {
                spoken: "wat".into(),
                variant: "water".into()
            })
        );
        assert_eq!(a.next_deadline(), None);
        assert_eq!(a.poll(t0 + ms(2000), &word, &matcher, LIVE), None);
    }

    #[test]
    fn settled_candidate_is_judged_after_debounce() {
        let t0 = Instant::now();
        let word = water();
        let matcher = FuzzyMatcher::default();
        let mut a = arbiter();

        a.on_fragment(&TranscriptFragment::interim("w"), &word, &matcher, t0);
        a.on_fragment(&TranscriptFragment::interim("wa"), &word, &matcher, t0 + ms(100));

        // the first deadline was replaced
        assert_eq!(a.poll(t0 + ms(450), &word, &matcher, LIVE), None);
        assert_eq!(
            a.poll(t0 + ms(500), &word, &matcher, LIVE),
            Some(ArbiterOutput::Wrong { spoken: "wa".into() })
        );
    }

    #[test]
    fn debounce_resolves_latest_candidate_once() {
        let t0 = Instant::now();
        let word = Word::new("СЛОН", &["elephant"], ProficiencyTier::B1);
        let matcher = FuzzyMatcher::default();
        let mut a = arbiter();

        a.on_fragment(&TranscriptFragment::interim("c"), &word, &matcher, t0);
        a.on_fragment(&TranscriptFragment::interim("ca"), &word, &matcher, t0 + ms(50));
        a.on_fragment(&TranscriptFragment::interim("cat"), &word, &matcher, t0 + ms(100));

        let mut verdicts = Vec::new();
        for step in 0..20 {
            if let Some(v) = a.poll(t0 + ms(step * 50), &word, &matcher, LIVE) {
                verdicts.push(v);
            }
        }
        assert_eq!(verdicts[0], ArbiterOutput::Wrong { spoken: "cat".into() });
        assert_eq!(verdicts.len(), 2, "one verdict, then the cooldown rearm");
        assert_eq!(verdicts[1], ArbiterOutput::Rearmed);
    }

    #[test]
    fn matching_candidate_takes_fast_path() {
        let t0 = Instant::now();
        let word = cat();
        let matcher = FuzzyMatcher::default();
        let mut a = arbiter();

        let verdict = a.on_fragment(&TranscriptFragment::interim("cat"), &word, &matcher, t0);
        assert_eq!(
            verdict,
            Some(ArbiterOutput::Correct {
                spoken: "cat".into(),
                variant: "cat".into()
            })
        );
        assert_eq!(a.next_deadline(), None);

        // late fragments are frozen out
        assert_eq!(
            a.on_fragment(&TranscriptFragment::final_text("cat"), &word, &matcher, t0),
            None
        );
        assert_eq!(
            a.on_fragment(&TranscriptFragment::final_text("dog"), &word, &matcher, t0),
            None
        );
    }

    #[test]
    fn fuzzy_match_also_takes_fast_path() {
        let t0 = Instant::now();
        let word = cat();
        let matcher = FuzzyMatcher::default();
        let mut a = arbiter();

        let verdict = a.on_fragment(&TranscriptFragment::interim("cta"), &word, &matcher, t0);
        assert!(matches!(verdict, Some(ArbiterOutput::Correct { .. })));
    }

    #[test]
    fn only_first_token_is_considered() {
        let t0 = Instant::now();
        let word = cat();
        let matcher = FuzzyMatcher::default();
        let mut a = arbiter();

        let verdict = a.on_fragment(
            &TranscriptFragment::final_text("  Cat is my answer"),
            &word,
            &matcher,
            t0,
        );
        assert_eq!(
            verdict,
            Some(ArbiterOutput::Correct {
                spoken: "Cat".into(),
                variant: "cat".into()
            })
        );
    }

    #[test]
    fn final_transcript_is_judged_without_waiting() {
        let t0 = Instant::now();
        let word = cat();
        let matcher = FuzzyMatcher::default();
        let mut a = arbiter();

        let dog = TranscriptFragment::final_text("dog");
        assert_eq!(
            a.on_fragment(&dog, &word, &matcher, t0),
            Some(ArbiterOutput::Wrong { spoken: "dog".into() })
        );
        assert_eq!(a.phase(), ArbiterPhase::CoolingDown);
        assert_eq!(a.next_deadline(), Some(t0 + ms(400)));
    }

    #[test]
    fn second_spoken_word_settles_the_first() {
        let t0 = Instant::now();
        let word = cat();
        let matcher = FuzzyMatcher::default();
        let mut a = arbiter();

        a.on_fragment(&TranscriptFragment::interim("dog"), &word, &matcher, t0);
        assert_eq!(a.phase(), ArbiterPhase::Pending);

        let dog_is = TranscriptFragment::interim("dog is");
        assert_eq!(
            a.on_fragment(&dog_is, &word, &matcher, t0),
            None,
            "same first word as the pending candidate"
        );

        let mut b = arbiter();
        assert_eq!(
            b.on_fragment(&dog_is, &word, &matcher, t0),
            Some(ArbiterOutput::Wrong { spoken: "dog".into() })
        );
        assert_eq!(b.state().pending_candidate, None);
    }

    #[test]
    fn duplicate_submission_is_ignored() {
        let t0 = Instant::now();
        let word = cat();
        let matcher = FuzzyMatcher::default();
        let mut a = arbiter();

        let dog = TranscriptFragment::interim("dog");
        a.on_fragment(&dog, &word, &matcher, t0);
        a.on_fragment(&dog, &word, &matcher, t0 + ms(300));

        // the duplicate did not push the deadline back
        assert_eq!(a.next_deadline(), Some(t0 + ms(400)));
        let verdicts: Vec<_> = (0..10)
            .filter_map(|i| a.poll(t0 + ms(400 + i * 10), &word, &matcher, LIVE))
            .collect();
        assert_eq!(verdicts, vec![ArbiterOutput::Wrong { spoken: "dog".into() }]);
    }

    #[test]
    fn wrong_answer_cools_down_then_allows_retry() {
        let t0 = Instant::now();
        let word = cat();
        let matcher = FuzzyMatcher::default();
        let mut a = arbiter();

        let dog = TranscriptFragment::final_text("dog");
        assert_eq!(
            a.on_fragment(&dog, &word, &matcher, t0),
            Some(ArbiterOutput::Wrong { spoken: "dog".into() })
        );
        assert!(a.state().cooldown_active);

        // ignored during cooldown
        let cat = TranscriptFragment::final_text("cat");
        assert_eq!(a.on_fragment(&cat, &word, &matcher, t0 + ms(100)), None);

        assert_eq!(
            a.poll(t0 + ms(400), &word, &matcher, LIVE),
            Some(ArbiterOutput::Rearmed)
        );
        let state = a.state();
        assert_eq!(state.phase, ArbiterPhase::Idle);
        assert_eq!(state.last_submitted, None);
        assert_eq!(state.pending_candidate, None);

        // the same wrong word can be tried again
        assert_eq!(
            a.on_fragment(&dog, &word, &matcher, t0 + ms(500)),
            Some(ArbiterOutput::Wrong { spoken: "dog".into() })
        );
    }

    #[test]
    fn skip_cancels_pending_candidate() {
        let t0 = Instant::now();
        let word = cat();
        let matcher = FuzzyMatcher::default();
        let mut a = arbiter();

        a.on_fragment(&TranscriptFragment::interim("do"), &word, &matcher, t0);
        a.skip();

        assert_eq!(a.phase(), ArbiterPhase::Skipped);
        assert_eq!(a.next_deadline(), None);
        assert_eq!(a.poll(t0 + ms(1000), &word, &matcher, LIVE), None);
        assert_eq!(
            a.on_fragment(&TranscriptFragment::final_text("cat"), &word, &matcher, t0),
            None
        );

        a.reset();
        assert_eq!(a.phase(), ArbiterPhase::Idle);
    }

    #[test]
    fn stale_debounce_is_inert() {
        let t0 = Instant::now();
        let word = cat();
        let matcher = FuzzyMatcher::default();
        let mut a = arbiter();

        a.on_fragment(&TranscriptFragment::interim("dog"), &word, &matcher, t0);
        let paused = Liveness {
            session_active: true,
            accepting_input: false,
        };
        assert_eq!(a.poll(t0 + ms(400), &word, &matcher, paused), None);
        assert_eq!(a.phase(), ArbiterPhase::Idle);
    }
}
