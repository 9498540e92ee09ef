//! The game loop state: one quiz run from the first word to the result.
//!
//! `QuizGame` owns the speech controller, the arbiter and the session and is
//! driven entirely from outside: engine events through
//! [`handle_source_event`](QuizGame::handle_source_event), player actions
//! through [`skip_word`](QuizGame::skip_word) and friends, and time through
//! [`tick`](QuizGame::tick). Everything it wants to tell the host is queued
//! as a [`GameEvent`].

use super::arbiter::{AnswerArbiter, ArbiterOutput, ArbitrationState, Liveness};
use super::scoring::{compute_result, level_breakdown, live_tier, LevelResult, UserLevelResult};
use super::session::Session;
use crate::corpus::{Corpus, ProficiencyTier, Word};
use crate::error::{QuizError, SpeechError};
use crate::matcher::{answer_display, FuzzyMatcher};
use crate::settings::QuizSettings;
use crate::speech::{
    SourceEvent, SpeechEvent, SpeechSessionController, SpeechState, TranscriptionSource,
};
use crate::timer::{earliest, Timer};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum GameEvent {
    Started {
        total_words: usize,
    },
    WordShown {
        index: usize,
        prompt: String,
        tier: ProficiencyTier,
    },
    Correct {
        index: usize,
        spoken: String,
        matched: String,
    },
    Wrong {
        index: usize,
        spoken: String,
    },
    Skipped {
        index: usize,
        answer: String,
    },
    /// The progress display should animate and then call `next_word`.
    AdvanceRequested {
        index: usize,
    },
    Completed {
        result: UserLevelResult,
    },
    SpeechError {
        message: String,
        fatal: bool,
    },
}

pub struct QuizGame<S: TranscriptionSource> {
    settings: QuizSettings,
    corpus: Corpus,
    matcher: FuzzyMatcher,
    speech: SpeechSessionController<S>,
    arbiter: AnswerArbiter,
    session: Option<Session>,
    result: Option<UserLevelResult>,

    /// Opens speech input after the warm-up or a word change
    input_gate: Timer,

    events: VecDeque<GameEvent>,
    last_error: Option<SpeechError>,
    rng: StdRng,
}

impl<S: TranscriptionSource> QuizGame<S> {
    pub fn new(settings: QuizSettings, corpus: Corpus, source: S) -> Self {
        Self::with_rng(settings, corpus, source, StdRng::from_os_rng())
    }

    /// Same as [`new`](Self::new) with a caller-provided RNG for reproducible word draws.
    pub fn with_rng(mut settings: QuizSettings, corpus: Corpus, source: S, rng: StdRng) -> Self {
        settings.normalize();
        let speech = SpeechSessionController::new(source, settings.speech_config());
        let last_error = if speech.is_supported() {
            None
        } else {
            Some(SpeechError::Unsupported)
        };

        Self {
            matcher: FuzzyMatcher::new(settings.levenshtein_threshold),
            arbiter: AnswerArbiter::new(settings.arbiter_config()),
            speech,
            settings,
            corpus,
            session: None,
            result: None,
            input_gate: Timer::new(),
            events: VecDeque::new(),
            last_error,
            rng,
        }
    }

    /// Draw a fresh session and start listening. Any running game is discarded.
    pub fn start_game(&mut self, now: Instant) -> Result<(), QuizError> {
        let session =
            Session::from_corpus(&self.corpus, self.settings.words_per_tier, &mut self.rng)?;

        if self.speech.is_session_active() {
            self.speech.end_session();
        }
        self.arbiter.reset();
        self.input_gate.cancel();
        self.result = None;

        info!("Starting quiz with {} words", session.len());
        self.events.push_back(GameEvent::Started {
            total_words: session.len(),
        });
        self.session = Some(session);

        match self.speech.start_session(now) {
            Ok(()) => self
                .input_gate
                .schedule(now, self.settings.warmup_delay()),
            Err(e) => {
                warn!("Speech input unavailable: {}", e);
                self.report_error(e);
            }
        }

        self.announce_current_word();
        Ok(())
    }

    /// Stop listening and freeze the session where it is.
    pub fn end_game(&mut self) {
        self.speech.end_session();
        self.arbiter.reset();
        self.input_gate.cancel();
        if let Some(session) = self.session.as_mut() {
            if session.is_active() {
                info!("Quiz ended at word {}", session.current_index());
            }
            session.deactivate();
        }
    }

    pub fn handle_source_event(&mut self, event: SourceEvent, now: Instant) {
        if let Some(event) = self.speech.handle_source_event(event, now) {
            self.on_speech_event(event, now);
        }
    }

    fn on_speech_event(&mut self, event: SpeechEvent, now: Instant) {
        match event {
            SpeechEvent::Fragment(fragment) => {
                let Some(session) = self.session.as_ref() else {
                    return;
                };
                if !session.is_open() {
                    return;
                }
                let Some(word) = session.current_word() else {
                    return;
                };
                if let Some(output) = self.arbiter.on_fragment(&fragment, word, &self.matcher, now)
                {
                    self.apply_arbitration(output);
                }
            }
            SpeechEvent::Error(e) => self.report_error(e),
        }
    }

    fn report_error(&mut self, e: SpeechError) {
        self.events.push_back(GameEvent::SpeechError {
            message: e.to_string(),
            fatal: e.is_fatal(),
        });
        self.last_error = Some(e);
    }

    fn apply_arbitration(&mut self, output: ArbiterOutput) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let index = session.current_index();

        match output {
            ArbiterOutput::Correct { spoken, variant } => {
                if !session.record_correct(&spoken, &variant) {
                    return;
                }
                info!("Word {} correct: '{}' -> '{}'", index, spoken, variant);
                self.speech.pause_input();
                self.input_gate.cancel();
                self.events.push_back(GameEvent::Correct {
                    index,
                    spoken,
                    matched: variant,
                });
                self.events.push_back(GameEvent::AdvanceRequested { index });
            }
            ArbiterOutput::Wrong { spoken } => {
                debug!("Word {} wrong: '{}'", index, spoken);
                self.speech.pause_input();
                self.events.push_back(GameEvent::Wrong { index, spoken });
            }
            ArbiterOutput::Rearmed => {
                if session.is_open() {
                    self.speech.reset_transcript();
                    self.speech.resume_input();
                }
            }
        }
    }

    /// Fire every timer that is due at `now`.
    pub fn tick(&mut self, now: Instant) {
        while let Some(deadline) = self.next_deadline() {
            if deadline > now {
                break;
            }
            self.fire_due(now);
        }
    }

    fn fire_due(&mut self, now: Instant) {
        if let Some(event) = self.speech.poll(now) {
            self.on_speech_event(event, now);
        }

        if self.input_gate.fire(now) {
            self.open_input();
        }

        let output = match self.session.as_ref().and_then(Session::current_word) {
            Some(word) => {
                let live = Liveness {
                    session_active: self.session.as_ref().is_some_and(Session::is_open),
                    accepting_input: self.speech.is_accepting_input(),
                };
                self.arbiter.poll(now, word, &self.matcher, live)
            }
            None => {
                self.arbiter.reset();
                None
            }
        };
        if let Some(output) = output {
            self.apply_arbitration(output);
        }
    }

    fn open_input(&mut self) {
        let open = self.session.as_ref().is_some_and(Session::is_open);
        if open && self.speech.is_session_active() {
            self.speech.reset_transcript();
            self.speech.resume_input();
        }
    }

    /// Give up on the current word. Returns `false` if it was already resolved.
    pub fn skip_word(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.is_open() {
            return false;
        }
        let index = session.current_index();
        let answer = session.current_word().map(answer_display).unwrap_or_default();

        self.arbiter.skip();
        self.input_gate.cancel();
        self.speech.pause_input();
        self.speech.reset_transcript();
        session.record_skip();

        info!("Word {} skipped", index);
        self.events.push_back(GameEvent::Skipped { index, answer });
        self.events.push_back(GameEvent::AdvanceRequested { index });
        true
    }

    /// Move past the current word, finishing the game after the last one.
    /// The word must have been answered or skipped first.
    ///
    /// Hosts call this once the progress animation requested by
    /// [`GameEvent::AdvanceRequested`] has played.
    pub fn next_word(&mut self, now: Instant) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.is_active() {
            return false;
        }
        if !session.is_current_resolved() {
            debug!("Word {} is still open, not advancing", session.current_index());
            return false;
        }

        self.arbiter.reset();
        self.input_gate.cancel();
        self.speech.pause_input();
        self.speech.reset_transcript();

        if session.advance() {
            self.speech.end_session();
            self.finish();
        } else {
            self.input_gate
                .schedule(now, self.settings.protection_delay());
            self.announce_current_word();
        }
        true
    }

    /// Check a typed answer immediately, without debounce.
    ///
    /// A wrong answer is not recorded and the word stays open.
    pub fn submit_answer(&mut self, candidate: &str) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.is_open() {
            return false;
        }
        let Some(word) = session.current_word() else {
            return false;
        };
        let Some(found) = self.matcher.find(candidate, word) else {
            debug!("Submitted '{}' does not match '{}'", candidate, word.text);
            return false;
        };
        let matched = found.variant.to_string();
        let index = session.current_index();

        session.record_correct(candidate, &matched);
        self.arbiter.settle();
        self.input_gate.cancel();
        self.speech.pause_input();

        info!("Word {} correct (submitted): '{}'", index, candidate);
        self.events.push_back(GameEvent::Correct {
            index,
            spoken: candidate.to_string(),
            matched,
        });
        self.events.push_back(GameEvent::AdvanceRequested { index });
        true
    }

    fn finish(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        match compute_result(session) {
            Ok(result) => {
                info!(
                    "Quiz complete: {} of {} correct, level {}",
                    result.total_points,
                    session.len(),
                    result.achieved_tier
                );
                self.result = Some(result.clone());
                self.events.push_back(GameEvent::Completed { result });
            }
            Err(e) => error!("Failed to compute quiz result: {}", e),
        }
    }

    fn announce_current_word(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if let Some(word) = session.current_word() {
            debug!("Word {}: {} ({})", session.current_index(), word.text, word.tier);
            self.events.push_back(GameEvent::WordShown {
                index: session.current_index(),
                prompt: word.text.clone(),
                tier: word.tier,
            });
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        earliest([
            self.speech.next_deadline(),
            self.input_gate.deadline(),
            self.arbiter.next_deadline(),
        ])
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain(..).collect()
    }

    pub fn current_word(&self) -> Option<&Word> {
        self.session.as_ref().and_then(Session::current_word)
    }

    pub fn current_index(&self) -> usize {
        self.session.as_ref().map_or(0, Session::current_index)
    }

    pub fn is_complete(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_complete)
    }

    pub fn level_breakdown(&self) -> Vec<LevelResult> {
        self.session
            .as_ref()
            .map(level_breakdown)
            .unwrap_or_default()
    }

    pub fn result(&self) -> Option<&UserLevelResult> {
        self.result.as_ref()
    }

    pub fn arbitration_state(&self) -> ArbitrationState {
        self.arbiter.state()
    }

    pub fn last_error(&self) -> Option<&SpeechError> {
        self.last_error.as_ref()
    }

    pub fn score(&self) -> usize {
        self.session.as_ref().map_or(0, Session::score)
    }

    pub fn streak(&self) -> u32 {
        self.session.as_ref().map_or(0, Session::current_streak)
    }

    /// Level badge for the score so far.
    pub fn live_tier(&self) -> ProficiencyTier {
        live_tier(self.score(), self.settings.words_per_tier)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn speech_state(&self) -> SpeechState {
        self.speech.state()
    }

    pub fn speech(&self) -> &SpeechSessionController<S> {
        &self.speech
    }

    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }
}
