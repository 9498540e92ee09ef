//! Spoken vocabulary quiz.
//!
//! A player sees a word, says its translation, and climbs proficiency tiers.
//! The crate holds the game core: fuzzy answer matching, a speech session
//! that survives engine timeouts, answer arbitration over noisy interim
//! transcripts, and scoring. The host supplies a [`TranscriptionSource`] and
//! drives time, either directly through [`QuizGame::tick`] or with
//! [`runtime::run_quiz`].

pub mod cli;
pub mod corpus;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod quiz;
pub mod runtime;
pub mod settings;
pub mod speech;
pub mod timer;

pub use corpus::{Corpus, ProficiencyTier, Word};
pub use error::{CorpusError, QuizError, SpeechError};
pub use matcher::FuzzyMatcher;
pub use quiz::{GameEvent, QuizGame, UserLevelResult};
pub use settings::QuizSettings;
pub use speech::{SourceEvent, TranscriptionSource};
