mod arbiter;
mod game;
mod scoring;
mod session;

pub use arbiter::{
    AnswerArbiter, ArbiterConfig, ArbiterOutput, ArbiterPhase, ArbitrationState, Liveness,
};
pub use game::{GameEvent, QuizGame};
pub use scoring::{
    compute_result, level_breakdown, live_tier, tier_threshold, LevelResult, UserLevelResult,
};
pub use session::{AnswerOutcome, AnswerRecord, Session};
