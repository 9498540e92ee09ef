//! Turns a finished session into a proficiency level.
//!
//! A tier of rank `r` needs `r * words_per_tier` correct answers. With the
//! default two words per tier that is 2 for A1 up to 12 for C2.

use super::session::Session;
use crate::corpus::ProficiencyTier;
use crate::error::QuizError;
use serde::Serialize;

/// Highest first, so the first threshold met wins.
const TIERS_DESCENDING: [ProficiencyTier; 7] = [
    ProficiencyTier::C2,
    ProficiencyTier::C1,
    ProficiencyTier::B2,
    ProficiencyTier::B1,
    ProficiencyTier::A2,
    ProficiencyTier::A1,
    ProficiencyTier::A0,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelResult {
    pub tier: ProficiencyTier,
    pub correct_count: usize,
    pub total_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserLevelResult {
    pub achieved_tier: ProficiencyTier,
    pub is_perfect: bool,
    pub total_missed: usize,
    pub total_points: usize,
    pub level_results: Vec<LevelResult>,
}

pub fn tier_threshold(tier: ProficiencyTier, words_per_tier: usize) -> usize {
    tier.rank() * words_per_tier
}

/// The level badge for a running score.
pub fn live_tier(points: usize, words_per_tier: usize) -> ProficiencyTier {
    TIERS_DESCENDING
        .into_iter()
        .find(|tier| points >= tier_threshold(*tier, words_per_tier))
        .unwrap_or(ProficiencyTier::A0)
}

/// Correct and total counts per game tier, in any state of the session.
pub fn level_breakdown(session: &Session) -> Vec<LevelResult> {
    ProficiencyTier::GAME_TIERS
        .into_iter()
        .map(|tier| {
            let mut result = LevelResult {
                tier,
                correct_count: 0,
                total_count: 0,
            };
            for (index, word) in session.words().iter().enumerate() {
                if word.tier == tier {
                    result.total_count += 1;
                    if session.is_correct(index) {
                        result.correct_count += 1;
                    }
                }
            }
            result
        })
        .collect()
}

pub fn compute_result(session: &Session) -> Result<UserLevelResult, QuizError> {
    if !session.is_complete() {
        return Err(QuizError::SessionIncomplete {
            answered: session.current_index(),
            total: session.len(),
        });
    }

    let total_points = session.score();
    let total_missed = session.len() - total_points;
    Ok(UserLevelResult {
        achieved_tier: live_tier(total_points, session.words_per_tier()),
        is_perfect: total_missed == 0,
        total_missed,
        total_points,
        level_results: level_breakdown(session),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn session() -> Session {
        let mut rng = StdRng::seed_from_u64(7);
        Session::from_corpus(Corpus::builtin(), 2, &mut rng).unwrap()
    }

    /// Plays through, answering the given indices correctly and skipping the rest.
    fn play(correct: &[usize]) -> Session {
        let mut s = session();
        while !s.is_complete() {
            if correct.contains(&s.current_index()) {
                s.record_correct("x", "x");
            } else {
                s.record_skip();
            }
            s.advance();
        }
        s
    }

    #[test]
    fn perfect_game_reaches_top_tier() {
        let all: Vec<usize> = (0..12).collect();
        let result = compute_result(&play(&all)).unwrap();
        assert_eq!(result.achieved_tier, ProficiencyTier::C2);
        assert!(result.is_perfect);
        assert_eq!(result.total_missed, 0);
        assert_eq!(result.total_points, 12);
        assert!(result
            .level_results
            .iter()
            .all(|level| level.correct_count == 2 && level.total_count == 2));
    }

    #[test]
    fn six_correct_is_b1() {
        let result = compute_result(&play(&[0, 1, 2, 3, 4, 5])).unwrap();
        assert_eq!(result.achieved_tier, ProficiencyTier::B1);
        assert!(!result.is_perfect);
        assert_eq!(result.total_missed, 6);
        assert_eq!(result.level_results[0].tier, ProficiencyTier::A1);
        assert_eq!(result.level_results[0].correct_count, 2);
        assert_eq!(result.level_results[3].correct_count, 0);
    }

    #[test]
    fn one_correct_is_a0() {
        let result = compute_result(&play(&[11])).unwrap();
        assert_eq!(result.achieved_tier, ProficiencyTier::A0);
        assert_eq!(result.total_points, 1);
        assert_eq!(result.level_results[5].correct_count, 1);
    }

    #[test]
    fn result_is_deterministic() {
        let s = play(&[0, 3, 7]);
        assert_eq!(compute_result(&s).unwrap(), compute_result(&s).unwrap());
    }

    #[test]
    fn incomplete_session_has_no_result() {
        let s = session();
        assert!(matches!(
            compute_result(&s),
            Err(QuizError::SessionIncomplete {
                answered: 0,
                total: 12
            })
        ));
    }

    #[test]
    fn thresholds_scale_with_words_per_tier() {
        assert_eq!(tier_threshold(ProficiencyTier::C2, 2), 12);
        assert_eq!(tier_threshold(ProficiencyTier::B1, 3), 9);
        assert_eq!(live_tier(5, 2), ProficiencyTier::A2);
        assert_eq!(live_tier(0, 2), ProficiencyTier::A0);
        assert_eq!(live_tier(3, 1), ProficiencyTier::B1);
    }
}
