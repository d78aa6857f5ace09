//! Score computation and qualitative tiers.

use serde::{Deserialize, Serialize};

use crate::model::{Question, QuestionOutcome};

/// Count answers that match the question's correct option.
///
/// Unset slots, out-of-range indices, and missing trailing slots all count as wrong.
#[must_use]
pub fn score(questions: &[Question], answers: &[Option<usize>]) -> u32 {
    let correct = questions
        .iter()
        .enumerate()
        .filter(|(i, q)| q.is_correct(answers.get(*i).copied().flatten()))
        .count();
    u32::try_from(correct).unwrap_or(u32::MAX)
}

/// Same rule as [`score`], applied to persisted per-question outcomes.
#[must_use]
pub fn score_outcomes(outcomes: &[QuestionOutcome]) -> u32 {
    let correct = outcomes.iter().filter(|o| o.is_correct()).count();
    u32::try_from(correct).unwrap_or(u32::MAX)
}

/// Rounded percentage of `score` out of `total`; `0` when `total` is zero.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn percentage(score: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (f64::from(score) / f64::from(total) * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Qualitative band for a percentage score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreTier {
    Excellent,
    Good,
    KeepPracticing,
}

impl ScoreTier {
    pub const EXCELLENT_FROM: u8 = 80;
    pub const GOOD_FROM: u8 = 60;

    #[must_use]
    pub fn from_percentage(pct: u8) -> Self {
        if pct >= Self::EXCELLENT_FROM {
            Self::Excellent
        } else if pct >= Self::GOOD_FROM {
            Self::Good
        } else {
            Self::KeepPracticing
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent! You're mastering this material.",
            Self::Good => "Good job! You're on the right track.",
            Self::KeepPracticing => "Keep practicing! You'll improve with more study.",
        }
    }

    #[must_use]
    pub fn recommendations(self) -> [&'static str; 3] {
        match self {
            Self::Excellent => [
                "Challenge yourself with advanced material",
                "Try teaching these concepts to others",
                "Explore related topics to broaden your knowledge",
            ],
            Self::Good => [
                "Review the questions you missed",
                "Practice active recall techniques",
                "Try spaced repetition for better retention",
            ],
            Self::KeepPracticing => [
                "Focus on understanding core concepts first",
                "Use flashcards for key terms and definitions",
                "Schedule regular, shorter study sessions",
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionId;

    fn question(correct: usize) -> Question {
        Question::new(
            QuestionId::new(correct as u64),
            "Q",
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct,
        )
        .unwrap()
    }

    #[test]
    fn out_of_range_and_unset_answers_are_wrong() {
        let questions: Vec<_> = [0, 1, 2, 3, 0].into_iter().map(question).collect();
        let answers = [Some(0), Some(1), Some(9), None, Some(0)];
        assert_eq!(score(&questions, &answers), 3);
    }

    #[test]
    fn missing_answer_slots_are_wrong() {
        let questions: Vec<_> = [0, 1].into_iter().map(question).collect();
        assert_eq!(score(&questions, &[Some(0)]), 1);
        assert_eq!(score(&questions, &[]), 0);
    }

    #[test]
    fn percentage_rounds_and_handles_zero_total() {
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(5, 5), 100);
    }

    #[test]
    fn tier_boundaries_are_inclusive() {
        assert_eq!(ScoreTier::from_percentage(80), ScoreTier::Excellent);
        assert_eq!(ScoreTier::from_percentage(79), ScoreTier::Good);
        assert_eq!(ScoreTier::from_percentage(60), ScoreTier::Good);
        assert_eq!(ScoreTier::from_percentage(59), ScoreTier::KeepPracticing);
        assert_eq!(ScoreTier::from_percentage(0), ScoreTier::KeepPracticing);
    }
}
