//! Assessment scoring.

use crate::types::{AssessmentScores, Question, QuestionType};
use std::collections::HashMap;

/// Points a category can reach.
const CATEGORY_MAX: f64 = 25.0;

/// Option positions at or beyond this score nothing; position 0 scores 1.
const OPTION_SCALE: f64 = 3.0;

#[derive(Default)]
struct Tally {
    raw: f64,
    count: u32,
}

impl Tally {
    fn normalized(&self) -> u32 {
        let ratio = self.raw / f64::from(self.count.max(1));
        (ratio * CATEGORY_MAX).round_ties_even() as u32
    }
}

/// Scores answers (keyed by question id) against a question set.
///
/// Knowledge questions score 1 for the correct answer. Other dimensions
/// score by the chosen option's position: the first option is the most
/// sustainable and scores 1, the fourth and later score 0. Each dimension
/// is averaged over its question count and scaled to 0–25.
pub fn score_assessment(
    questions: &[Question],
    answers: &HashMap<u32, String>,
) -> AssessmentScores {
    let mut knowledge = Tally::default();
    let mut attitude = Tally::default();
    let mut engagement = Tally::default();
    let mut exposure = Tally::default();

    for question in questions {
        let tally = match question.kind {
            QuestionType::Knowledge => &mut knowledge,
            QuestionType::Attitude => &mut attitude,
            QuestionType::Engagement => &mut engagement,
            QuestionType::Exposure => &mut exposure,
        };
        tally.count += 1;

        let Some(answer) = answers.get(&question.id).filter(|a| !a.is_empty()) else {
            continue;
        };

        tally.raw += match question.kind {
            QuestionType::Knowledge => {
                if question.correct_answer.as_deref() == Some(answer.as_str()) {
                    1.0
                } else {
                    0.0
                }
            }
            _ => question
                .options
                .iter()
                .position(|o| o == answer)
                .map(|idx| (OPTION_SCALE - idx as f64).max(0.0) / OPTION_SCALE)
                .unwrap_or(0.0),
        };
    }

    let mut scores = AssessmentScores {
        knowledge: knowledge.normalized(),
        attitude: attitude.normalized(),
        engagement: engagement.normalized(),
        exposure: exposure.normalized(),
        total: 0,
    };
    scores.total = scores.knowledge + scores.attitude + scores.engagement + scores.exposure;
    scores
}
