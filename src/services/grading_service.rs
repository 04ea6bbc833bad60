use crate::models::question::{McqRecord, OptionLetter};
use crate::models::quiz_session::{AnswerResult, CONCEPTUAL_MAX_POINTS, MCQ_MAX_POINTS};

/// Band whose raw scores below the pass line get a one-point bump.
const LENIENT_BAND: &str = "3";
const LENIENT_PASS_MARK: u32 = 3;

pub struct GradingService;

impl GradingService {
    pub fn adjust_points(difficulty_level: &str, raw_points: u32) -> u32 {
        if difficulty_level == LENIENT_BAND && raw_points < LENIENT_PASS_MARK {
            LENIENT_PASS_MARK.min(raw_points + 1)
        } else {
            raw_points
        }
    }

    /// `raw_points` is the model's score before the band adjustment.
    pub fn grade_conceptual(
        difficulty_level: &str,
        question: &str,
        student_answer: &str,
        raw_points: u32,
        model_answer: &str,
    ) -> (u32, AnswerResult) {
        let points = Self::adjust_points(difficulty_level, raw_points);
        let result = AnswerResult {
            question: question.to_string(),
            student_answer: student_answer.to_string(),
            ai_feedback: model_answer.to_string(),
            mark: format!("{}/{}", points, CONCEPTUAL_MAX_POINTS),
        };
        (points, result)
    }

    pub fn grade_mcq(mcq: &McqRecord, chosen: OptionLetter) -> (u32, AnswerResult) {
        let correct = chosen == mcq.correct_letter;
        let points = if correct { MCQ_MAX_POINTS } else { 0 };
        let result = AnswerResult {
            question: mcq.question.clone(),
            student_answer: format!("{}) {}", chosen, mcq.option(chosen)),
            ai_feedback: format!(
                "Correct: {}) {}\nExplanation: {}",
                mcq.correct_letter,
                mcq.option(mcq.correct_letter),
                mcq.explanation
            ),
            mark: format!("{}/{}", points, MCQ_MAX_POINTS),
        };
        (points, result)
    }

    /// Sum of the marks already awarded, read back from the `x/y` strings.
    pub fn total_from_marks(results: &[AnswerResult]) -> u32 {
        results
            .iter()
            .filter_map(|r| r.mark.split('/').next())
            .filter_map(|earned| earned.parse::<u32>().ok())
            .sum()
    }
}
