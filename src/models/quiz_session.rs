use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::question::McqRecord;

pub const CONCEPTUAL_QUESTIONS: usize = 5;
pub const MCQ_QUESTIONS: usize = 5;
pub const TOTAL_QUESTIONS: usize = CONCEPTUAL_QUESTIONS + MCQ_QUESTIONS;
pub const CONCEPTUAL_MAX_POINTS: u32 = 5;
pub const MCQ_MAX_POINTS: u32 = 1;
pub const MAX_SCORE: u32 =
    CONCEPTUAL_QUESTIONS as u32 * CONCEPTUAL_MAX_POINTS + MCQ_QUESTIONS as u32 * MCQ_MAX_POINTS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Login,
    Setup,
    Quiz,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizPhase {
    Conceptual,
    Mcq,
}

/// Model-service key entered at login. Lives only inside its own session.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub question: String,
    pub student_answer: String,
    pub ai_feedback: String,
    pub mark: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSelection {
    pub student: String,
    pub chapter: String,
    pub topic: String,
    pub difficulty_level: String,
    pub difficulty_instruction: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageError {
    pub stage: String,
    pub message: String,
    pub retry: bool,
}

/// Input of the model step that last failed, replayed by the retry action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingStep {
    McqBatch(QuizSelection),
    Grading { answer: String },
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    pub id: Uuid,
    pub stage: Stage,
    pub credential: Option<Credential>,
    pub selection: Option<QuizSelection>,
    pub question_index: usize,
    pub score: u32,
    /// Insertion-ordered; only used to reject repeats.
    pub asked_conceptual_questions: Vec<String>,
    pub mcq_batch: Vec<McqRecord>,
    pub results: Vec<AnswerResult>,
    pub current_question: Option<String>,
    pub last_error: Option<StageError>,
    pub pending: Option<PendingStep>,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl QuizSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            stage: Stage::Login,
            credential: None,
            selection: None,
            question_index: 0,
            score: 0,
            asked_conceptual_questions: Vec::new(),
            mcq_batch: Vec::new(),
            results: Vec::new(),
            current_question: None,
            last_error: None,
            pending: None,
            created_at: now,
            last_active_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_active_at = Utc::now();
    }

    /// `None` outside the quiz stage.
    pub fn phase(&self) -> Option<QuizPhase> {
        if self.stage != Stage::Quiz {
            return None;
        }
        if self.question_index < CONCEPTUAL_QUESTIONS {
            Some(QuizPhase::Conceptual)
        } else {
            Some(QuizPhase::Mcq)
        }
    }

    pub fn current_mcq(&self) -> Option<&McqRecord> {
        match self.phase() {
            Some(QuizPhase::Mcq) => self.mcq_batch.get(self.question_index - CONCEPTUAL_QUESTIONS),
            _ => None,
        }
    }

    pub fn has_asked(&self, question: &str) -> bool {
        self.asked_conceptual_questions.iter().any(|q| q == question)
    }

    pub fn mark_asked(&mut self, question: &str) {
        if !self.has_asked(question) {
            self.asked_conceptual_questions.push(question.to_string());
        }
    }

    /// Appends one result and advances. Entering index 10 finishes the quiz.
    pub fn record_answer(&mut self, points: u32, result: AnswerResult) {
        self.score += points;
        self.results.push(result);
        self.question_index += 1;
        self.current_question = None;
        self.last_error = None;
        self.pending = None;
        if self.question_index == TOTAL_QUESTIONS {
            self.stage = Stage::Done;
        }
    }

    pub fn progress(&self) -> f32 {
        self.question_index as f32 / TOTAL_QUESTIONS as f32
    }
}

impl Default for QuizSession {
    fn default() -> Self {
        Self::new()
    }
}
