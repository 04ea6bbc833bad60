//! Display directives for the browser client, one per stage.

use serde::Serialize;
use uuid::Uuid;

use crate::models::catalog::{self, Chapter, BAND_SEPARATOR};
use crate::models::quiz_session::{
    QuizPhase, QuizSession, Stage, StageError, MAX_SCORE, TOTAL_QUESTIONS,
};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Password,
    Select,
    TextArea,
    Radio,
}

#[derive(Debug, Clone, Serialize)]
pub struct Field {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub required: bool,
}

impl Field {
    fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            options: Vec::new(),
            required: true,
        }
    }

    fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Question,
    Student,
    Ai,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptBlock {
    pub label: String,
    pub text: String,
    pub tone: Tone,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginScreen {
    pub title: &'static str,
    pub fields: Vec<Field>,
    pub error: Option<StageError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetupScreen {
    pub title: &'static str,
    pub fields: Vec<Field>,
    /// Topic options depend on the chosen chapter.
    pub chapters: &'static [Chapter],
    pub error: Option<StageError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizScreen {
    pub progress: f32,
    pub heading: String,
    pub question_number: usize,
    pub total_questions: usize,
    pub score: u32,
    pub max_score: u32,
    pub phase: QuizPhase,
    /// `None` while the question still has to be fetched; see `retry`.
    pub prompt: Option<String>,
    pub field: Field,
    pub retry: bool,
    pub error: Option<StageError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoneScreen {
    pub title: &'static str,
    pub student: String,
    pub topic: String,
    pub difficulty: String,
    pub final_score: String,
    pub score: u32,
    pub max_score: u32,
    pub transcript: Vec<TranscriptBlock>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum Screen {
    Login(LoginScreen),
    Setup(SetupScreen),
    Quiz(QuizScreen),
    Done(DoneScreen),
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionEnvelope {
    pub session_id: Uuid,
    pub stage: Stage,
    pub screen: Screen,
}

impl From<&QuizSession> for SessionEnvelope {
    fn from(session: &QuizSession) -> Self {
        Self {
            session_id: session.id,
            stage: session.stage,
            screen: Screen::from(session),
        }
    }
}

impl From<&QuizSession> for Screen {
    fn from(session: &QuizSession) -> Self {
        match session.stage {
            Stage::Login => Screen::Login(LoginScreen {
                title: "Physics Spark Diagnostic",
                fields: vec![Field::new("api_key", "Google AI API Key", FieldKind::Password)],
                error: session.last_error.clone(),
            }),
            Stage::Setup => Screen::Setup(setup_screen(session)),
            Stage::Quiz => Screen::Quiz(quiz_screen(session)),
            Stage::Done => Screen::Done(done_screen(session)),
        }
    }
}

fn setup_screen(session: &QuizSession) -> SetupScreen {
    let chapter_names = catalog::chapters().iter().map(|c| c.name.to_string()).collect();
    let bands = catalog::DIFFICULTY_BANDS.iter().map(|b| b.display_name()).collect();
    SetupScreen {
        title: "Set up diagnostic",
        fields: vec![
            Field::new("student", "Student name", FieldKind::Text),
            Field::new("chapter", "Chapter", FieldKind::Select).with_options(chapter_names),
            Field::new("topic", "Topic", FieldKind::Select),
            Field::new("difficulty", "Difficulty band", FieldKind::Select).with_options(bands),
        ],
        chapters: catalog::chapters(),
        error: session.last_error.clone(),
    }
}

fn quiz_screen(session: &QuizSession) -> QuizScreen {
    let phase = session.phase().unwrap_or(QuizPhase::Conceptual);
    let (prompt, field) = match phase {
        QuizPhase::Conceptual => (
            session.current_question.clone(),
            Field::new("answer", "Your answer:", FieldKind::TextArea),
        ),
        QuizPhase::Mcq => {
            let mcq = session.current_mcq();
            (
                mcq.map(|m| m.question.clone()),
                Field::new("answer", "Select", FieldKind::Radio)
                    .with_options(mcq.map(|m| m.labelled_options()).unwrap_or_default()),
            )
        }
    };
    let question_number = session.question_index + 1;
    QuizScreen {
        progress: session.progress(),
        heading: format!(
            "Question {} / {}   |   Score {}/{}",
            question_number, TOTAL_QUESTIONS, session.score, MAX_SCORE
        ),
        question_number,
        total_questions: TOTAL_QUESTIONS,
        score: session.score,
        max_score: MAX_SCORE,
        phase,
        retry: prompt.is_none(),
        prompt,
        field,
        error: session.last_error.clone(),
    }
}

fn done_screen(session: &QuizSession) -> DoneScreen {
    let selection = session.selection.clone().unwrap_or_default();
    let difficulty = catalog::band(&selection.difficulty_level)
        .map(|b| b.label.to_string())
        .unwrap_or_default();

    let mut transcript = Vec::with_capacity(session.results.len() * 3);
    for (i, r) in session.results.iter().enumerate() {
        transcript.push(TranscriptBlock {
            label: format!("Q{}", i + 1),
            text: format!("{}  (Marks {})", r.question, r.mark),
            tone: Tone::Question,
        });
        transcript.push(TranscriptBlock {
            label: "You".to_string(),
            text: r.student_answer.clone(),
            tone: Tone::Student,
        });
        transcript.push(TranscriptBlock {
            label: "AI".to_string(),
            text: r.ai_feedback.clone(),
            tone: Tone::Ai,
        });
    }

    DoneScreen {
        title: "Diagnostic complete",
        student: selection.student,
        topic: format!("{}{}{}", selection.chapter, BAND_SEPARATOR, selection.topic),
        difficulty,
        final_score: format!("Final Score  {}/{}", session.score, MAX_SCORE),
        score: session.score,
        max_score: MAX_SCORE,
        transcript,
    }
}
