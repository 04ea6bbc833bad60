use validator::Validate;

use crate::dto::action_dto::{Action, AnswerAction, LoginAction, SetupAction};
use crate::error::{Error, Result};
use crate::models::catalog;
use crate::models::question::{McqRecord, OptionLetter};
use crate::models::quiz_session::{
    Credential, PendingStep, QuizPhase, QuizSelection, QuizSession, Stage, StageError,
};
use crate::services::grading_service::GradingService;
use crate::services::model_client::ModelClient;
use crate::services::parser_service::{parse_grade_reply, require_mcq_batch};
use crate::services::prompt_service::{conceptual_prompt, grading_prompt, mcq_batch_prompt};

pub const STAGE_MCQ_BATCH: &str = "mcq_batch";
pub const STAGE_CONCEPTUAL_QUESTION: &str = "conceptual_question";
pub const STAGE_GRADING: &str = "grading";

/// Drives one session through login, setup, the ten questions and the report.
#[derive(Clone)]
pub struct QuizService {
    model: ModelClient,
    question_temperature: f32,
    grading_temperature: f32,
    max_duplicate_retries: u32,
}

impl QuizService {
    pub fn new(
        model: ModelClient,
        question_temperature: f32,
        grading_temperature: f32,
        max_duplicate_retries: u32,
    ) -> Self {
        Self {
            model,
            question_temperature,
            grading_temperature,
            max_duplicate_retries,
        }
    }

    pub fn model(&self) -> &ModelClient {
        &self.model
    }

    /// Applies one user action. Input errors leave the session untouched;
    /// model failures are recorded on the session so the screen can offer a retry.
    pub async fn dispatch(&self, session: &mut QuizSession, action: Action) -> Result<()> {
        session.touch();
        match (session.stage, action) {
            (Stage::Login, Action::Login(req)) => self.login(session, req),
            (Stage::Setup, Action::Setup(req)) => self.setup(session, req).await,
            (Stage::Quiz, Action::Answer(req)) => self.answer(session, req).await,
            (Stage::Setup | Stage::Quiz, Action::Retry) => self.retry(session).await,
            (stage, action) => Err(Error::Conflict(format!(
                "action '{}' is not available in stage {:?}",
                action.name(),
                stage
            ))),
        }
    }

    fn login(&self, session: &mut QuizSession, req: LoginAction) -> Result<()> {
        req.validate()?;
        let key = req.api_key.trim();
        if key.is_empty() {
            return Err(Error::BadRequest("API key is required".to_string()));
        }
        session.credential = Some(Credential::new(key));
        session.stage = Stage::Setup;
        session.last_error = None;
        tracing::info!(session_id = %session.id, "session logged in");
        Ok(())
    }

    async fn setup(&self, session: &mut QuizSession, req: SetupAction) -> Result<()> {
        req.validate()?;
        let student = required(&req.student, "Student name")?;
        let chapter = required(&req.chapter, "Chapter")?;
        let topic = required(&req.topic, "Topic")?;
        let band = catalog::validate_selection(chapter, topic, req.difficulty.trim())?;

        let selection = QuizSelection {
            student: student.to_string(),
            chapter: chapter.to_string(),
            topic: topic.to_string(),
            difficulty_level: band.id.to_string(),
            difficulty_instruction: band.instruction.to_string(),
        };
        self.start_quiz(session, selection).await
    }

    /// Fetches the multiple-choice batch and enters question 1. On failure
    /// the selection is kept so `retry` can repeat the fetch.
    async fn start_quiz(&self, session: &mut QuizSession, selection: QuizSelection) -> Result<()> {
        let credential = credential(session)?;
        let batch = match self
            .fetch_mcq_batch(&credential, &selection.difficulty_instruction, &selection.topic)
            .await
        {
            Ok(batch) => batch,
            Err(e) => {
                session.pending = Some(PendingStep::McqBatch(selection));
                return Err(fail(session, STAGE_MCQ_BATCH, e));
            }
        };

        tracing::info!(
            session_id = %session.id,
            chapter = %selection.chapter,
            topic = %selection.topic,
            band = %selection.difficulty_level,
            "quiz started"
        );
        session.selection = Some(selection);
        session.mcq_batch = batch;
        session.question_index = 0;
        session.score = 0;
        session.results.clear();
        session.asked_conceptual_questions.clear();
        session.current_question = None;
        session.last_error = None;
        session.pending = None;
        session.stage = Stage::Quiz;

        self.enter_conceptual(session).await;
        Ok(())
    }

    async fn answer(&self, session: &mut QuizSession, req: AnswerAction) -> Result<()> {
        req.validate()?;
        match session.phase() {
            Some(QuizPhase::Conceptual) => self.answer_conceptual(session, req.answer.trim()).await,
            Some(QuizPhase::Mcq) => self.answer_mcq(session, &req.answer),
            None => Err(Error::Conflict("quiz is not running".to_string())),
        }
    }

    async fn answer_conceptual(&self, session: &mut QuizSession, answer: &str) -> Result<()> {
        if answer.is_empty() {
            return Err(Error::BadRequest("Answer is required".to_string()));
        }
        let question = session.current_question.clone().ok_or_else(|| {
            Error::Conflict("the question has not been generated yet; retry first".to_string())
        })?;
        let credential = credential(session)?;
        let selection = selection(session)?;

        let (raw_points, model_answer) = match self
            .fetch_grade(&credential, &selection.difficulty_instruction, &question, answer)
            .await
        {
            Ok(grade) => grade,
            Err(e) => {
                session.pending = Some(PendingStep::Grading {
                    answer: answer.to_string(),
                });
                return Err(fail(session, STAGE_GRADING, e));
            }
        };

        let (points, result) = GradingService::grade_conceptual(
            &selection.difficulty_level,
            &question,
            answer,
            raw_points,
            &model_answer,
        );
        session.mark_asked(&question);
        session.record_answer(points, result);
        tracing::info!(
            session_id = %session.id,
            question_index = session.question_index,
            raw_points,
            points,
            "conceptual answer graded"
        );

        self.enter_conceptual(session).await;
        Ok(())
    }

    fn answer_mcq(&self, session: &mut QuizSession, answer: &str) -> Result<()> {
        let chosen: OptionLetter = answer.parse()?;
        let mcq = session
            .current_mcq()
            .cloned()
            .ok_or_else(|| Error::Internal("multiple-choice batch is incomplete".to_string()))?;

        let (points, result) = GradingService::grade_mcq(&mcq, chosen);
        session.record_answer(points, result);
        tracing::info!(
            session_id = %session.id,
            question_index = session.question_index,
            points,
            "multiple-choice answer graded"
        );
        if session.stage == Stage::Done {
            tracing::info!(session_id = %session.id, score = session.score, "quiz finished");
        }
        Ok(())
    }

    async fn retry(&self, session: &mut QuizSession) -> Result<()> {
        match session.pending.take() {
            Some(PendingStep::McqBatch(selection)) if session.stage == Stage::Setup => {
                return self.start_quiz(session, selection).await;
            }
            Some(PendingStep::Grading { answer }) if session.phase() == Some(QuizPhase::Conceptual) => {
                return self.answer_conceptual(session, &answer).await;
            }
            _ => {}
        }
        if session.phase() == Some(QuizPhase::Conceptual) && session.current_question.is_none() {
            return match self.prepare_conceptual(session).await {
                Ok(()) => {
                    session.last_error = None;
                    Ok(())
                }
                Err(e) => Err(fail(session, STAGE_CONCEPTUAL_QUESTION, e)),
            };
        }
        Err(Error::Conflict("nothing to retry".to_string()))
    }

    /// Fetches the question for a freshly entered conceptual index. A failure
    /// is left on the session for the screen to show; the transition stands.
    async fn enter_conceptual(&self, session: &mut QuizSession) {
        if session.phase() != Some(QuizPhase::Conceptual) {
            return;
        }
        if let Err(e) = self.prepare_conceptual(session).await {
            let _ = fail(session, STAGE_CONCEPTUAL_QUESTION, e);
        }
    }

    async fn prepare_conceptual(&self, session: &mut QuizSession) -> Result<()> {
        let credential = credential(session)?;
        let selection = selection(session)?;
        let prompt = conceptual_prompt(
            &selection.difficulty_instruction,
            &selection.topic,
            &session.asked_conceptual_questions,
        );

        let mut reply = self
            .model
            .generate(&credential, &prompt, self.question_temperature)
            .await?;
        let mut regenerations = 0;
        loop {
            let candidate = reply.trim();
            if !candidate.is_empty() && !session.has_asked(candidate) {
                session.current_question = Some(candidate.to_string());
                return Ok(());
            }
            if regenerations >= self.max_duplicate_retries {
                return Err(Error::Parse(format!(
                    "model repeated an already asked question {} times",
                    regenerations + 1
                )));
            }
            regenerations += 1;
            tracing::warn!(session_id = %session.id, regenerations, "duplicate conceptual question, regenerating");
            reply = self
                .model
                .regenerate(&credential, &prompt, self.question_temperature)
                .await?;
        }
    }

    async fn fetch_mcq_batch(
        &self,
        credential: &Credential,
        instruction: &str,
        topic: &str,
    ) -> Result<Vec<McqRecord>> {
        let prompt = mcq_batch_prompt(instruction, topic);
        let reply = self
            .model
            .generate(credential, &prompt, self.question_temperature)
            .await?;
        match require_mcq_batch(&reply) {
            Ok(batch) => Ok(batch),
            Err(e) => {
                tracing::warn!(error = %e, "malformed multiple-choice batch, regenerating once");
                let reply = self
                    .model
                    .regenerate(credential, &prompt, self.question_temperature)
                    .await?;
                require_mcq_batch(&reply)
            }
        }
    }

    async fn fetch_grade(
        &self,
        credential: &Credential,
        instruction: &str,
        question: &str,
        answer: &str,
    ) -> Result<(u32, String)> {
        let prompt = grading_prompt(instruction, question, answer);
        let reply = self
            .model
            .generate(credential, &prompt, self.grading_temperature)
            .await?;
        match parse_grade_reply(&reply) {
            Ok(grade) => Ok(grade),
            Err(e) => {
                tracing::warn!(error = %e, "malformed grading reply, regenerating once");
                let reply = self
                    .model
                    .regenerate(credential, &prompt, self.grading_temperature)
                    .await?;
                parse_grade_reply(&reply)
            }
        }
    }
}

fn required<'a>(value: &'a str, label: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::BadRequest(format!("{} is required", label)));
    }
    Ok(trimmed)
}

fn credential(session: &QuizSession) -> Result<Credential> {
    session
        .credential
        .clone()
        .ok_or_else(|| Error::Conflict("session is not logged in".to_string()))
}

fn selection(session: &QuizSession) -> Result<QuizSelection> {
    session
        .selection
        .clone()
        .ok_or_else(|| Error::Conflict("quiz has not been set up".to_string()))
}

fn fail(session: &mut QuizSession, stage: &str, err: Error) -> Error {
    tracing::error!(session_id = %session.id, stage, error = %err, "stage failed");
    session.last_error = Some(StageError {
        stage: stage.to_string(),
        message: err.to_string(),
        retry: err.is_retryable(),
    });
    Error::stage(stage, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::action_dto::{AnswerAction, LoginAction, SetupAction};
    use crate::models::quiz_session::{MAX_SCORE, TOTAL_QUESTIONS};
    use crate::services::model_client::{MockTextGenerator, ResponseCache};
    use crate::test_support::FIVE_MCQS;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Routes each prompt kind to a canned reply; conceptual questions are numbered.
    fn scripted(grade: &'static str) -> MockTextGenerator {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().returning(move |_, prompt, _| {
            if prompt.contains("Generate 5 distinct MCQs") {
                Ok(FIVE_MCQS.to_string())
            } else if prompt.contains("Return: SCORE") {
                Ok(grade.to_string())
            } else {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Ok(format!("Conceptual question {}?", n + 1))
            }
        });
        mock
    }

    fn service(mock: MockTextGenerator) -> QuizService {
        let model = ModelClient::new(Arc::new(mock), ResponseCache::new(64), 1, Duration::ZERO);
        QuizService::new(model, 0.7, 0.7, 3)
    }

    fn login() -> Action {
        Action::Login(LoginAction { api_key: "test-key".into() })
    }

    fn setup(level: &str) -> Action {
        Action::Setup(SetupAction {
            student: "Ada".into(),
            chapter: "Mechanics".into(),
            topic: "Dynamics".into(),
            difficulty: level.into(),
        })
    }

    fn answer(text: &str) -> Action {
        Action::Answer(AnswerAction { answer: text.into() })
    }

    #[tokio::test]
    async fn full_run_scores_conceptual_and_mcq_phases() {
        let svc = service(scripted("SCORE:4 MODEL:Newton's second law."));
        let mut session = QuizSession::new();

        svc.dispatch(&mut session, login()).await.unwrap();
        svc.dispatch(&mut session, setup("5")).await.unwrap();
        assert_eq!(session.stage, Stage::Quiz);
        assert_eq!(session.mcq_batch.len(), 5);

        for i in 0..5 {
            assert_eq!(session.current_question.as_deref(), Some(format!("Conceptual question {}?", i + 1).as_str()));
            svc.dispatch(&mut session, answer("F = ma")).await.unwrap();
            assert_eq!(session.question_index, i + 1);
        }
        for letter in ["B", "C", "A", "D", "B"] {
            svc.dispatch(&mut session, answer(letter)).await.unwrap();
        }

        assert_eq!(session.stage, Stage::Done);
        assert_eq!(session.question_index, TOTAL_QUESTIONS);
        assert_eq!(session.results.len(), TOTAL_QUESTIONS);
        assert_eq!(session.score, 25);
        assert_eq!(GradingService::total_from_marks(&session.results), session.score);
        assert!(session.score <= MAX_SCORE);
        assert_eq!(session.results[0].ai_feedback, "Newton's second law.");
        assert_eq!(session.results[5].mark, "1/1");
    }

    #[tokio::test]
    async fn band_three_leniency_applies_to_conceptual_marks() {
        let svc = service(scripted("SCORE:1 MODEL:x"));
        let mut session = QuizSession::new();
        svc.dispatch(&mut session, login()).await.unwrap();
        svc.dispatch(&mut session, setup("3 – IGCSE 9-10")).await.unwrap();
        svc.dispatch(&mut session, answer("no idea")).await.unwrap();
        assert_eq!(session.score, 2);
        assert_eq!(session.results[0].mark, "2/5");
    }

    #[tokio::test]
    async fn actions_out_of_order_conflict() {
        let svc = service(MockTextGenerator::new());
        let mut session = QuizSession::new();
        let err = svc.dispatch(&mut session, setup("4")).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(session.stage, Stage::Login);
    }

    #[tokio::test]
    async fn blank_inputs_block_the_transition() {
        let svc = service(MockTextGenerator::new());
        let mut session = QuizSession::new();
        let err = svc
            .dispatch(&mut session, Action::Login(LoginAction { api_key: "   ".into() }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert_eq!(session.stage, Stage::Login);
    }

    #[tokio::test]
    async fn topic_outside_chapter_is_rejected_without_calling_the_model() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().never();
        let svc = service(mock);
        let mut session = QuizSession::new();
        svc.dispatch(&mut session, login()).await.unwrap();
        let err = svc
            .dispatch(
                &mut session,
                Action::Setup(SetupAction {
                    student: "Ada".into(),
                    chapter: "Mechanics".into(),
                    topic: "Relativity".into(),
                    difficulty: "4".into(),
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert_eq!(session.stage, Stage::Setup);
    }

    #[tokio::test]
    async fn malformed_batch_is_regenerated_once_then_fails_the_stage() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .times(2)
            .returning(|_, _, _| Ok("1. Question: only one A) a B) b C) c D) d Answer: A Explanation: e".to_string()));
        let svc = service(mock);
        let mut session = QuizSession::new();
        svc.dispatch(&mut session, login()).await.unwrap();

        let err = svc.dispatch(&mut session, setup("4")).await.unwrap_err();
        assert!(matches!(&err, Error::StageFailed { stage, .. } if stage == STAGE_MCQ_BATCH));
        assert!(err.is_retryable());
        assert_eq!(session.stage, Stage::Setup);
        assert_eq!(session.last_error.as_ref().map(|e| e.stage.as_str()), Some(STAGE_MCQ_BATCH));
    }

    #[tokio::test]
    async fn duplicate_questions_are_regenerated_until_new() {
        let replies = Arc::new(AtomicUsize::new(0));
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().returning(move |_, prompt, _| {
            if prompt.contains("Generate 5 distinct MCQs") {
                return Ok(FIVE_MCQS.to_string());
            }
            if prompt.contains("Return: SCORE") {
                return Ok("SCORE:5 MODEL:ok".to_string());
            }
            // First question, then the same one twice, then a fresh one.
            let n = replies.fetch_add(1, Ordering::SeqCst);
            Ok(match n {
                0..=2 => "What is inertia?".to_string(),
                _ => "What is momentum?".to_string(),
            })
        });
        let svc = service(mock);
        let mut session = QuizSession::new();
        svc.dispatch(&mut session, login()).await.unwrap();
        svc.dispatch(&mut session, setup("4")).await.unwrap();
        assert_eq!(session.current_question.as_deref(), Some("What is inertia?"));

        svc.dispatch(&mut session, answer("mass resists")).await.unwrap();
        assert_eq!(session.current_question.as_deref(), Some("What is momentum?"));
        assert!(!session.has_asked("What is momentum?"));
    }

    #[tokio::test]
    async fn endless_duplicates_fail_visibly_and_retry_recovers() {
        let fresh = Arc::new(AtomicUsize::new(0));
        let fresh_in_mock = fresh.clone();
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().returning(move |_, prompt, _| {
            if prompt.contains("Generate 5 distinct MCQs") {
                return Ok(FIVE_MCQS.to_string());
            }
            if prompt.contains("Return: SCORE") {
                return Ok("SCORE:3 MODEL:ok".to_string());
            }
            if fresh_in_mock.load(Ordering::SeqCst) == 1 {
                return Ok("Why do satellites stay in orbit?".to_string());
            }
            Ok("What is inertia?".to_string())
        });
        let svc = service(mock);
        let mut session = QuizSession::new();
        svc.dispatch(&mut session, login()).await.unwrap();
        svc.dispatch(&mut session, setup("4")).await.unwrap();
        svc.dispatch(&mut session, answer("mass resists")).await.unwrap();

        // The answer was recorded; the next question could not be prepared.
        assert_eq!(session.question_index, 1);
        assert_eq!(session.score, 3);
        assert!(session.current_question.is_none());
        let error = session.last_error.clone().unwrap();
        assert_eq!(error.stage, STAGE_CONCEPTUAL_QUESTION);
        assert!(error.retry);

        let err = svc.dispatch(&mut session, answer("too early")).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        fresh.store(1, Ordering::SeqCst);
        svc.dispatch(&mut session, Action::Retry).await.unwrap();
        assert_eq!(session.current_question.as_deref(), Some("Why do satellites stay in orbit?"));
        assert!(session.last_error.is_none());
        assert_eq!(session.score, 3);
    }

    #[tokio::test]
    async fn unparseable_grade_keeps_the_question_and_score() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().returning(|_, prompt, _| {
            if prompt.contains("Generate 5 distinct MCQs") {
                Ok(FIVE_MCQS.to_string())
            } else if prompt.contains("Return: SCORE") {
                Ok("I think this answer is fine.".to_string())
            } else {
                Ok("What is inertia?".to_string())
            }
        });
        let svc = service(mock);
        let mut session = QuizSession::new();
        svc.dispatch(&mut session, login()).await.unwrap();
        svc.dispatch(&mut session, setup("4")).await.unwrap();

        let err = svc.dispatch(&mut session, answer("mass resists")).await.unwrap_err();
        assert!(matches!(&err, Error::StageFailed { stage, .. } if stage == STAGE_GRADING));
        assert_eq!(session.question_index, 0);
        assert_eq!(session.score, 0);
        assert!(session.results.is_empty());
        assert_eq!(session.current_question.as_deref(), Some("What is inertia?"));
    }

    #[tokio::test]
    async fn invalid_mcq_letter_is_rejected() {
        let svc = service(scripted("SCORE:2 MODEL:x"));
        let mut session = QuizSession::new();
        svc.dispatch(&mut session, login()).await.unwrap();
        svc.dispatch(&mut session, setup("4")).await.unwrap();
        for _ in 0..5 {
            svc.dispatch(&mut session, answer("something")).await.unwrap();
        }
        let err = svc.dispatch(&mut session, answer("E")).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert_eq!(session.question_index, 5);

        svc.dispatch(&mut session, answer("B) Newton")).await.unwrap();
        assert_eq!(session.results[5].mark, "1/1");
    }

    #[tokio::test]
    async fn done_is_terminal() {
        let svc = service(scripted("SCORE:0 MODEL:x"));
        let mut session = QuizSession::new();
        svc.dispatch(&mut session, login()).await.unwrap();
        svc.dispatch(&mut session, setup("4")).await.unwrap();
        for _ in 0..5 {
            svc.dispatch(&mut session, answer("guess")).await.unwrap();
        }
        for _ in 0..5 {
            svc.dispatch(&mut session, answer("A")).await.unwrap();
        }
        assert_eq!(session.stage, Stage::Done);
        assert_eq!(session.score, 1);
        let err = svc.dispatch(&mut session, answer("A")).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(session.question_index, TOTAL_QUESTIONS);
    }

    #[tokio::test]
    async fn retry_after_grading_failure_regrades_the_same_answer() {
        let grade_calls = Arc::new(AtomicUsize::new(0));
        let calls = grade_calls.clone();
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().returning(move |_, prompt, _| {
            if prompt.contains("Generate 5 distinct MCQs") {
                Ok(FIVE_MCQS.to_string())
            } else if prompt.contains("Return: SCORE") {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => Ok("garbage".to_string()),
                    _ => Ok("SCORE:4 MODEL:Inertia resists change.".to_string()),
                }
            } else if prompt.contains("'What is inertia?'") {
                Ok("What is momentum?".to_string())
            } else {
                Ok("What is inertia?".to_string())
            }
        });
        let svc = service(mock);
        let mut session = QuizSession::new();
        svc.dispatch(&mut session, login()).await.unwrap();
        svc.dispatch(&mut session, setup("4")).await.unwrap();

        svc.dispatch(&mut session, answer("mass resists")).await.unwrap_err();
        assert_eq!(grade_calls.load(Ordering::SeqCst), 2);
        assert!(session.last_error.as_ref().is_some_and(|e| e.stage == STAGE_GRADING && e.retry));
        assert_eq!(session.question_index, 0);

        svc.dispatch(&mut session, Action::Retry).await.unwrap();
        assert_eq!(grade_calls.load(Ordering::SeqCst), 3);
        assert_eq!(session.question_index, 1);
        assert_eq!(session.score, 4);
        assert_eq!(session.results[0].student_answer, "mass resists");
        assert_eq!(session.results[0].ai_feedback, "Inertia resists change.");
        assert_eq!(session.current_question.as_deref(), Some("What is momentum?"));
        assert!(session.last_error.is_none());
        assert!(session.pending.is_none());

        let err = svc.dispatch(&mut session, Action::Retry).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn retry_after_batch_failure_fetches_the_batch_again() {
        let batch_calls = Arc::new(AtomicUsize::new(0));
        let calls = batch_calls.clone();
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().returning(move |_, prompt, _| {
            if prompt.contains("Generate 5 distinct MCQs") {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => Ok("Sorry, I cannot help with that.".to_string()),
                    _ => Ok(FIVE_MCQS.to_string()),
                }
            } else {
                Ok("What is inertia?".to_string())
            }
        });
        let svc = service(mock);
        let mut session = QuizSession::new();
        svc.dispatch(&mut session, login()).await.unwrap();

        let err = svc.dispatch(&mut session, Action::Retry).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        svc.dispatch(&mut session, setup("4")).await.unwrap_err();
        assert_eq!(batch_calls.load(Ordering::SeqCst), 2);
        assert_eq!(session.stage, Stage::Setup);
        assert!(session.last_error.as_ref().is_some_and(|e| e.stage == STAGE_MCQ_BATCH && e.retry));

        svc.dispatch(&mut session, Action::Retry).await.unwrap();
        assert_eq!(batch_calls.load(Ordering::SeqCst), 3);
        assert_eq!(session.stage, Stage::Quiz);
        assert_eq!(session.mcq_batch.len(), 5);
        assert_eq!(session.selection.as_ref().map(|s| s.topic.as_str()), Some("Dynamics"));
        assert_eq!(session.current_question.as_deref(), Some("What is inertia?"));
        assert!(session.last_error.is_none());
    }
}
