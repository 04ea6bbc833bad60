use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginAction {
    #[validate(length(min = 1, max = 512, message = "API key is required"))]
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SetupAction {
    #[validate(length(min = 1, max = 120, message = "Student name is required"))]
    pub student: String,
    #[validate(length(min = 1, message = "Chapter is required"))]
    pub chapter: String,
    #[validate(length(min = 1, message = "Topic is required"))]
    pub topic: String,
    /// Band id (`"3"`) or its display form (`"3 – IGCSE 9-10"`).
    #[validate(length(min = 1, message = "Difficulty band is required"))]
    pub difficulty: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnswerAction {
    #[validate(length(min = 1, max = 8000, message = "Answer is required"))]
    pub answer: String,
}

/// One user interaction. Each dispatch performs at most one transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Login(LoginAction),
    Setup(SetupAction),
    Answer(AnswerAction),
    Retry,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Login(_) => "login",
            Action::Setup(_) => "setup",
            Action::Answer(_) => "answer",
            Action::Retry => "retry",
        }
    }
}
