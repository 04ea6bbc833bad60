pub mod gemini_service;
pub mod grading_service;
pub mod model_client;
pub mod parser_service;
pub mod prompt_service;
pub mod quiz_service;
pub mod session_service;
