pub mod catalog;
pub mod question;
pub mod quiz_session;
