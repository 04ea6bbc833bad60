pub mod action_dto;
pub mod screen_dto;
