pub mod calendar_service;
pub mod coach;
pub mod commands;
pub mod oauth;
