pub mod calendar_cache;
pub mod config;
pub mod credential_store;
pub mod error;
pub mod event_mapper;
pub mod gemini_client;
pub mod google_calendar_client;
pub mod logging;
pub mod oauth_client;
