pub mod auth;
pub mod orchestrator;
pub mod prompt;
