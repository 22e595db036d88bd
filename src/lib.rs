pub mod client;
pub mod config;
pub mod daemon;
pub mod domains;
pub mod error;
pub mod interfaces;
pub mod providers;
pub mod services;

pub use crate::client::SupportDesk;
pub use crate::config::Config;
pub use crate::error::{Result, SupportDeskError};
pub use crate::services::orchestrator::{EscalationOutcome, SendOutcome, Sentiment};
