pub mod mailer;
pub mod memory;
pub mod mongodb;
pub mod openai;
