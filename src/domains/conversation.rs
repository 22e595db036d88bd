use serde::{Deserialize, Serialize};

pub const DEFAULT_TITLE: &str = "New Conversation";
pub const TITLE_LIMIT: usize = 50;
pub const PREVIEW_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Active,
    Resolved,
    Escalated,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Active => "active",
            ConversationStatus::Resolved => "resolved",
            ConversationStatus::Escalated => "escalated",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub title: String,
    /// Last sent user message, truncated to [`PREVIEW_LIMIT`] characters.
    pub preview: String,
    pub status: ConversationStatus,
    pub escalation_notes: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Conversation {
    /// Single source of truth for the escalation flag: the status enum.
    pub fn escalated(&self) -> bool {
        self.status == ConversationStatus::Escalated
    }

    /// Applies the per-send bookkeeping: preview always follows the latest
    /// user text; the title is locked once it differs from the default.
    pub fn touch_for_send(&mut self, user_text: &str, now: i64) {
        self.preview = truncate_chars(user_text, PREVIEW_LIMIT);
        if self.title == DEFAULT_TITLE {
            self.title = truncate_chars(user_text, TITLE_LIMIT);
        }
        self.updated_at = now;
    }

    pub fn mark_escalated(&mut self, notes: &str, now: i64) {
        self.status = ConversationStatus::Escalated;
        self.escalation_notes = notes.to_string();
        self.updated_at = now;
    }
}

/// Character-boundary-safe prefix, since byte slicing can split UTF-8.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
