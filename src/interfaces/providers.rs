use async_trait::async_trait;

use crate::domains::conversation::Conversation;
use crate::domains::message::{Message, MessageRole};
use crate::domains::user::{NewUser, User};
use crate::error::Result;

/// The hosted text-generation capability. One awaited call, no streaming and
/// no retries; callers convert failures into per-site fallback values.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate_text(&self, prompt: &str, system_prompt: &str) -> Result<String>;
}

/// Persistence for users, conversations and messages. Ownership filters live
/// in the store so a conversation that exists but belongs to someone else is
/// indistinguishable from one that does not exist.
#[async_trait]
pub trait SupportStore: Send + Sync {
    /// Cheap reachability probe for the health endpoint.
    async fn ping(&self) -> Result<()>;

    async fn insert_user(&self, user: NewUser) -> Result<User>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>>;
    async fn update_user_password(&self, id: &str, password_hash: &str) -> Result<()>;

    async fn insert_conversation(&self, user_id: &str) -> Result<Conversation>;
    async fn find_conversation(&self, id: &str, user_id: &str) -> Result<Option<Conversation>>;
    /// Most recently updated first.
    async fn list_conversations(&self, user_id: &str, limit: usize) -> Result<Vec<Conversation>>;
    async fn update_conversation(&self, conversation: &Conversation) -> Result<()>;
    /// Deletes the conversation and cascades to its messages.
    async fn delete_conversation(&self, id: &str) -> Result<()>;

    async fn append_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        text: &str,
    ) -> Result<Message>;
    /// Full history, ordered oldest to newest.
    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>>;
    /// The last `limit` messages, still ordered oldest to newest.
    async fn recent_messages(&self, conversation_id: &str, limit: usize) -> Result<Vec<Message>>;
}

/// Outbound email. Every call is best-effort from the orchestrator's point of
/// view: failures are returned so the caller can log them, never to roll back
/// already-persisted state.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_password_reset(&self, email: &str, token: &str) -> Result<()>;
    async fn send_escalation_alert(
        &self,
        customer_email: &str,
        summary: &str,
        notes: &str,
    ) -> Result<()>;
    async fn send_summary_copy(&self, email: &str, summary: &str) -> Result<()>;
}
