use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domains::conversation::{Conversation, ConversationStatus, DEFAULT_TITLE};
use crate::domains::message::{Message, MessageRole};
use crate::domains::now_ms;
use crate::domains::user::{NewUser, User};
use crate::error::{Result, SupportDeskError};
use crate::interfaces::providers::SupportStore;

/// Store backed by process memory. Used by tests and local runs without a
/// database; messages keep insertion order per conversation.
#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<Vec<User>>,
    conversations: RwLock<HashMap<String, Conversation>>,
    messages: RwLock<HashMap<String, Vec<Message>>>,
    next_id: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}-{n}")
    }
}

#[async_trait]
impl SupportStore for InMemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let mut guard = self.users.write().await;
        if guard.iter().any(|u| u.email == user.email) {
            return Err(SupportDeskError::Conflict(
                "email already exists".to_string(),
            ));
        }
        let now = now_ms();
        let user = User {
            id: self.next_id("u"),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        guard.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let guard = self.users.read().await;
        Ok(guard.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let guard = self.users.read().await;
        Ok(guard.iter().find(|u| u.id == id).cloned())
    }

    async fn update_user_password(&self, id: &str, password_hash: &str) -> Result<()> {
        let mut guard = self.users.write().await;
        let user = guard
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| SupportDeskError::NotFound("user not found".to_string()))?;
        user.password_hash = password_hash.to_string();
        user.updated_at = now_ms();
        Ok(())
    }

    async fn insert_conversation(&self, user_id: &str) -> Result<Conversation> {
        let now = now_ms();
        let conversation = Conversation {
            id: self.next_id("c"),
            user_id: user_id.to_string(),
            title: DEFAULT_TITLE.to_string(),
            preview: String::new(),
            status: ConversationStatus::Active,
            escalation_notes: String::new(),
            created_at: now,
            updated_at: now,
        };
        let mut guard = self.conversations.write().await;
        guard.insert(conversation.id.clone(), conversation.clone());
        Ok(conversation)
    }

    async fn find_conversation(&self, id: &str, user_id: &str) -> Result<Option<Conversation>> {
        let guard = self.conversations.read().await;
        Ok(guard
            .get(id)
            .filter(|conv| conv.user_id == user_id)
            .cloned())
    }

    async fn list_conversations(&self, user_id: &str, limit: usize) -> Result<Vec<Conversation>> {
        let guard = self.conversations.read().await;
        let mut conversations: Vec<Conversation> = guard
            .values()
            .filter(|conv| conv.user_id == user_id)
            .cloned()
            .collect();
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        conversations.truncate(limit);
        Ok(conversations)
    }

    async fn update_conversation(&self, conversation: &Conversation) -> Result<()> {
        let mut guard = self.conversations.write().await;
        match guard.get_mut(&conversation.id) {
            Some(existing) => {
                *existing = conversation.clone();
                Ok(())
            }
            None => Err(SupportDeskError::NotFound(
                "conversation not found".to_string(),
            )),
        }
    }

    async fn delete_conversation(&self, id: &str) -> Result<()> {
        self.messages.write().await.remove(id);
        self.conversations.write().await.remove(id);
        Ok(())
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        text: &str,
    ) -> Result<Message> {
        let message = Message {
            id: self.next_id("m"),
            conversation_id: conversation_id.to_string(),
            role,
            text: text.to_string(),
            embedding: None,
            metadata: None,
            created_at: now_ms(),
        };
        let mut guard = self.messages.write().await;
        guard
            .entry(conversation_id.to_string())
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let guard = self.messages.read().await;
        Ok(guard.get(conversation_id).cloned().unwrap_or_default())
    }

    async fn recent_messages(&self, conversation_id: &str, limit: usize) -> Result<Vec<Message>> {
        let guard = self.messages.read().await;
        let mut messages = guard.get(conversation_id).cloned().unwrap_or_default();
        if messages.len() > limit {
            messages = messages.split_off(messages.len() - limit);
        }
        Ok(messages)
    }
}
