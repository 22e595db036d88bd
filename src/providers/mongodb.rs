use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId},
    options::{ClientOptions, FindOptions, IndexOptions},
    Client, Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};

use crate::domains::conversation::{Conversation, ConversationStatus, DEFAULT_TITLE};
use crate::domains::message::{Message, MessageRole};
use crate::domains::now_ms;
use crate::domains::user::{NewUser, User};
use crate::error::{Result, SupportDeskError};
use crate::interfaces::providers::SupportStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    name: String,
    email: String,
    password: String,
    created_at: i64,
    updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConversationDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    user_id: ObjectId,
    title: String,
    preview: String,
    status: String,
    escalation_notes: String,
    created_at: i64,
    updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MessageDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    conversation_id: ObjectId,
    role: String,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    embedding: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
    created_at: i64,
}

/// Document-database store. Ownership filters are part of every conversation
/// query so a foreign id behaves exactly like a missing one.
pub struct MongoStore {
    db: Database,
    users: Collection<UserDoc>,
    conversations: Collection<ConversationDoc>,
    messages: Collection<MessageDoc>,
}

impl MongoStore {
    pub async fn new(connection_string: &str, database: &str) -> Result<Self> {
        let mut options = ClientOptions::parse(connection_string)
            .await
            .map_err(|e| SupportDeskError::Storage(e.to_string()))?;
        options.app_name = Some("support-desk".to_string());
        let client =
            Client::with_options(options).map_err(|e| SupportDeskError::Storage(e.to_string()))?;
        let db = client.database(database);

        let store = Self {
            users: db.collection::<UserDoc>("users"),
            conversations: db.collection::<ConversationDoc>("conversations"),
            messages: db.collection::<MessageDoc>("messages"),
            db,
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    /// Both compound indexes are load-bearing: the conversation list reads
    /// "most recently updated first" and the prompt builder reads "ordered
    /// history" through them.
    async fn ensure_indexes(&self) -> Result<()> {
        let unique_email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.users
            .create_index(unique_email, None)
            .await
            .map_err(|e| SupportDeskError::Storage(e.to_string()))?;

        let by_user_recency = IndexModel::builder()
            .keys(doc! { "user_id": 1, "updated_at": -1 })
            .build();
        self.conversations
            .create_index(by_user_recency, None)
            .await
            .map_err(|e| SupportDeskError::Storage(e.to_string()))?;

        let by_conversation_order = IndexModel::builder()
            .keys(doc! { "conversation_id": 1, "created_at": 1 })
            .build();
        self.messages
            .create_index(by_conversation_order, None)
            .await
            .map_err(|e| SupportDeskError::Storage(e.to_string()))?;
        Ok(())
    }

    fn parse_object_id(id: &str) -> Option<ObjectId> {
        ObjectId::parse_str(id).ok()
    }
}

fn user_from_doc(doc: UserDoc) -> User {
    User {
        id: doc.id.map(|id| id.to_hex()).unwrap_or_default(),
        name: doc.name,
        email: doc.email,
        password_hash: doc.password,
        created_at: doc.created_at,
        updated_at: doc.updated_at,
    }
}

fn conversation_from_doc(doc: ConversationDoc) -> Conversation {
    Conversation {
        id: doc.id.map(|id| id.to_hex()).unwrap_or_default(),
        user_id: doc.user_id.to_hex(),
        title: doc.title,
        preview: doc.preview,
        status: status_from_str(&doc.status),
        escalation_notes: doc.escalation_notes,
        created_at: doc.created_at,
        updated_at: doc.updated_at,
    }
}

fn message_from_doc(doc: MessageDoc) -> Message {
    Message {
        id: doc.id.map(|id| id.to_hex()).unwrap_or_default(),
        conversation_id: doc.conversation_id.to_hex(),
        role: role_from_str(&doc.role),
        text: doc.text,
        embedding: doc.embedding,
        metadata: doc.metadata,
        created_at: doc.created_at,
    }
}

fn status_from_str(status: &str) -> ConversationStatus {
    match status {
        "resolved" => ConversationStatus::Resolved,
        "escalated" => ConversationStatus::Escalated,
        _ => ConversationStatus::Active,
    }
}

fn role_from_str(role: &str) -> MessageRole {
    match role {
        "assistant" => MessageRole::Assistant,
        _ => MessageRole::User,
    }
}

#[async_trait]
impl SupportStore for MongoStore {
    async fn ping(&self) -> Result<()> {
        self.db
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| SupportDeskError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let now = now_ms();
        let doc = UserDoc {
            id: None,
            name: user.name,
            email: user.email,
            password: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        let result = self
            .users
            .insert_one(&doc, None)
            .await
            .map_err(|e| SupportDeskError::Storage(e.to_string()))?;
        let mut user = user_from_doc(doc);
        if let Some(id) = result.inserted_id.as_object_id() {
            user.id = id.to_hex();
        }
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let doc = self
            .users
            .find_one(doc! { "email": email }, None)
            .await
            .map_err(|e| SupportDeskError::Storage(e.to_string()))?;
        Ok(doc.map(user_from_doc))
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let Some(id) = Self::parse_object_id(id) else {
            return Ok(None);
        };
        let doc = self
            .users
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| SupportDeskError::Storage(e.to_string()))?;
        Ok(doc.map(user_from_doc))
    }

    async fn update_user_password(&self, id: &str, password_hash: &str) -> Result<()> {
        let id = Self::parse_object_id(id)
            .ok_or_else(|| SupportDeskError::NotFound("user not found".to_string()))?;
        self.users
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "password": password_hash, "updated_at": now_ms() } },
                None,
            )
            .await
            .map_err(|e| SupportDeskError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn insert_conversation(&self, user_id: &str) -> Result<Conversation> {
        let user_id = Self::parse_object_id(user_id)
            .ok_or_else(|| SupportDeskError::NotFound("user not found".to_string()))?;
        let now = now_ms();
        let doc = ConversationDoc {
            id: None,
            user_id,
            title: DEFAULT_TITLE.to_string(),
            preview: String::new(),
            status: ConversationStatus::Active.as_str().to_string(),
            escalation_notes: String::new(),
            created_at: now,
            updated_at: now,
        };
        let result = self
            .conversations
            .insert_one(&doc, None)
            .await
            .map_err(|e| SupportDeskError::Storage(e.to_string()))?;
        let mut conversation = conversation_from_doc(doc);
        if let Some(id) = result.inserted_id.as_object_id() {
            conversation.id = id.to_hex();
        }
        Ok(conversation)
    }

    async fn find_conversation(&self, id: &str, user_id: &str) -> Result<Option<Conversation>> {
        let (Some(id), Some(user_id)) = (Self::parse_object_id(id), Self::parse_object_id(user_id))
        else {
            return Ok(None);
        };
        let doc = self
            .conversations
            .find_one(doc! { "_id": id, "user_id": user_id }, None)
            .await
            .map_err(|e| SupportDeskError::Storage(e.to_string()))?;
        Ok(doc.map(conversation_from_doc))
    }

    async fn list_conversations(&self, user_id: &str, limit: usize) -> Result<Vec<Conversation>> {
        let Some(user_id) = Self::parse_object_id(user_id) else {
            return Ok(Vec::new());
        };
        let options = FindOptions::builder()
            .sort(doc! { "updated_at": -1 })
            .limit(limit as i64)
            .build();
        let mut cursor = self
            .conversations
            .find(doc! { "user_id": user_id }, options)
            .await
            .map_err(|e| SupportDeskError::Storage(e.to_string()))?;

        let mut conversations = Vec::new();
        while let Some(doc) = cursor
            .try_next()
            .await
            .map_err(|e| SupportDeskError::Storage(e.to_string()))?
        {
            conversations.push(conversation_from_doc(doc));
        }
        Ok(conversations)
    }

    async fn update_conversation(&self, conversation: &Conversation) -> Result<()> {
        let id = Self::parse_object_id(&conversation.id)
            .ok_or_else(|| SupportDeskError::NotFound("conversation not found".to_string()))?;
        self.conversations
            .update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "title": &conversation.title,
                    "preview": &conversation.preview,
                    "status": conversation.status.as_str(),
                    "escalation_notes": &conversation.escalation_notes,
                    "updated_at": conversation.updated_at,
                } },
                None,
            )
            .await
            .map_err(|e| SupportDeskError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn delete_conversation(&self, id: &str) -> Result<()> {
        let Some(id) = Self::parse_object_id(id) else {
            return Ok(());
        };
        // Child messages first so a crash in between leaves no orphans.
        self.messages
            .delete_many(doc! { "conversation_id": id }, None)
            .await
            .map_err(|e| SupportDeskError::Storage(e.to_string()))?;
        self.conversations
            .delete_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| SupportDeskError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        text: &str,
    ) -> Result<Message> {
        let conversation_id = Self::parse_object_id(conversation_id)
            .ok_or_else(|| SupportDeskError::NotFound("conversation not found".to_string()))?;
        let doc = MessageDoc {
            id: None,
            conversation_id,
            role: role.as_str().to_string(),
            text: text.to_string(),
            embedding: None,
            metadata: None,
            created_at: now_ms(),
        };
        let result = self
            .messages
            .insert_one(&doc, None)
            .await
            .map_err(|e| SupportDeskError::Storage(e.to_string()))?;
        let mut message = message_from_doc(doc);
        if let Some(id) = result.inserted_id.as_object_id() {
            message.id = id.to_hex();
        }
        Ok(message)
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let Some(conversation_id) = Self::parse_object_id(conversation_id) else {
            return Ok(Vec::new());
        };
        let options = FindOptions::builder()
            .sort(doc! { "created_at": 1, "_id": 1 })
            .build();
        let mut cursor = self
            .messages
            .find(doc! { "conversation_id": conversation_id }, options)
            .await
            .map_err(|e| SupportDeskError::Storage(e.to_string()))?;

        let mut messages = Vec::new();
        while let Some(doc) = cursor
            .try_next()
            .await
            .map_err(|e| SupportDeskError::Storage(e.to_string()))?
        {
            messages.push(message_from_doc(doc));
        }
        Ok(messages)
    }

    async fn recent_messages(&self, conversation_id: &str, limit: usize) -> Result<Vec<Message>> {
        let Some(conversation_id) = Self::parse_object_id(conversation_id) else {
            return Ok(Vec::new());
        };
        // Newest-first with a limit, then reversed, so the window is the tail
        // of the conversation in oldest-first order. `_id` breaks same-
        // millisecond ties so a user/assistant pair never splits or reorders.
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1, "_id": -1 })
            .limit(limit as i64)
            .build();
        let mut cursor = self
            .messages
            .find(doc! { "conversation_id": conversation_id }, options)
            .await
            .map_err(|e| SupportDeskError::Storage(e.to_string()))?;

        let mut messages = Vec::new();
        while let Some(doc) = cursor
            .try_next()
            .await
            .map_err(|e| SupportDeskError::Storage(e.to_string()))?
        {
            messages.push(message_from_doc(doc));
        }
        messages.reverse();
        Ok(messages)
    }
}
