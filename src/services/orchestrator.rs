use std::sync::Arc;

use serde::Serialize;

use crate::domains::conversation::Conversation;
use crate::domains::message::{Message, MessageRole};
use crate::domains::now_ms;
use crate::domains::user::User;
use crate::error::{Result, SupportDeskError};
use crate::interfaces::providers::{LlmProvider, Notifier, SupportStore};
use crate::services::prompt;

/// How many trailing messages feed the reply prompt.
pub const HISTORY_WINDOW: usize = 20;
/// How many trailing messages feed the escalation heuristic.
pub const ESCALATION_WINDOW: usize = 10;
/// Below this many messages the heuristic never suggests escalation.
pub const ESCALATION_MIN_MESSAGES: usize = 3;
pub const CONVERSATION_LIST_LIMIT: usize = 50;

pub const FALLBACK_REPLY: &str = "I apologize, but I'm having trouble processing your request right now. Please try again or contact our support team directly.";
pub const EMPTY_SUMMARY: &str = "No messages in conversation.";
pub const BLANK_SUMMARY: &str = "Unable to generate summary.";
pub const FAILED_SUMMARY: &str = "Error generating conversation summary.";

/// Result of one user turn.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    /// The persisted assistant message (real reply or apology fallback).
    pub message: Message,
    /// False when the gateway failed and the fallback text was used.
    pub reply_generated: bool,
    /// Advisory only; does not change the conversation's status.
    pub escalation_suggested: bool,
}

#[derive(Debug, Clone)]
pub struct EscalationOutcome {
    pub escalation_id: String,
    pub summary: String,
    pub alert_sent: bool,
    pub copy_sent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// Drives one user turn to completion: persistence on both sides of the
/// exchange, the gateway call in between, conversation bookkeeping, and the
/// escalation policies layered on the same history.
pub struct ConversationOrchestrator {
    store: Arc<dyn SupportStore>,
    llm: Arc<dyn LlmProvider>,
    notifier: Arc<dyn Notifier>,
}

impl ConversationOrchestrator {
    pub fn new(
        store: Arc<dyn SupportStore>,
        llm: Arc<dyn LlmProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            llm,
            notifier,
        }
    }

    pub async fn create_conversation(&self, user: &User) -> Result<Conversation> {
        self.store.insert_conversation(&user.id).await
    }

    pub async fn list_conversations(&self, user: &User) -> Result<Vec<Conversation>> {
        self.store
            .list_conversations(&user.id, CONVERSATION_LIST_LIMIT)
            .await
    }

    pub async fn delete_conversation(&self, conversation_id: &str, user: &User) -> Result<()> {
        let conversation = self.require_conversation(conversation_id, user).await?;
        self.store.delete_conversation(&conversation.id).await
    }

    pub async fn list_messages(&self, conversation_id: &str, user: &User) -> Result<Vec<Message>> {
        let conversation = self.require_conversation(conversation_id, user).await?;
        self.store.list_messages(&conversation.id).await
    }

    /// One user turn. The user message is durably written before the gateway
    /// is invoked, so the customer's text survives a model failure; the
    /// assistant side is persisted either way (fallback apology included).
    pub async fn send_message(
        &self,
        conversation_id: &str,
        user: &User,
        text: &str,
    ) -> Result<SendOutcome> {
        let mut conversation = self.require_conversation(conversation_id, user).await?;
        if text.trim().is_empty() {
            return Err(SupportDeskError::Validation(
                "message text is required".to_string(),
            ));
        }

        // Prior turns only; the new message is appended to the prompt itself.
        let history = self
            .store
            .recent_messages(&conversation.id, HISTORY_WINDOW)
            .await?;

        self.store
            .append_message(&conversation.id, MessageRole::User, text)
            .await?;

        let reply_prompt = prompt::build_reply_prompt(&prompt::render_history(&history), text);
        let (reply, reply_generated) = match self
            .llm
            .generate_text(&reply_prompt, prompt::SYSTEM_PERSONA)
            .await
        {
            Ok(reply) => (reply, true),
            Err(err) => {
                tracing::warn!(error = %err, conversation_id, "reply generation failed");
                (FALLBACK_REPLY.to_string(), false)
            }
        };

        let message = self
            .store
            .append_message(&conversation.id, MessageRole::Assistant, &reply)
            .await?;

        conversation.touch_for_send(text, now_ms());
        self.store.update_conversation(&conversation).await?;

        let escalation_suggested = self.should_escalate(&conversation.id).await;

        Ok(SendOutcome {
            message,
            reply_generated,
            escalation_suggested,
        })
    }

    /// Advisory escalation check over the trailing window. Opt-in by design:
    /// only an exact affirmative from the gateway escalates, and every
    /// failure mode answers "do not escalate".
    pub async fn should_escalate(&self, conversation_id: &str) -> bool {
        let window = match self
            .store
            .recent_messages(conversation_id, ESCALATION_WINDOW)
            .await
        {
            Ok(window) => window,
            Err(err) => {
                tracing::warn!(error = %err, conversation_id, "escalation check skipped");
                return false;
            }
        };
        // Cold-start guard against false positives on short exchanges.
        if window.len() < ESCALATION_MIN_MESSAGES {
            return false;
        }

        let escalation_prompt = prompt::build_escalation_prompt(&prompt::render_history(&window));
        match self.llm.generate_text(&escalation_prompt, "").await {
            Ok(decision) => decision.trim().to_uppercase() == prompt::AFFIRMATIVE_TOKEN,
            Err(err) => {
                tracing::warn!(error = %err, conversation_id, "escalation check failed");
                false
            }
        }
    }

    /// Natural-language summary of the full history, with literal fallbacks
    /// so escalation never aborts on a gateway failure.
    pub async fn summarize(&self, conversation_id: &str) -> Result<String> {
        let messages = self.store.list_messages(conversation_id).await?;
        if messages.is_empty() {
            return Ok(EMPTY_SUMMARY.to_string());
        }

        let conversation_text = messages
            .iter()
            .map(|msg| format!("{}: {}", msg.role.prompt_label(), msg.text))
            .collect::<Vec<_>>()
            .join("\n\n");
        let summary_prompt = prompt::build_summary_prompt(&conversation_text);

        match self.llm.generate_text(&summary_prompt, "").await {
            Ok(summary) if summary.trim().is_empty() => Ok(BLANK_SUMMARY.to_string()),
            Ok(summary) => Ok(summary),
            Err(err) => {
                tracing::warn!(error = %err, conversation_id, "summary generation failed");
                Ok(FAILED_SUMMARY.to_string())
            }
        }
    }

    /// Hands the conversation off to a human: summary, status flip, then two
    /// best-effort notifications. The persisted escalation is authoritative
    /// regardless of mail delivery.
    pub async fn escalate(
        &self,
        conversation_id: &str,
        user: &User,
        contact_email: &str,
        notes: Option<&str>,
    ) -> Result<EscalationOutcome> {
        let mut conversation = self.require_conversation(conversation_id, user).await?;

        let summary = self.summarize(&conversation.id).await?;
        conversation.mark_escalated(notes.unwrap_or(""), now_ms());
        self.store.update_conversation(&conversation).await?;

        let alert_sent = match self
            .notifier
            .send_escalation_alert(contact_email, &summary, notes.unwrap_or(""))
            .await
        {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, conversation_id, "escalation alert failed");
                false
            }
        };
        let copy_sent = match self.notifier.send_summary_copy(contact_email, &summary).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, conversation_id, "summary copy failed");
                false
            }
        };

        Ok(EscalationOutcome {
            escalation_id: conversation.id,
            summary,
            alert_sent,
            copy_sent,
        })
    }

    /// Single-shot three-label classification; anything outside the closed
    /// label set (gateway failures included) maps to neutral.
    pub async fn classify_sentiment(&self, text: &str) -> Sentiment {
        let sentiment_prompt = prompt::build_sentiment_prompt(text);
        match self.llm.generate_text(&sentiment_prompt, "").await {
            Ok(label) => match label.trim().to_lowercase().as_str() {
                "positive" => Sentiment::Positive,
                "negative" => Sentiment::Negative,
                _ => Sentiment::Neutral,
            },
            Err(err) => {
                tracing::warn!(error = %err, "sentiment classification failed");
                Sentiment::Neutral
            }
        }
    }

    /// Ownership and existence collapse into one NotFound so the endpoint
    /// never reveals whether a foreign conversation exists.
    async fn require_conversation(
        &self,
        conversation_id: &str,
        user: &User,
    ) -> Result<Conversation> {
        self.store
            .find_conversation(conversation_id, &user.id)
            .await?
            .ok_or_else(|| SupportDeskError::NotFound("conversation not found".to_string()))
    }
}
