#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use support_desk::domains::user::{NewUser, User};
use support_desk::error::{Result, SupportDeskError};
use support_desk::interfaces::providers::{LlmProvider, Notifier, SupportStore};
use support_desk::providers::memory::InMemoryStore;
use support_desk::services::auth::AuthService;
use support_desk::services::orchestrator::ConversationOrchestrator;

/// Pops scripted replies in order and records every prompt it sees; once the
/// queue is empty it answers with a fixed default.
pub struct QueueLlmProvider {
    queue: Mutex<VecDeque<String>>,
    pub prompts: Mutex<Vec<(String, String)>>,
}

impl QueueLlmProvider {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            queue: Mutex::new(replies.into_iter().map(String::from).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub async fn recorded_prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl LlmProvider for QueueLlmProvider {
    async fn generate_text(&self, prompt: &str, system_prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .await
            .push((prompt.to_string(), system_prompt.to_string()));
        let mut guard = self.queue.lock().await;
        Ok(guard.pop_front().unwrap_or_else(|| "mock reply".to_string()))
    }
}

/// Every generation call fails, as if the gateway were unreachable.
pub struct FailingLlmProvider;

#[async_trait]
impl LlmProvider for FailingLlmProvider {
    async fn generate_text(&self, _prompt: &str, _system_prompt: &str) -> Result<String> {
        Err(SupportDeskError::Upstream("gateway unreachable".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailCall {
    PasswordReset { email: String, token: String },
    EscalationAlert { customer_email: String, notes: String },
    SummaryCopy { email: String, summary: String },
}

/// Records every attempted delivery; individual kinds can be made to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    pub calls: Mutex<Vec<MailCall>>,
    pub fail_reset: bool,
    pub fail_alert: bool,
    pub fail_copy: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_alert() -> Self {
        Self {
            fail_alert: true,
            ..Self::default()
        }
    }

    pub async fn recorded_calls(&self) -> Vec<MailCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_password_reset(&self, email: &str, token: &str) -> Result<()> {
        self.calls.lock().await.push(MailCall::PasswordReset {
            email: email.to_string(),
            token: token.to_string(),
        });
        if self.fail_reset {
            return Err(SupportDeskError::Upstream("mail relay down".to_string()));
        }
        Ok(())
    }

    async fn send_escalation_alert(
        &self,
        customer_email: &str,
        _summary: &str,
        notes: &str,
    ) -> Result<()> {
        self.calls.lock().await.push(MailCall::EscalationAlert {
            customer_email: customer_email.to_string(),
            notes: notes.to_string(),
        });
        if self.fail_alert {
            return Err(SupportDeskError::Upstream("mail relay down".to_string()));
        }
        Ok(())
    }

    async fn send_summary_copy(&self, email: &str, summary: &str) -> Result<()> {
        self.calls.lock().await.push(MailCall::SummaryCopy {
            email: email.to_string(),
            summary: summary.to_string(),
        });
        if self.fail_copy {
            return Err(SupportDeskError::Upstream("mail relay down".to_string()));
        }
        Ok(())
    }
}

pub struct TestDesk {
    pub store: Arc<InMemoryStore>,
    pub llm: Arc<QueueLlmProvider>,
    pub notifier: Arc<RecordingNotifier>,
    pub auth: AuthService,
    pub orchestrator: ConversationOrchestrator,
}

/// Assembles the services over in-memory providers the way the client wires
/// the real ones.
pub fn test_desk(replies: Vec<&str>) -> TestDesk {
    test_desk_with_notifier(replies, RecordingNotifier::new())
}

pub fn test_desk_with_notifier(replies: Vec<&str>, notifier: RecordingNotifier) -> TestDesk {
    let store = Arc::new(InMemoryStore::new());
    let llm = Arc::new(QueueLlmProvider::new(replies));
    let notifier = Arc::new(notifier);
    let auth = AuthService::new(
        store.clone(),
        notifier.clone(),
        "test-secret".to_string(),
    );
    let orchestrator =
        ConversationOrchestrator::new(store.clone(), llm.clone(), notifier.clone());
    TestDesk {
        store,
        llm,
        notifier,
        auth,
        orchestrator,
    }
}

/// Inserts a user without going through bcrypt, for orchestrator tests that
/// never exercise login.
pub async fn seed_user(store: &dyn SupportStore, email: &str) -> User {
    store
        .insert_user(NewUser {
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: "unused".to_string(),
        })
        .await
        .unwrap()
}
