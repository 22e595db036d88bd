use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::daemon::AppState;
use crate::error::{Result, SupportDeskError};
use crate::interfaces::providers::{LlmProvider, Notifier, SupportStore};
use crate::providers::mailer::HttpMailer;
use crate::providers::mongodb::MongoStore;
use crate::providers::openai::OpenAiProvider;
use crate::services::auth::AuthService;
use crate::services::orchestrator::ConversationOrchestrator;

/// Wires config into the process-wide services: one store, one gateway and
/// one notifier, built at startup and shared by reference with every request.
pub struct SupportDesk {
    auth: Arc<AuthService>,
    orchestrator: Arc<ConversationOrchestrator>,
    store: Arc<dyn SupportStore>,
}

impl SupportDesk {
    pub async fn from_config(config: Config) -> Result<Self> {
        let uri = config
            .mongodb
            .uri
            .clone()
            .ok_or_else(|| SupportDeskError::Config("mongodb.uri is required".to_string()))?;
        let database = config
            .mongodb
            .database
            .clone()
            .unwrap_or_else(|| "support_desk".to_string());
        let store: Arc<dyn SupportStore> = Arc::new(MongoStore::new(&uri, &database).await?);

        let api_key = config
            .openai
            .api_key
            .clone()
            .ok_or_else(|| SupportDeskError::Config("openai.api_key is required".to_string()))?;
        let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::new(
            api_key,
            config.openai.model.clone(),
            config.openai.base_url.clone(),
        ));

        let mail = &config.mail;
        let notifier: Arc<dyn Notifier> = Arc::new(HttpMailer::new(
            mail.api_url
                .clone()
                .ok_or_else(|| SupportDeskError::Config("mail.api_url is required".to_string()))?,
            mail.api_key.clone().unwrap_or_default(),
            mail.from
                .clone()
                .unwrap_or_else(|| "support@localhost".to_string()),
            mail.support_address
                .clone()
                .unwrap_or_else(|| "support-team@localhost".to_string()),
            mail.frontend_url
                .clone()
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
        ));

        let secret = config
            .auth
            .secret
            .clone()
            .ok_or_else(|| SupportDeskError::Config("auth.secret is required".to_string()))?;

        Ok(Self::from_parts(store, llm, notifier, secret))
    }

    pub async fn from_config_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::from_file(path)?.resolve_env();
        Self::from_config(config).await
    }

    /// Assembly seam shared with tests, which substitute in-memory providers.
    pub fn from_parts(
        store: Arc<dyn SupportStore>,
        llm: Arc<dyn LlmProvider>,
        notifier: Arc<dyn Notifier>,
        secret: String,
    ) -> Self {
        let auth = Arc::new(AuthService::new(store.clone(), notifier.clone(), secret));
        let orchestrator = Arc::new(ConversationOrchestrator::new(store.clone(), llm, notifier));
        Self {
            auth,
            orchestrator,
            store,
        }
    }

    pub fn auth(&self) -> Arc<AuthService> {
        self.auth.clone()
    }

    pub fn orchestrator(&self) -> Arc<ConversationOrchestrator> {
        self.orchestrator.clone()
    }

    pub fn into_state(self) -> AppState {
        AppState {
            auth: self.auth,
            orchestrator: self.orchestrator,
            store: self.store,
        }
    }
}
