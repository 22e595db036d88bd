use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Result, SupportDeskError};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MongoConfig {
    pub uri: Option<String>,
    pub database: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MailConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub from: Option<String>,
    pub support_address: Option<String>,
    pub frontend_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub mongodb: MongoConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| SupportDeskError::Config(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| SupportDeskError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Fills secrets and connection strings from the environment when the
    /// file leaves them out, so credentials never have to live on disk.
    pub fn resolve_env(mut self) -> Self {
        if self.openai.api_key.is_none() {
            self.openai.api_key = std::env::var("OPENAI_API_KEY").ok();
        }
        if self.mongodb.uri.is_none() {
            self.mongodb.uri = std::env::var("MONGODB_URI").ok();
        }
        if self.mail.api_key.is_none() {
            self.mail.api_key = std::env::var("MAIL_API_KEY").ok();
        }
        if self.auth.secret.is_none() {
            self.auth.secret = std::env::var("SUPPORT_DESK_SECRET").ok();
        }
        self
    }
}
