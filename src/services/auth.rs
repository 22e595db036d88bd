use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::Sha256;

use crate::domains::now_ms;
use crate::domains::user::{NewUser, User};
use crate::error::{Result, SupportDeskError};
use crate::interfaces::providers::{Notifier, SupportStore};

type HmacSha256 = Hmac<Sha256>;

pub const TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;
const MIN_PASSWORD_LEN: usize = 8;

/// Returned by forgot-password regardless of whether the account exists, so
/// the endpoint cannot be used to enumerate registered emails.
pub const RESET_REQUESTED_MESSAGE: &str = "If an account exists, reset link sent.";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"));

/// Issues and verifies bearer tokens and owns the register/login/reset flows.
pub struct AuthService {
    store: Arc<dyn SupportStore>,
    notifier: Arc<dyn Notifier>,
    secret: String,
    token_ttl_secs: i64,
}

impl AuthService {
    pub fn new(store: Arc<dyn SupportStore>, notifier: Arc<dyn Notifier>, secret: String) -> Self {
        Self {
            store,
            notifier,
            secret,
            token_ttl_secs: TOKEN_TTL_SECS,
        }
    }

    #[doc(hidden)]
    pub fn with_token_ttl(mut self, ttl_secs: i64) -> Self {
        self.token_ttl_secs = ttl_secs;
        self
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<(String, User)> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SupportDeskError::Validation("name is required".to_string()));
        }
        let email = normalize_email(email)?;
        validate_password(password)?;

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(SupportDeskError::Conflict(
                "email already exists".to_string(),
            ));
        }

        let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|e| SupportDeskError::Config(e.to_string()))?;
        let user = self
            .store
            .insert_user(NewUser {
                name: name.to_string(),
                email,
                password_hash,
            })
            .await?;
        let token = self.issue_token(&user.id)?;
        Ok((token, user))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(String, User)> {
        let email = email.trim().to_lowercase();
        // Unknown email and wrong password produce the same error.
        let invalid = || SupportDeskError::Unauthorized("invalid email or password".to_string());

        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(invalid)?;
        let valid = bcrypt::verify(password, &user.password_hash)
            .map_err(|e| SupportDeskError::Config(e.to_string()))?;
        if !valid {
            return Err(invalid());
        }
        let token = self.issue_token(&user.id)?;
        Ok((token, user))
    }

    /// Always reports success; when the account exists a reset mail is
    /// attempted and a delivery failure is only logged.
    pub async fn forgot_password(&self, email: &str) -> Result<&'static str> {
        let email = email.trim().to_lowercase();
        if let Some(user) = self.store.find_user_by_email(&email).await? {
            let token = self.issue_token(&user.id)?;
            if let Err(err) = self.notifier.send_password_reset(&email, &token).await {
                tracing::warn!(error = %err, "password reset mail failed");
            }
        }
        Ok(RESET_REQUESTED_MESSAGE)
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
        validate_password(new_password)?;
        let user_id = self.verify_token(token)?;
        if self.store.find_user_by_id(&user_id).await?.is_none() {
            return Err(SupportDeskError::Unauthorized("invalid token".to_string()));
        }
        let password_hash = bcrypt::hash(new_password, bcrypt::DEFAULT_COST)
            .map_err(|e| SupportDeskError::Config(e.to_string()))?;
        self.store
            .update_user_password(&user_id, &password_hash)
            .await
    }

    /// Resolves the acting user from an `Authorization` header value.
    pub async fn resolve_user(&self, authorization: Option<&str>) -> Result<User> {
        let header = authorization
            .ok_or_else(|| SupportDeskError::Unauthorized("missing token".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| SupportDeskError::Unauthorized("missing token".to_string()))?;
        let user_id = self.verify_token(token)?;
        self.store
            .find_user_by_id(&user_id)
            .await?
            .ok_or_else(|| SupportDeskError::Unauthorized("unknown user".to_string()))
    }

    pub fn issue_token(&self, user_id: &str) -> Result<String> {
        let expires_at = now_ms() / 1000 + self.token_ttl_secs;
        let payload = format!("{user_id}:{expires_at}");
        let signature = self.sign(payload.as_bytes())?;
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Returns the encoded user id, or Unauthorized for a malformed,
    /// tampered or expired token.
    pub fn verify_token(&self, token: &str) -> Result<String> {
        let invalid = || SupportDeskError::Unauthorized("invalid token".to_string());

        let (payload_b64, signature_b64) = token.split_once('.').ok_or_else(invalid)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| invalid())?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| invalid())?;

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| SupportDeskError::Config(e.to_string()))?;
        mac.update(&payload);
        mac.verify_slice(&signature).map_err(|_| invalid())?;

        let payload = String::from_utf8(payload).map_err(|_| invalid())?;
        let (user_id, expires_at) = payload.rsplit_once(':').ok_or_else(invalid)?;
        let expires_at: i64 = expires_at.parse().map_err(|_| invalid())?;
        if expires_at < now_ms() / 1000 {
            return Err(SupportDeskError::Unauthorized("token expired".to_string()));
        }
        Ok(user_id.to_string())
    }

    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| SupportDeskError::Config(e.to_string()))?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(SupportDeskError::Validation(
            "invalid email address".to_string(),
        ));
    }
    Ok(email)
}

fn validate_password(password: &str) -> Result<()> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(SupportDeskError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
