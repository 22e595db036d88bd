pub mod conversation;
pub mod message;
pub mod user;

use std::time::{SystemTime, UNIX_EPOCH};

/// Unix timestamp in milliseconds, the resolution used for message ordering.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
