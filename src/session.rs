//! Per-instance chat session.
//!
//! A [`Session`] is built once at startup and handed to the chat controller.
//! Its identifier tags every request so the webhook can keep per-session
//! context on its side. Nothing here is persisted.

use rand::Rng;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use time::OffsetDateTime;

/// Opaque session token: wall-clock milliseconds followed by a random number
/// below 1000.
///
/// Uniqueness is best effort. Two instances started in the same millisecond
/// can draw the same suffix; the webhook is expected to tolerate that.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let jitter: u16 = rand::thread_rng().gen_range(0..1000);
        Self(format!("{millis}{jitter}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug)]
pub struct Session {
    id: SessionId,
    started_at: OffsetDateTime,
}

impl Session {
    pub fn start() -> Self {
        Self::with_id(SessionId::generate())
    }

    pub fn with_id(id: SessionId) -> Self {
        Self {
            id,
            started_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn started_at(&self) -> OffsetDateTime {
        self.started_at
    }
}
