//! In-memory conversation sessions.
//!
//! Nothing here survives a restart. The store is an owned object; callers
//! share it through an `Arc`.

use crate::logging;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Free-form per-session state handed to the fallback engine. Nothing writes it yet.
pub type SessionContext = HashMap<String, serde_json::Value>;

const SESSION_SUFFIX_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SESSION_SUFFIX_LEN: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Set on assistant messages only
    pub persona_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub messages: Vec<Message>,
    pub context: SessionContext,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    fn new(id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            messages: Vec::new(),
            context: SessionContext::new(),
            started_at: now,
            last_activity: now,
        }
    }

    fn window(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub message_count: usize,
    pub duration_ms: i64,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Generate a fresh session id: `session_<unix millis>_<9 base36 chars>`
pub fn new_session_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..SESSION_SUFFIX_LEN)
        .map(|_| SESSION_SUFFIX_CHARS[rng.random_range(0..SESSION_SUFFIX_CHARS.len())] as char)
        .collect();
    format!("session_{}_{}", Utc::now().timestamp_millis(), suffix)
}

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    max_sessions: Option<usize>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that evicts the least recently active session once `max_sessions` is reached
    pub fn bounded(max_sessions: Option<usize>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_sessions: max_sessions.map(|max| max.max(1)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn entry<'a>(
        &self,
        sessions: &'a mut HashMap<String, Session>,
        session_id: &str,
    ) -> &'a mut Session {
        if !sessions.contains_key(session_id) {
            if let Some(max) = self.max_sessions {
                while sessions.len() >= max {
                    let idle = sessions
                        .values()
                        .min_by_key(|s| s.last_activity)
                        .map(|s| s.id.clone());
                    match idle {
                        Some(id) => {
                            sessions.remove(&id);
                            let note = "Evicted least recently active session";
                            logging::log_session(Some(&id), note);
                        }
                        None => break,
                    }
                }
            }
            logging::log_session(Some(session_id), "Session created");
        }
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id))
    }

    /// Snapshot of the session, creating an empty one for an unseen id.
    /// On a bounded store creation may evict the least recently active session.
    pub fn get_or_create(&self, session_id: &str) -> Session {
        let mut sessions = self.lock();
        self.entry(&mut sessions, session_id).clone()
    }

    /// Full history of an existing session; empty for an unseen id, which is not created
    pub fn messages(&self, session_id: &str) -> Vec<Message> {
        self.lock()
            .get(session_id)
            .map(|s| s.messages.clone())
            .unwrap_or_default()
    }

    /// Append one message. The whole append happens under the store lock.
    pub fn append(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
        persona_id: Option<&str>,
    ) -> Message {
        let message = Message {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.to_string(),
            persona_id: persona_id.map(str::to_string),
            timestamp: Utc::now(),
        };

        let mut sessions = self.lock();
        let session = self.entry(&mut sessions, session_id);
        session.last_activity = message.timestamp;
        session.messages.push(message.clone());
        message
    }

    /// The last `n` messages in arrival order (all of them if fewer exist)
    pub fn recent_window(&self, session_id: &str, n: usize) -> Vec<Message> {
        self.lock()
            .get(session_id)
            .map(|s| s.window(n).to_vec())
            .unwrap_or_default()
    }

    /// The last `n` messages rendered as `role: content` lines
    pub fn context_string(&self, session_id: &str, n: usize) -> String {
        self.lock()
            .get(session_id)
            .map(|s| {
                s.window(n)
                    .iter()
                    .map(|m| format!("{}: {}", m.role.as_str(), m.content))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    }

    pub fn context(&self, session_id: &str) -> SessionContext {
        self.lock()
            .get(session_id)
            .map(|s| s.context.clone())
            .unwrap_or_default()
    }

    /// Drop the session and its whole history. Returns whether it existed.
    pub fn clear(&self, session_id: &str) -> bool {
        let removed = self.lock().remove(session_id).is_some();
        if removed {
            logging::log_session(Some(session_id), "Session cleared");
        }
        removed
    }

    pub fn summary(&self, session_id: &str) -> SessionSummary {
        let sessions = self.lock();
        match sessions.get(session_id) {
            Some(s) => SessionSummary {
                message_count: s.messages.len(),
                duration_ms: (Utc::now() - s.started_at).num_milliseconds(),
                last_activity: s.messages.last().map(|m| m.timestamp),
            },
            None => SessionSummary {
                message_count: 0,
                duration_ms: 0,
                last_activity: None,
            },
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
