//! Caller-facing chat surface.
//!
//! One `ChatService` per process: it owns the session store, the completion
//! client and the reply generator. Multi-persona conversations keep their
//! own `ActiveSet`; the store never sees it.

use crate::completion::{
    ApiStatus, CompletionClient, CompletionProvider, ConnectionTest, ModelEntry, ModelInfo,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::generator::{Reply, ResponseGenerator};
use crate::logging;
use crate::personas;
use crate::router::{self, ActiveSet, RouteDecision};
use crate::session::{self, Message, SessionStore, SessionSummary};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinSet;

/// A multi-persona conversation: one session plus the personas currently joined
#[derive(Debug, Clone)]
pub struct Conversation {
    session_id: String,
    active: ActiveSet,
}

impl Conversation {
    pub fn new() -> Self {
        Self::with_session_id(session::new_session_id())
    }

    pub fn with_session_id(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            active: ActiveSet::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn active(&self) -> &ActiveSet {
        &self.active
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMessageResult {
    pub routing: RouteDecision,
    /// In completion order, which may differ from routing order
    pub responses: Vec<Reply>,
}

/// Replies still in flight; await them together or one at a time
pub struct Dispatch {
    pub routing: RouteDecision,
    pub replies: JoinSet<Reply>,
}

impl Dispatch {
    /// Wait for the next reply to finish. `None` once all are collected.
    pub async fn next(&mut self) -> Option<Reply> {
        while let Some(joined) = self.replies.join_next().await {
            match joined {
                Ok(reply) => return Some(reply),
                Err(e) => logging::log_error(None, &format!("Reply task failed: {}", e)),
            }
        }
        None
    }

    pub async fn collect(mut self) -> SendMessageResult {
        let mut responses = Vec::with_capacity(self.routing.personas.len());
        while let Some(reply) = self.next().await {
            responses.push(reply);
        }
        SendMessageResult {
            routing: self.routing,
            responses,
        }
    }
}

pub struct ChatService {
    store: Arc<SessionStore>,
    client: Arc<CompletionClient>,
    generator: ResponseGenerator,
}

impl ChatService {
    pub fn new(config: Config) -> Result<Self> {
        let store = Arc::new(SessionStore::bounded(config.max_sessions));
        let client = Arc::new(CompletionClient::new(config.api_key.clone(), &config.api_url)?);

        if !client.set_model(&config.model) {
            logging::log_error(
                None,
                &format!(
                    "Unknown model '{}', keeping {}",
                    config.model,
                    client.current_model().key
                ),
            );
        }

        let provider: Arc<dyn CompletionProvider> = client.clone();
        let generator = ResponseGenerator::new(store.clone(), Some(provider), &config);

        let remote = if generator.remote_enabled() { "on" } else { "off" };
        logging::log_session(None, &format!("Chat service ready (remote completions: {})", remote));

        Ok(Self { store, client, generator })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(Config::from_env()?)
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn generator(&self) -> &ResponseGenerator {
        &self.generator
    }

    // ============ Conversations ============

    /// A fresh conversation. Its session is created by the first reply.
    pub fn start_conversation(&self) -> Conversation {
        let conversation = Conversation::new();
        logging::log_session(Some(conversation.session_id()), "Conversation started");
        conversation
    }

    /// Join a persona. Returns its announcement, or `None` if it was already active.
    pub fn activate(
        &self,
        conversation: &mut Conversation,
        persona_id: &str,
    ) -> Result<Option<String>> {
        let persona = personas::lookup(persona_id)
            .ok_or_else(|| Error::UnknownPersona(persona_id.to_string()))?;
        if !persona.group_chat {
            return Err(Error::NotInGroupChat(persona.id.to_string()));
        }

        if !conversation.active.activate(persona.id) {
            return Ok(None);
        }
        logging::log_routing(Some(conversation.session_id()), &format!("{} joined", persona.id));
        Ok(Some(persona.join_announcement()))
    }

    /// Remove a persona. Returns the leave notice, or `None` if it was not active.
    pub fn deactivate(&self, conversation: &mut Conversation, persona_id: &str) -> Option<String> {
        if !conversation.active.deactivate(persona_id) {
            return None;
        }
        logging::log_routing(Some(conversation.session_id()), &format!("{} left", persona_id));
        personas::lookup(persona_id).map(|p| p.leave_announcement())
    }

    /// Route `user_text` and start one reply task per selected persona.
    pub async fn dispatch(&self, conversation: &Conversation, user_text: &str) -> Dispatch {
        let text = user_text.trim();
        let session_id = conversation.session_id();
        let mut replies = JoinSet::new();

        if text.is_empty() {
            return Dispatch {
                routing: router::route("", &ActiveSet::new()),
                replies,
            };
        }

        let routing = router::route(text, conversation.active());
        if routing.is_empty() {
            logging::log_routing(Some(session_id), "No active persona, nothing to respond");
        } else {
            let message = format!(
                "Routing to [{}] ({})",
                routing.personas.join(", "),
                routing.reason.as_str()
            );
            logging::log_routing(Some(session_id), &message);
        }

        for persona_id in &routing.personas {
            let generator = self.generator.clone();
            let session_id = session_id.to_string();
            let persona_id = persona_id.clone();
            let text = text.to_string();
            replies.spawn(async move {
                generator.respond_detailed(&session_id, &persona_id, &text).await
            });
        }

        Dispatch { routing, replies }
    }

    /// Route `user_text` and wait for every selected persona to reply
    pub async fn send_message(
        &self,
        conversation: &Conversation,
        user_text: &str,
    ) -> SendMessageResult {
        self.dispatch(conversation, user_text).await.collect().await
    }

    /// Single-persona chat, no routing
    pub async fn ask(&self, session_id: &str, persona_id: &str, user_text: &str) -> Reply {
        self.generator.respond_detailed(session_id, persona_id, user_text).await
    }

    // ============ Sessions ============

    /// Empty for an unknown id; reading never creates a session
    pub fn history(&self, session_id: &str) -> Vec<Message> {
        self.store.messages(session_id)
    }

    pub fn summary(&self, session_id: &str) -> SessionSummary {
        self.store.summary(session_id)
    }

    pub fn clear_session(&self, session_id: &str) -> bool {
        self.store.clear(session_id)
    }

    // ============ Completion API ============

    pub fn is_api_configured(&self) -> bool {
        self.client.is_configured()
    }

    pub fn api_status(&self) -> ApiStatus {
        self.client.api_status()
    }

    pub fn set_model(&self, model_key: &str) -> bool {
        self.client.set_model(model_key)
    }

    pub fn current_model(&self) -> &'static ModelInfo {
        self.client.current_model()
    }

    pub fn available_models(&self) -> Vec<ModelEntry> {
        self.client.available_models()
    }

    pub async fn test_connection(&self) -> ConnectionTest {
        let result = self.client.test_connection().await;
        logging::log_completion(None, &format!("Connection test: {}", result.message));
        result
    }

    /// Banner shown when a multi-persona conversation opens
    pub fn welcome_message(&self) -> String {
        let status = if self.is_api_configured() {
            "🤖 AI assistants are connected and ready!"
        } else {
            "⚠️ Running in demo mode - connect API key for full AI responses."
        };
        format!(
            "Welcome to the Multi-Assistant Command Center! 🚀\n\n{}\n\n\
You can chat with multiple AI specialists simultaneously. Each has their own expertise and personality. \
Choose who you want to activate, or let them all join the conversation!",
            status
        )
    }
}
