use crate::completion::{ChatMessage, CompletionProvider};
use crate::config::Config;
use crate::fallback;
use crate::logging;
use crate::personas::{self, Persona};
use crate::session::{Role, SessionStore};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub const UNAVAILABLE_PERSONA_REPLY: &str = "I'm not sure how to help with that.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    Remote,
    Fallback,
    Unavailable,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub persona_id: String,
    pub content: String,
    pub source: ReplySource,
    /// Name of the canned rule that produced a fallback reply
    pub rule: Option<&'static str>,
}

/// Produces one reply for one persona: remote completion first, canned text otherwise.
#[derive(Clone)]
pub struct ResponseGenerator {
    store: Arc<SessionStore>,
    completion: Option<Arc<dyn CompletionProvider>>,
    history_window: usize,
    context_window: usize,
    fallback_delay: Duration,
    fallback_jitter: Duration,
}

impl ResponseGenerator {
    pub fn new(
        store: Arc<SessionStore>,
        completion: Option<Arc<dyn CompletionProvider>>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            completion,
            history_window: config.history_window,
            context_window: config.context_window,
            fallback_delay: config.fallback_delay,
            fallback_jitter: config.fallback_jitter,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Whether replies will try the remote API before falling back
    pub fn remote_enabled(&self) -> bool {
        self.completion.as_ref().map(|c| c.is_configured()).unwrap_or(false)
    }

    pub async fn respond(&self, session_id: &str, persona_id: &str, user_text: &str) -> String {
        self.respond_detailed(session_id, persona_id, user_text).await.content
    }

    /// Never fails. For a known persona, appends the user message and exactly
    /// one assistant message; an unknown persona leaves the session untouched.
    pub async fn respond_detailed(
        &self,
        session_id: &str,
        persona_id: &str,
        user_text: &str,
    ) -> Reply {
        let Some(persona) = personas::lookup(persona_id) else {
            logging::log_error(Some(session_id), &format!("Persona not found: {}", persona_id));
            return Reply {
                persona_id: persona_id.to_string(),
                content: UNAVAILABLE_PERSONA_REPLY.to_string(),
                source: ReplySource::Unavailable,
                rule: None,
            };
        };

        self.store.append(session_id, Role::User, user_text, None);

        if let Some(provider) = self.completion.as_ref().filter(|c| c.is_configured()) {
            let messages = self.build_api_messages(session_id, persona);
            match provider.complete(&messages).await {
                Ok(content) => {
                    self.store.append(session_id, Role::Assistant, &content, Some(persona.id));
                    let message = format!(
                        "{} replied via completion API ({} chars)",
                        persona.id,
                        content.len()
                    );
                    logging::log_agent(Some(session_id), &message);
                    return Reply {
                        persona_id: persona.id.to_string(),
                        content,
                        source: ReplySource::Remote,
                        rule: None,
                    };
                }
                Err(e) => {
                    let message =
                        format!("Completion failed for {}, using fallback: {}", persona.id, e);
                    logging::log_error(Some(session_id), &message);
                }
            }
        }

        self.think().await;

        let context = self.store.context_string(session_id, self.context_window);
        let session_context = self.store.context(session_id);
        let canned = fallback::generate(persona.id, user_text, &context, &session_context);

        self.store.append(session_id, Role::Assistant, &canned.text, Some(persona.id));
        let message = format!("{} replied with canned rule '{}'", persona.id, canned.rule);
        logging::log_agent(Some(session_id), &message);

        Reply {
            persona_id: persona.id.to_string(),
            content: canned.text,
            source: ReplySource::Fallback,
            rule: Some(canned.rule),
        }
    }

    /// System instruction followed by the recent history window
    pub fn build_api_messages(&self, session_id: &str, persona: &Persona) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(persona.instruction)];
        messages.extend(
            self.store
                .recent_window(session_id, self.history_window)
                .into_iter()
                .map(|m| ChatMessage::new(m.role.as_str(), m.content)),
        );
        messages
    }

    /// Simulated processing time before a canned reply
    async fn think(&self) {
        let jitter_ms = self.fallback_jitter.as_millis() as u64;
        let extra = if jitter_ms > 0 {
            rand::rng().random_range(0..=jitter_ms)
        } else {
            0
        };
        let delay = self.fallback_delay + Duration::from_millis(extra);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionError;
    use crate::personas::{CHAOS_ENGINEER, SCENARIO_MASTER};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StubProvider {
        configured: bool,
        reply: Option<String>,
        calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl StubProvider {
        fn answering(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                configured: true,
                reply: Some(reply.to_string()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { configured: true, reply: None, calls: Mutex::new(Vec::new()) })
        }

        fn unconfigured() -> Arc<Self> {
            Arc::new(Self {
                configured: false,
                reply: Some("unused".into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionProvider for StubProvider {
        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
            self.calls.lock().unwrap().push(messages.to_vec());
            self.reply.clone().ok_or(CompletionError::EmptyResponse)
        }
    }

    fn generator(provider: Option<Arc<StubProvider>>) -> ResponseGenerator {
        let provider = provider.map(|p| p as Arc<dyn CompletionProvider>);
        ResponseGenerator::new(Arc::new(SessionStore::new()), provider, &Config::default())
    }

    fn assistant_count(generator: &ResponseGenerator, session_id: &str) -> usize {
        generator
            .store()
            .get_or_create(session_id)
            .messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count()
    }

    #[tokio::test]
    async fn unknown_persona_returns_canonical_text_without_appending() {
        let g = generator(None);
        let reply = g.respond_detailed("s", "ghost-writer", "hello").await;

        assert_eq!(reply.content, UNAVAILABLE_PERSONA_REPLY);
        assert_eq!(reply.source, ReplySource::Unavailable);
        assert!(g.store().recent_window("s", 10).is_empty());
    }

    #[tokio::test]
    async fn fallback_without_credentials() {
        let g = generator(None);
        let reply = g.respond_detailed("s", SCENARIO_MASTER, "I think it's a database issue").await;

        assert_eq!(reply.source, ReplySource::Fallback);
        assert_eq!(reply.rule, Some("database-bottleneck"));

        let history = g.store().recent_window("s", 10);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].persona_id, None);
        assert_eq!(history[1].persona_id.as_deref(), Some(SCENARIO_MASTER));
    }

    #[tokio::test]
    async fn remote_success_is_recorded_and_tagged() {
        let provider = StubProvider::answering("From the model");
        let g = generator(Some(provider.clone()));
        let reply = g.respond_detailed("s", CHAOS_ENGINEER, "push me").await;

        assert_eq!(reply.source, ReplySource::Remote);
        assert_eq!(reply.content, "From the model");
        assert_eq!(provider.call_count(), 1);
        assert_eq!(assistant_count(&g, "s"), 1);

        let sent = provider.calls.lock().unwrap()[0].clone();
        assert_eq!(sent[0].role, "system");
        assert!(sent[0].content.contains("controlled failure"));
        assert_eq!(sent.last().unwrap(), &ChatMessage::user("push me"));
    }

    #[tokio::test]
    async fn remote_failure_falls_back_once() {
        let provider = StubProvider::failing();
        let g = generator(Some(provider.clone()));
        let reply = g.respond_detailed("s", SCENARIO_MASTER, "there's an error in prod").await;

        assert_eq!(reply.source, ReplySource::Fallback);
        assert!(!reply.content.is_empty());
        assert_eq!(provider.call_count(), 1);
        assert_eq!(assistant_count(&g, "s"), 1);
    }

    #[tokio::test]
    async fn unconfigured_provider_is_never_called() {
        let provider = StubProvider::unconfigured();
        let g = generator(Some(provider.clone()));
        assert!(!g.remote_enabled());

        let reply = g.respond_detailed("s", SCENARIO_MASTER, "hi").await;
        assert_eq!(reply.source, ReplySource::Fallback);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn remote_history_is_bounded_to_window() {
        let provider = StubProvider::answering("ok");
        let g = generator(Some(provider.clone()));
        for i in 0..8 {
            g.respond("s", SCENARIO_MASTER, &format!("turn {}", i)).await;
        }

        let calls = provider.calls.lock().unwrap();
        let last = calls.last().unwrap();
        // system + 10 most recent messages; the store keeps everything
        assert_eq!(last.len(), 11);
        assert_eq!(last[1].content, "ok");
        assert_eq!(last[2].content, "turn 3");
        assert_eq!(g.store().get_or_create("s").messages.len(), 16);
    }

    #[tokio::test]
    async fn fallback_rule_is_deterministic() {
        let a = generator(None).respond_detailed("s", SCENARIO_MASTER, "I found a bug").await;
        let b = generator(None).respond_detailed("s", SCENARIO_MASTER, "I found a bug").await;
        assert_eq!(a.rule, b.rule);
        assert_eq!(a.content, b.content);
    }

    #[tokio::test]
    async fn canned_reply_sees_running_scenario() {
        let g = generator(None);
        let first = g.respond_detailed("s", SCENARIO_MASTER, "give me a problem").await;
        assert_eq!(first.rule, Some("midnight-meltdown"));

        let second = g.respond_detailed("s", SCENARIO_MASTER, "I'd check recent deploys").await;
        assert_eq!(second.rule, Some("escalate-scenario"));
    }
}
