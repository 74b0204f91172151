//! SkillBridge assistant core: a fixed set of AI personas sharing in-memory
//! conversations, answered by a remote chat-completion API with canned
//! fallback replies when the API is absent or failing.

pub mod chat;
pub mod completion;
pub mod config;
pub mod error;
pub mod fallback;
pub mod generator;
pub mod logging;
pub mod personas;
pub mod router;
pub mod session;

pub use chat::{ChatService, Conversation, Dispatch, SendMessageResult};
pub use completion::{ChatMessage, CompletionClient, CompletionError, CompletionProvider};
pub use config::Config;
pub use error::{Error, Result};
pub use generator::{Reply, ReplySource, ResponseGenerator};
pub use personas::Persona;
pub use router::{route, ActiveSet, RouteDecision, RouteReason};
pub use session::{Message, Role, SessionStore};
