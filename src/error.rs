use thiserror::Error;

/// Errors surfaced to callers of the chat facade and config loader.
///
/// Failed completion calls never show up here: the generator downgrades
/// them to canned replies. `Completion` only covers building the client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown persona: {0}")]
    UnknownPersona(String),

    #[error("persona {0} does not take part in group chat")]
    NotInGroupChat(String),

    #[error("invalid configuration value for {key}: {value}")]
    Config { key: &'static str, value: String },

    #[error(transparent)]
    Completion(#[from] crate::completion::CompletionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
