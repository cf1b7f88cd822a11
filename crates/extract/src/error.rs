use std::error::Error as StdError;

use claimguard_common::FromMessage;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{tool} is not installed")]
    ToolNotFound { tool: &'static str },

    #[error("{tool} timed out after {seconds}s")]
    Timeout { tool: &'static str, seconds: u64 },

    #[error("{tool} exited with {status}")]
    NonZeroExit { tool: &'static str, status: String },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("{0}")]
    Message(String),
}

impl Error {
    #[must_use]
    pub fn external<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

claimguard_common::impl_context!();
