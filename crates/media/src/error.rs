use std::{error::Error as StdError, time::Duration};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("{message}")]
    InvalidInput { message: String },
    #[error("media host answered with status {status}")]
    Status { status: u16 },
    #[error("attachment exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("attempt timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),
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
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

impl crate::retry::Retryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status } => *status >= 500 || *status == 408 || *status == 429,
            Self::TooLarge { .. } | Self::InvalidInput { .. } => false,
            Self::External { .. } | Self::Timeout(_) => true,
        }
    }

    fn timed_out(after: Duration) -> Self {
        Self::Timeout(after)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
