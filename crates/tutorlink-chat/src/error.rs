use thiserror::Error;

/// Everything that can go wrong in the messaging core. All variants are
/// surfaced to the caller as-is — nothing here is retried automatically,
/// and none of them are fatal to the process.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("tutor profile not found")]
    CounterpartyNotFound,

    #[error("conversation not found")]
    ConversationNotFound,

    #[error("message content is empty")]
    EmptyContent,

    #[error("sender is not a participant in this conversation")]
    UnauthorizedSender,

    #[error("storage unavailable: {0}")]
    StoreUnavailable(anyhow::Error),

    /// Declared for the HTTP surface; the gateway handles channel
    /// shutdown internally by closing the affected connection.
    #[error("live update channel unavailable")]
    ChannelUnavailable,
}

impl From<anyhow::Error> for ChatError {
    fn from(err: anyhow::Error) -> Self {
        Self::StoreUnavailable(err)
    }
}
