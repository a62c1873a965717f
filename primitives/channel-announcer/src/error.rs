use slack_common::UpstreamError;
use thiserror::Error;

/// Seen-set store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// The platform returned data that does not line up with itself.
#[derive(Debug, Error)]
pub enum DataConsistencyError {
    #[error("creator {creator_id} of channel {channel_id} is not in the user list")]
    UnknownCreator {
        channel_id: String,
        creator_id: String,
    },
}

/// Why a single new channel could not be announced and recorded this run.
///
/// None of these stop the run; the channel is simply picked up again next
/// time because no record was written, or, for [`ChannelError::Store`], it
/// was announced but will be announced again.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("publish failed: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("recording failed: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    DataConsistency(#[from] DataConsistencyError),
}

/// Failures that abort the whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to fetch from Slack: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("seen-set store unavailable: {0}")]
    Store(#[from] StoreError),
}
