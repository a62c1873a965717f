//! Messaging-platform seams and their Slack implementation.

use async_trait::async_trait;
use slack_common::{Channel, SlackClient, UpstreamError, User};

/// Read-only view of the workspace's channels and members.
#[async_trait]
pub trait ChannelSource: Send + Sync {
    async fn list_channels(&self) -> Result<Vec<Channel>, UpstreamError>;

    async fn list_users(&self) -> Result<Vec<User>, UpstreamError>;
}

/// Posts announcements.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(
        &self,
        destination: &str,
        text: &str,
        display_name: &str,
        icon: &str,
    ) -> Result<(), UpstreamError>;
}

/// Slack-backed [`ChannelSource`] and [`Notifier`].
pub struct SlackPlatform {
    client: SlackClient,
    exclude_archived: bool,
}

impl SlackPlatform {
    pub fn new(client: SlackClient, exclude_archived: bool) -> Self {
        Self {
            client,
            exclude_archived,
        }
    }
}

#[async_trait]
impl ChannelSource for SlackPlatform {
    async fn list_channels(&self) -> Result<Vec<Channel>, UpstreamError> {
        self.client.list_channels(self.exclude_archived).await
    }

    async fn list_users(&self) -> Result<Vec<User>, UpstreamError> {
        self.client.list_users().await
    }
}

#[async_trait]
impl Notifier for SlackPlatform {
    async fn publish(
        &self,
        destination: &str,
        text: &str,
        display_name: &str,
        icon: &str,
    ) -> Result<(), UpstreamError> {
        self.client
            .post_message(destination, text, display_name, icon)
            .await
    }
}
