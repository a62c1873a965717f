//! New-channel detection.
//!
//! Every fetched channel that has no seen-set record is announced and then
//! recorded. Publishing happens before recording: a failed insert leads to
//! a duplicate announcement on the next run, never to a silently missed one.

use crate::announce::{find_user, format_announcement};
use crate::error::{ChannelError, DataConsistencyError, RunError, StoreError};
use crate::platform::{ChannelSource, Notifier};
use crate::store::{SeenChannelRecord, SeenSetStore};
use slack_common::{Channel, User};
use tracing::{debug, info, warn};

/// Where and as whom announcements are posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostTarget {
    pub destination: String,
    pub display_name: String,
    pub icon: String,
}

/// A new channel that could not be fully processed this run.
#[derive(Debug)]
pub struct ChannelFailure {
    pub channel_id: String,
    pub error: ChannelError,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Channels that already had a record.
    pub seen_before: usize,
    /// Channels announced and recorded during this pass.
    pub newly_recorded: usize,
    pub failures: Vec<ChannelFailure>,
}

impl ReconcileReport {
    pub fn error_count(&self) -> usize {
        self.failures.len()
    }

    pub fn failed_channel_ids(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.channel_id.as_str()).collect()
    }

    /// True when there were per-channel errors and nothing else succeeded.
    pub fn is_failed_run(&self) -> bool {
        !self.failures.is_empty() && self.seen_before + self.newly_recorded == 0
    }
}

/// Announces and records every channel in `channels` that `store` has not
/// seen, in source order.
///
/// Per-channel failures are collected in the report. Only a failing
/// existence lookup, which means the store itself is unavailable, aborts.
pub async fn reconcile<S, N>(
    channels: &[Channel],
    users: &[User],
    store: &S,
    notifier: &N,
    target: &PostTarget,
) -> Result<ReconcileReport, StoreError>
where
    S: SeenSetStore + ?Sized,
    N: Notifier + ?Sized,
{
    let mut report = ReconcileReport::default();

    for channel in channels {
        if store.exists(&channel.id).await? {
            debug!(channel_id = %channel.id, "already announced");
            report.seen_before += 1;
            continue;
        }

        match announce_channel(channel, users, store, notifier, target).await {
            Ok(()) => {
                info!(channel_id = %channel.id, name = %channel.name, "announced new channel");
                report.newly_recorded += 1;
            }
            Err(error) => {
                warn!(channel_id = %channel.id, %error, "failed to process new channel");
                report.failures.push(ChannelFailure {
                    channel_id: channel.id.clone(),
                    error,
                });
            }
        }
    }

    Ok(report)
}

async fn announce_channel<S, N>(
    channel: &Channel,
    users: &[User],
    store: &S,
    notifier: &N,
    target: &PostTarget,
) -> Result<(), ChannelError>
where
    S: SeenSetStore + ?Sized,
    N: Notifier + ?Sized,
{
    let creator = find_user(users, &channel.creator_id).ok_or_else(|| {
        DataConsistencyError::UnknownCreator {
            channel_id: channel.id.clone(),
            creator_id: channel.creator_id.clone(),
        }
    })?;

    let text = format_announcement(channel, &creator.name);
    notifier
        .publish(&target.destination, &text, &target.display_name, &target.icon)
        .await?;

    store
        .insert(&SeenChannelRecord::snapshot(channel, &creator.name))
        .await?;

    Ok(())
}

/// One full job run: fetch, make sure the table exists, reconcile.
pub async fn run_once<C, S, N>(
    source: &C,
    store: &S,
    notifier: &N,
    target: &PostTarget,
) -> Result<ReconcileReport, RunError>
where
    C: ChannelSource + ?Sized,
    S: SeenSetStore + ?Sized,
    N: Notifier + ?Sized,
{
    let channels = source.list_channels().await?;
    let users = source.list_users().await?;
    info!(
        channels = channels.len(),
        users = users.len(),
        "fetched workspace"
    );

    store.ensure_schema().await?;

    Ok(reconcile(&channels, &users, store, notifier, target).await?)
}
