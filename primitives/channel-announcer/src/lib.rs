//! Channel Announcer - New Slack Channel Notifications
//!
//! A run-to-completion job meant to be scheduled (cron or similar). Each run
//! lists the workspace's public channels, compares them to the seen-set kept
//! in a SQL table, and posts an announcement for every channel it has not
//! seen before. Announced channels are then recorded so later runs stay
//! quiet.
//!
//! # Usage
//!
//! ```bash
//! # Postgres seen-set, defaults for the destination and bot identity
//! DATABASE_URL=postgres://bot@localhost/slack channel-announcer --token xoxb-...
//!
//! # Local SQLite file, custom destination
//! channel-announcer --token xoxb-... \
//!     --database-url "sqlite://seen.db?mode=rwc" \
//!     --post-channel "#new-channels"
//! ```
//!
//! # Delivery
//!
//! Announcements are published before they are recorded. A crash or failed
//! insert between the two leads to a repeated announcement on the next run,
//! never to a channel that is marked seen but was never announced.

pub mod announce;
pub mod config;
pub mod error;
pub mod platform;
pub mod reconcile;
pub mod store;

pub use announce::{find_user, format_announcement};
pub use config::{Args, DatabaseBackend, DatabaseConfig};
pub use error::{ChannelError, DataConsistencyError, RunError, StoreError};
pub use platform::{ChannelSource, Notifier, SlackPlatform};
pub use reconcile::{ChannelFailure, PostTarget, ReconcileReport, reconcile, run_once};
pub use store::{SeenChannelRecord, SeenSetStore, SqlSeenStore};
