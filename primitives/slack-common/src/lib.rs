//! Slack Common - Slack Web API Client
//!
//! Minimal client for the Slack Web API methods the channel announcer
//! calls: listing public channels, listing workspace members and posting a
//! message.
//!
//! Every request carries the bot token as a bearer header, is bounded by a
//! timeout and is retried on transport errors, HTTP 5xx and HTTP 429.
//! Responses with `"ok": false` are surfaced as [`UpstreamError::Api`]
//! without retrying.
//!
//! # Usage
//!
//! ```no_run
//! use slack_common::{SlackClient, SlackConfig};
//!
//! # async fn demo() -> Result<(), slack_common::UpstreamError> {
//! let client = SlackClient::new(SlackConfig::new("xoxb-..."))?;
//! let channels = client.list_channels(true).await?;
//! client
//!     .post_message("#general", &format!("{} channels", channels.len()), "counter", ":abacus:")
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod types;

pub use client::{DEFAULT_BASE_URL, SlackClient, SlackConfig};
pub use error::UpstreamError;
pub use types::{Channel, User};
