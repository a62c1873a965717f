//! Seen-set persistence.
//!
//! One table, `channels`, keyed by Slack channel id. A row is written the
//! first time a channel is announced and is never updated or deleted.

use crate::config::DatabaseConfig;
use crate::error::StoreError;
use async_trait::async_trait;
use slack_common::Channel;
use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;
use std::time::Duration;
use tracing::{debug, info};

/// Snapshot of a channel taken when it was first announced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenChannelRecord {
    pub channel_id: String,
    pub name: String,
    pub created: i64,
    pub creator_id: String,
    pub creator_name: String,
    pub topic: String,
    pub purpose: String,
}

impl SeenChannelRecord {
    pub fn snapshot(channel: &Channel, creator_name: &str) -> Self {
        Self {
            channel_id: channel.id.clone(),
            name: channel.name.clone(),
            created: channel.created,
            creator_id: channel.creator_id.clone(),
            creator_name: creator_name.to_string(),
            topic: channel.topic.clone(),
            purpose: channel.purpose.clone(),
        }
    }
}

/// Persistent set of channels that have already been announced.
#[async_trait]
pub trait SeenSetStore: Send + Sync {
    /// Creates the backing table if it does not exist yet.
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    async fn exists(&self, channel_id: &str) -> Result<bool, StoreError>;

    /// Fails if a record for the same channel already exists.
    async fn insert(&self, record: &SeenChannelRecord) -> Result<(), StoreError>;
}

/// [`SeenSetStore`] over any SQL database sqlx's `Any` driver supports.
///
/// Postgres in production, SQLite for local runs and tests.
#[derive(Clone)]
pub struct SqlSeenStore {
    pool: AnyPool,
}

impl SqlSeenStore {
    /// Connection acquire timeout. A single attempt is made.
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        sqlx::any::install_default_drivers();

        // One connection: the job is sequential, and `sqlite::memory:` is
        // per-connection.
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Self::ACQUIRE_TIMEOUT)
            .idle_timeout(Option::<Duration>::None)
            .connect(config.url())
            .await?;

        info!(backend = ?config.backend(), "connected to seen-set store");
        Ok(Self { pool })
    }

    /// Looks up the stored snapshot for a channel.
    pub async fn get(&self, channel_id: &str) -> Result<Option<SeenChannelRecord>, StoreError> {
        let row = sqlx::query_as::<_, (String, String, i64, String, String, String, String)>(
            r#"
            SELECT channel_id, name, created, creator_id, creator_name, topic, purpose
            FROM channels
            WHERE channel_id = $1
            "#,
        )
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(channel_id, name, created, creator_id, creator_name, topic, purpose)| {
                SeenChannelRecord {
                    channel_id,
                    name,
                    created,
                    creator_id,
                    creator_name,
                    topic,
                    purpose,
                }
            },
        ))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SeenSetStore for SqlSeenStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS channels (
                channel_id VARCHAR(255) PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                created BIGINT NOT NULL,
                creator_id VARCHAR(63) NOT NULL,
                creator_name VARCHAR(63) NOT NULL,
                topic TEXT NOT NULL,
                purpose TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("seen-set schema ready");
        Ok(())
    }

    async fn exists(&self, channel_id: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT channel_id FROM channels WHERE channel_id = $1")
            .bind(channel_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn insert(&self, record: &SeenChannelRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO channels (channel_id, name, created, creator_id, creator_name, topic, purpose)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.channel_id.as_str())
        .bind(record.name.as_str())
        .bind(record.created)
        .bind(record.creator_id.as_str())
        .bind(record.creator_name.as_str())
        .bind(record.topic.as_str())
        .bind(record.purpose.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
