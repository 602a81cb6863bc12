use sqlx::{
    postgres::{PgListener, PgPoolOptions},
    PgPool,
};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::{
    db::{CatalogStore, ChangeEvent, ChangeFeed, ChangeKind, ProfileStore},
    error::{AppError, AppResult},
    models::{normalize_email, CatalogItem, CatalogRow, NewCatalogItem, UserProfile},
};

/// Channel the `catalog_items` trigger publishes on (see migrations)
const CHANGE_CHANNEL: &str = "catalog_changes";

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Pause before polling a listener whose connection failed
const LISTEN_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Catalog and profile tables backed by Postgres
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parses a `"<OP>:<table>"` notification payload
    fn parse_notification(payload: &str) -> ChangeEvent {
        match payload.split_once(':') {
            Some((op, table)) => ChangeEvent {
                table: table.to_string(),
                kind: ChangeKind::parse(op),
            },
            None => ChangeEvent {
                table: payload.to_string(),
                kind: ChangeKind::Other,
            },
        }
    }

    /// Event to forward for one listener poll
    ///
    /// A `None` payload means the connection dropped and notifications may
    /// have been missed, so subscribers are told to refresh.
    fn event_for(payload: Option<&str>, wanted: &str) -> Option<ChangeEvent> {
        match payload {
            Some(payload) => {
                Some(Self::parse_notification(payload)).filter(|event| event.table == wanted)
            }
            None => Some(ChangeEvent {
                table: wanted.to_string(),
                kind: ChangeKind::Other,
            }),
        }
    }
}

#[async_trait::async_trait]
impl CatalogStore for PgStore {
    async fn fetch_all(&self) -> AppResult<Vec<CatalogItem>> {
        let rows = sqlx::query_as::<_, CatalogRow>(
            r#"
            SELECT id, title, producer, genre, mood, bpm, price, audio_url, cover_url,
                   description, is_hot, is_trending, created_at
            FROM catalog_items
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .filter_map(|row| match CatalogItem::try_from(row) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed catalog row");
                    None
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(count = items.len(), "Fetched catalog");

        Ok(items)
    }

    async fn insert(&self, item: NewCatalogItem) -> AppResult<()> {
        let bpm = i32::try_from(item.tempo)
            .map_err(|_| AppError::InvalidInput(format!("Tempo {} out of range", item.tempo)))?;
        let price = i64::try_from(item.price)
            .map_err(|_| AppError::InvalidInput(format!("Price {} out of range", item.price)))?;

        let result = sqlx::query(
            r#"
            INSERT INTO catalog_items
                (id, title, producer, genre, mood, bpm, price, audio_url, cover_url,
                 description, is_hot, is_trending)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&item.id)
        .bind(&item.title)
        .bind(&item.producer)
        .bind(&item.genre)
        .bind(&item.mood)
        .bind(bpm)
        .bind(price)
        .bind(&item.audio_url)
        .bind(&item.cover_url)
        .bind(&item.description)
        .bind(item.is_hot)
        .bind(item.is_trending)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                AppError::Constraint(format!("Catalog item {} already exists", item.id)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM catalog_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::debug!(item_id = %id, rows = result.rows_affected(), "Deleted catalog row");

        Ok(())
    }

    async fn subscribe_to_changes(&self, table: &str) -> AppResult<ChangeFeed> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let wanted = table.to_string();

        let forwarder = tokio::spawn(async move {
            // `try_recv` reconnects on the call after a failure
            while !tx.is_closed() {
                match listener.try_recv().await {
                    Ok(notification) => {
                        if notification.is_none() {
                            tracing::warn!(channel = CHANGE_CHANNEL, "Change listener reconnecting");
                        }
                        let payload = notification.as_ref().map(|n| n.payload());
                        let Some(event) = PgStore::event_for(payload, &wanted) else {
                            continue;
                        };
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, channel = CHANGE_CHANNEL, "Change listener failed, retrying");
                        tokio::time::sleep(LISTEN_RETRY_DELAY).await;
                    }
                }
            }
        });

        tracing::info!(table = %table, channel = CHANGE_CHANNEL, "Listening for catalog changes");

        Ok(ChangeFeed::new(rx, Some(forwarder.abort_handle())))
    }
}

#[async_trait::async_trait]
impl ProfileStore for PgStore {
    async fn upsert_profile(&self, profile: &UserProfile) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, username, email, is_admin)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET username = EXCLUDED.username, is_admin = EXCLUDED.is_admin
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.username)
        .bind(normalize_email(&profile.email))
        .bind(profile.is_admin)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Constraint(format!("Profile id {} already taken", profile.id))
            }
            other => other.into(),
        })?;

        Ok(())
    }

    async fn get_profile_by_email(&self, email: &str) -> AppResult<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(
            "SELECT id, username, email, is_admin FROM profiles WHERE email = $1",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }
}
