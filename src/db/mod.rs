//! Remote catalog store abstraction
//!
//! The catalog and profile tables live in a relational backend that pushes
//! a "something changed" notification after every mutation. Implementations
//! wrap Postgres (`LISTEN/NOTIFY`) or an in-process store for local runs.
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::{
    error::AppResult,
    models::{CatalogItem, NewCatalogItem, UserProfile},
};

pub mod memory;
pub mod postgres;
pub mod redis;

pub use memory::MemoryStore;
pub use postgres::{create_pool, PgStore};
pub use redis::{create_redis_client, Cache, CacheKey};

/// Table holding catalog items
pub const CATALOG_TABLE: &str = "catalog_items";

/// Row-level operation reported by the change stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Delete,
    /// Anything else, including "events were dropped, refresh anyway"
    Other,
}

impl ChangeKind {
    pub fn parse(op: &str) -> Self {
        match op.to_ascii_uppercase().as_str() {
            "INSERT" => ChangeKind::Insert,
            "DELETE" => ChangeKind::Delete,
            _ => ChangeKind::Other,
        }
    }
}

/// Notification that a table changed; carries no row payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
}

/// A live registration on the store's change stream
///
/// Dropping the feed releases the registration.
pub struct ChangeFeed {
    events: mpsc::UnboundedReceiver<ChangeEvent>,
    forwarder: Option<AbortHandle>,
}

impl ChangeFeed {
    pub fn new(events: mpsc::UnboundedReceiver<ChangeEvent>, forwarder: Option<AbortHandle>) -> Self {
        Self { events, forwarder }
    }

    /// Waits for the next change; `None` once the stream has ended
    pub async fn next_event(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }
}

impl Drop for ChangeFeed {
    fn drop(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}

/// Catalog persistence contract
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// Full item set, newest first
    async fn fetch_all(&self) -> AppResult<Vec<CatalogItem>>;

    /// Inserts a new row; fails with `Constraint` on a duplicate id
    async fn insert(&self, item: NewCatalogItem) -> AppResult<()>;

    async fn delete(&self, id: &str) -> AppResult<()>;

    /// Registers for change notifications on `table`
    async fn subscribe_to_changes(&self, table: &str) -> AppResult<ChangeFeed>;
}

/// Profile persistence contract
///
/// Email is the conflict key; uniqueness is the store's job.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    async fn upsert_profile(&self, profile: &UserProfile) -> AppResult<()>;

    async fn get_profile_by_email(&self, email: &str) -> AppResult<Option<UserProfile>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_kind_parse() {
        assert_eq!(ChangeKind::parse("INSERT"), ChangeKind::Insert);
        assert_eq!(ChangeKind::parse("delete"), ChangeKind::Delete);
        assert_eq!(ChangeKind::parse("UPDATE"), ChangeKind::Other);
    }

    #[tokio::test]
    async fn test_dropping_feed_aborts_forwarder() {
        let (tx, rx) = mpsc::unbounded_channel();
        let forwarder = tokio::spawn(async move {
            let _tx = tx;
            std::future::pending::<()>().await;
        });
        let abort = forwarder.abort_handle();

        let feed = ChangeFeed::new(rx, Some(abort));
        drop(feed);

        let joined = forwarder.await;
        assert!(joined.unwrap_err().is_cancelled());
    }
}
