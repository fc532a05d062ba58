//! In-memory storage backend.
//!
//! [`MemoryStore`] keeps one table per [`Entity::TABLE`] behind a
//! [`tokio::sync::RwLock`]. Writes made through a [`MemoryConnection`] are
//! staged on the connection and only published to the shared tables on
//! commit, so readers never observe a partial batch. Identities are
//! allocated at create time like a database sequence and are not reused
//! after a rollback.

use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ConnectionFactory, ReadSource, StoreConnection};
use crate::domain::{Entity, RecordId};
use crate::error::StorageError;

#[derive(Default)]
struct Table {
    last_id: i64,
    rows: BTreeMap<RecordId, Box<dyn Any + Send + Sync>>,
    keys: HashSet<String>,
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("last_id", &self.last_id)
            .field("rows", &self.rows.len())
            .finish()
    }
}

/// Shared in-memory store. Cloning is cheap and clones see the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<&'static str, Table>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn allocate_id(&self, table: &'static str) -> RecordId {
        let mut tables = self.tables.write().await;
        let table = tables.entry(table).or_default();
        table.last_id = table.last_id.saturating_add(1);
        RecordId::new(table.last_id)
    }

    async fn key_taken(&self, table: &'static str, key: &str) -> bool {
        let tables = self.tables.read().await;
        tables.get(table).is_some_and(|t| t.keys.contains(key))
    }

    /// Publishes `rows` atomically: either every row becomes visible or
    /// none does.
    async fn publish<T: Entity>(&self, rows: &[T]) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(T::TABLE).or_default();

        let mut incoming = HashSet::new();
        for key in rows.iter().filter_map(|row| row.unique_key()) {
            if table.keys.contains(key) || !incoming.insert(key) {
                return Err(StorageError::UniqueViolation {
                    table: T::TABLE,
                    key: key.to_string(),
                });
            }
        }

        for row in rows {
            if let Some(key) = row.unique_key() {
                table.keys.insert(key.to_string());
            }
            table.rows.insert(row.id(), Box::new(row.clone()));
        }
        Ok(())
    }

    /// Commits `drafts` directly, outside any caller-visible transaction.
    #[cfg(test)]
    pub(crate) async fn seed<T: Entity>(
        &self,
        drafts: impl IntoIterator<Item = T::Draft>,
    ) -> Result<Vec<T>, StorageError> {
        let mut rows = Vec::new();
        for draft in drafts {
            rows.push(T::create(self.allocate_id(T::TABLE).await, draft));
        }
        self.publish(&rows).await?;
        Ok(rows)
    }
}

/// Connection to a [`MemoryStore`] holding the rows staged by the open
/// transaction.
#[derive(Debug)]
pub struct MemoryConnection<T: Entity> {
    store: MemoryStore,
    staged: Vec<T>,
    in_transaction: bool,
}

impl<T: Entity> MemoryConnection<T> {
    fn require_transaction(&self, operation: &str) -> Result<(), StorageError> {
        if self.in_transaction {
            Ok(())
        } else {
            Err(StorageError::Unavailable(format!(
                "cannot {operation}: no open transaction"
            )))
        }
    }
}

#[async_trait]
impl<T: Entity> ConnectionFactory<T> for MemoryStore {
    type Connection = MemoryConnection<T>;

    async fn connect(&self) -> Result<Self::Connection, StorageError> {
        Ok(MemoryConnection {
            store: self.clone(),
            staged: Vec::new(),
            in_transaction: false,
        })
    }
}

#[async_trait]
impl<T: Entity> StoreConnection for MemoryConnection<T> {
    type Record = T;

    async fn begin_transaction(&mut self) -> Result<(), StorageError> {
        if self.in_transaction {
            return Err(StorageError::Unavailable(
                "transaction already open".to_string(),
            ));
        }
        self.in_transaction = true;
        Ok(())
    }

    async fn create(&mut self, draft: T::Draft) -> Result<T, StorageError> {
        self.require_transaction("create")?;
        let id = self.store.allocate_id(T::TABLE).await;
        let record = T::create(id, draft);

        if let Some(key) = record.unique_key() {
            let staged_dup = self
                .staged
                .iter()
                .any(|row| row.unique_key() == Some(key));
            if staged_dup || self.store.key_taken(T::TABLE, key).await {
                return Err(StorageError::UniqueViolation {
                    table: T::TABLE,
                    key: key.to_string(),
                });
            }
        }

        self.staged.push(record.clone());
        Ok(record)
    }

    async fn commit(&mut self) -> Result<(), StorageError> {
        self.require_transaction("commit")?;
        self.store.publish(&self.staged).await?;
        self.staged.clear();
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StorageError> {
        self.require_transaction("roll back")?;
        self.staged.clear();
        self.in_transaction = false;
        Ok(())
    }

    async fn release(self) -> Result<(), StorageError> {
        if self.in_transaction {
            tracing::debug!(
                table = T::TABLE,
                discarded = self.staged.len(),
                "discarding uncommitted rows on release"
            );
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Entity> ReadSource<T> for MemoryStore {
    async fn count(&self) -> Result<u64, StorageError> {
        let tables = self.tables.read().await;
        let len = tables.get(T::TABLE).map_or(0, |t| t.rows.len());
        Ok(u64::try_from(len).unwrap_or(u64::MAX))
    }

    async fn find(&self, skip: u64, take: u64) -> Result<Vec<T>, StorageError> {
        let tables = self.tables.read().await;
        let Some(table) = tables.get(T::TABLE) else {
            return Ok(Vec::new());
        };
        Ok(table
            .rows
            .values()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(take).unwrap_or(usize::MAX))
            .filter_map(|row| row.downcast_ref::<T>())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{NewPost, Post};

    async fn open(store: &MemoryStore) -> MemoryConnection<Post> {
        let Ok(mut conn) = ConnectionFactory::<Post>::connect(store).await else {
            panic!("connect failed");
        };
        let Ok(()) = conn.begin_transaction().await else {
            panic!("begin failed");
        };
        conn
    }

    #[tokio::test]
    async fn staged_rows_are_invisible_until_commit() {
        let store = MemoryStore::new();
        let mut conn = open(&store).await;

        let Ok(post) = conn.create(NewPost::draft("One", "one")).await else {
            panic!("create failed");
        };
        assert_eq!(post.id, RecordId::new(1));
        assert_eq!(ReadSource::<Post>::count(&store).await.ok(), Some(0));

        assert!(conn.commit().await.is_ok());
        assert_eq!(ReadSource::<Post>::count(&store).await.ok(), Some(1));
        assert!(conn.release().await.is_ok());
    }

    #[tokio::test]
    async fn rollback_discards_rows_but_not_ids() {
        let store = MemoryStore::new();
        let mut conn = open(&store).await;
        assert!(conn.create(NewPost::draft("One", "one")).await.is_ok());
        assert!(conn.rollback().await.is_ok());
        assert!(conn.release().await.is_ok());

        let Ok(rows) = store.seed::<Post>([NewPost::draft("Two", "two")]).await else {
            panic!("seed failed");
        };
        assert_eq!(rows.first().map(|p| p.id), Some(RecordId::new(2)));
        assert_eq!(ReadSource::<Post>::count(&store).await.ok(), Some(1));
    }

    #[tokio::test]
    async fn release_inside_transaction_discards_rows() {
        let store = MemoryStore::new();
        let mut conn = open(&store).await;
        assert!(conn.create(NewPost::draft("One", "one")).await.is_ok());
        assert!(conn.release().await.is_ok());
        assert_eq!(ReadSource::<Post>::count(&store).await.ok(), Some(0));
    }

    #[tokio::test]
    async fn duplicate_key_rejected_within_batch_and_against_committed() {
        let store = MemoryStore::new();
        assert!(store.seed::<Post>([NewPost::draft("Taken", "taken")]).await.is_ok());

        let mut conn = open(&store).await;
        let err = conn.create(NewPost::draft("Again", "taken")).await.err();
        assert!(matches!(err, Some(StorageError::UniqueViolation { .. })));

        assert!(conn.create(NewPost::draft("Fresh", "fresh")).await.is_ok());
        let err = conn.create(NewPost::draft("Fresh 2", "fresh")).await.err();
        assert!(matches!(err, Some(StorageError::UniqueViolation { .. })));
    }

    #[tokio::test]
    async fn concurrent_commit_of_same_key_fails_for_the_second() {
        let store = MemoryStore::new();
        let mut first = open(&store).await;
        let mut second = open(&store).await;
        assert!(first.create(NewPost::draft("A", "same")).await.is_ok());
        assert!(second.create(NewPost::draft("B", "same")).await.is_ok());

        assert!(first.commit().await.is_ok());
        let err = second.commit().await.err();
        assert!(matches!(err, Some(StorageError::UniqueViolation { .. })));
        assert!(second.rollback().await.is_ok());
        assert_eq!(ReadSource::<Post>::count(&store).await.ok(), Some(1));
    }

    #[tokio::test]
    async fn find_pages_in_id_order() {
        let store = MemoryStore::new();
        let drafts = (1..=5).map(|i| NewPost::draft(format!("Post {i}"), format!("post-{i}")));
        assert!(store.seed::<Post>(drafts).await.is_ok());

        let Ok(page) = ReadSource::<Post>::find(&store, 2, 2).await else {
            panic!("find failed");
        };
        let ids: Vec<i64> = page.iter().map(|p| p.id.get()).collect();
        assert_eq!(ids, vec![3, 4]);

        let Ok(tail) = ReadSource::<Post>::find(&store, 4, 10).await else {
            panic!("find failed");
        };
        assert_eq!(tail.len(), 1);
    }

    #[tokio::test]
    async fn create_without_transaction_fails() {
        let store = MemoryStore::new();
        let Ok(mut conn) = ConnectionFactory::<Post>::connect(&store).await else {
            panic!("connect failed");
        };
        assert!(conn.create(NewPost::draft("One", "one")).await.is_err());
    }
}
