//! Storage port: the capabilities the batch writer and the pagination
//! provider consume, plus the PostgreSQL and in-memory backends.
//!
//! Writes go through a [`ConnectionFactory`] that hands out one
//! [`StoreConnection`] per batch; the connection is driven through a
//! [`TransactionHandle`]. Reads go through a [`ReadSource`] and never share a
//! transaction.

pub mod memory;
pub mod postgres;
pub mod transaction;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;

use crate::domain::Entity;
use crate::error::StorageError;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use transaction::{TransactionHandle, TxState};

/// Hands out connections able to write records of type `T`.
#[async_trait]
pub trait ConnectionFactory<T: Entity>: Send + Sync {
    /// Connection type produced by [`ConnectionFactory::connect`].
    type Connection: StoreConnection<Record = T>;

    /// Acquires a dedicated connection.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if no connection is available.
    async fn connect(&self) -> Result<Self::Connection, StorageError>;
}

/// A single connection with explicit transaction control.
///
/// Callers should not drive this directly; wrap it in a
/// [`TransactionHandle`], which enforces the state machine and guarantees
/// release.
#[async_trait]
pub trait StoreConnection: Send {
    /// Record type written through this connection.
    type Record: Entity;

    /// Opens a transaction.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend refuses the transaction.
    async fn begin_transaction(&mut self) -> Result<(), StorageError>;

    /// Builds a record from `draft` and saves it inside the open transaction.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the record cannot be persisted, for
    /// example on a unique-key violation.
    async fn create(
        &mut self,
        draft: <Self::Record as Entity>::Draft,
    ) -> Result<Self::Record, StorageError>;

    /// Commits the open transaction.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the commit fails; the transaction is
    /// then still open.
    async fn commit(&mut self) -> Result<(), StorageError>;

    /// Rolls back the open transaction.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the rollback fails.
    async fn rollback(&mut self) -> Result<(), StorageError>;

    /// Gives the connection back. A connection that is still inside a
    /// transaction must discard it.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the connection cannot be released
    /// cleanly.
    async fn release(self) -> Result<(), StorageError>;
}

/// Read capability over the committed records of type `T`.
#[async_trait]
pub trait ReadSource<T: Entity>: Send + Sync {
    /// Number of committed records.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] on backend failure.
    async fn count(&self) -> Result<u64, StorageError>;

    /// Records ordered by identity, skipping `skip` and returning at most
    /// `take`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] on backend failure.
    async fn find(&self, skip: u64, take: u64) -> Result<Vec<T>, StorageError>;
}
