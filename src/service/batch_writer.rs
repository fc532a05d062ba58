//! Atomic bulk insert.

use crate::domain::Entity;
use crate::error::BatchError;
use crate::storage::{ConnectionFactory, TransactionHandle};

/// Persists ordered lists of new records as single all-or-nothing units.
///
/// Every call acquires one connection, opens one transaction, writes the
/// drafts sequentially in input order, and either commits all of them or
/// rolls all of them back. The connection is released exactly once on every
/// path through [`TransactionHandle::scoped`].
#[derive(Debug, Clone)]
pub struct BatchWriter<F> {
    factory: F,
}

impl<F> BatchWriter<F> {
    /// Creates a writer over the given connection factory.
    #[must_use]
    pub const fn new(factory: F) -> Self {
        Self { factory }
    }

    /// Persists `drafts` atomically and returns the stored records in input
    /// order.
    ///
    /// The batch runs on its own task. Dropping the returned future does
    /// not interrupt it: the batch still commits or rolls back and the
    /// connection is still released.
    ///
    /// An empty input still runs a full connection and transaction
    /// lifecycle and returns an empty vector.
    ///
    /// # Errors
    ///
    /// - [`BatchError::Connection`] if no connection could be acquired or
    ///   the transaction could not begin. Nothing was written.
    /// - [`BatchError::Conflict`] if a record or the commit failed. The
    ///   transaction was rolled back (or the attempt logged) and nothing is
    ///   visible.
    /// - [`BatchError::ResourceRelease`] if the connection could not be
    ///   released; any earlier error is available through
    ///   [`BatchError::prior`].
    /// - [`BatchError::Aborted`] if the batch task panicked or the runtime
    ///   shut down underneath it.
    pub async fn execute_batch<T>(&self, drafts: Vec<T::Draft>) -> Result<Vec<T>, BatchError>
    where
        T: Entity,
        F: ConnectionFactory<T> + Clone + 'static,
    {
        let task = tokio::spawn(run_batch::<T, F>(self.factory.clone(), drafts));
        task.await.map_err(|e| {
            tracing::error!(table = T::TABLE, error = %e, "batch task aborted");
            BatchError::Aborted(e.to_string())
        })?
    }
}

async fn run_batch<T, F>(factory: F, drafts: Vec<T::Draft>) -> Result<Vec<T>, BatchError>
where
    T: Entity,
    F: ConnectionFactory<T>,
{
    let size = drafts.len();
    let conn = factory.connect().await.map_err(BatchError::Connection)?;

    let result = TransactionHandle::scoped(conn, move |tx| {
        Box::pin(async move {
            tx.begin().await.map_err(BatchError::Connection)?;

            let mut created = Vec::with_capacity(drafts.len());
            for (index, draft) in drafts.into_iter().enumerate() {
                match tx.create(draft).await {
                    Ok(record) => created.push(record),
                    Err(cause) => {
                        tracing::warn!(table = T::TABLE, index, error = %cause, "batch insert rejected");
                        if let Err(e) = tx.rollback().await {
                            tracing::error!(table = T::TABLE, error = %e, "rollback failed");
                        }
                        return Err(BatchError::Conflict {
                            failed_at: Some(index),
                            cause,
                        });
                    }
                }
            }

            if let Err(cause) = tx.commit().await {
                tracing::warn!(table = T::TABLE, error = %cause, "batch commit failed");
                if let Err(e) = tx.rollback().await {
                    tracing::error!(table = T::TABLE, error = %e, "rollback failed");
                }
                return Err(BatchError::Conflict {
                    failed_at: None,
                    cause,
                });
            }

            Ok(created)
        })
    })
    .await;

    if result.is_ok() {
        tracing::info!(table = T::TABLE, size, "batch committed");
    }
    result
}
