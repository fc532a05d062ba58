//! Scoped transaction handle over a single [`StoreConnection`].
//!
//! A [`TransactionHandle`] only exists inside [`TransactionHandle::scoped`],
//! which releases the connection exactly once after the body finishes,
//! whatever the body returned. The handle tracks the transaction state and
//! rejects operations the current state does not allow.

use std::fmt;

use futures_util::future::BoxFuture;

use super::StoreConnection;
use crate::domain::Entity;
use crate::error::{BatchError, StorageError};

/// Lifecycle state of a [`TransactionHandle`].
///
/// ```text
/// Connected → Active → Committed  ─┐
///                    → RolledBack ─┴→ Released
/// ```
///
/// Any state may move to `Released`; it is always the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// Connection acquired, no transaction open.
    Connected,
    /// Transaction open.
    Active,
    /// Transaction committed.
    Committed,
    /// Transaction rolled back.
    RolledBack,
    /// Connection given back.
    Released,
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connected => "connected",
            Self::Active => "active",
            Self::Committed => "committed",
            Self::RolledBack => "rolled back",
            Self::Released => "released",
        };
        f.write_str(s)
    }
}

/// A connection bound to at most one transaction.
pub struct TransactionHandle<C: StoreConnection> {
    conn: Option<C>,
    state: TxState,
}

impl<C: StoreConnection> fmt::Debug for TransactionHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionHandle")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<C: StoreConnection> TransactionHandle<C> {
    /// Runs `body` against a handle wrapping `conn`, then releases the
    /// connection.
    ///
    /// Release is attempted exactly once, after `body` returns. If it fails,
    /// the result is a [`BatchError::ResourceRelease`] whose `prior` holds
    /// the error `body` returned, if any.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `body`, or a
    /// [`BatchError::ResourceRelease`] if the connection could not be
    /// released.
    pub async fn scoped<R, F>(conn: C, body: F) -> Result<R, BatchError>
    where
        R: Send,
        F: for<'a> FnOnce(&'a mut Self) -> BoxFuture<'a, Result<R, BatchError>> + Send,
    {
        let mut handle = Self {
            conn: Some(conn),
            state: TxState::Connected,
        };
        let outcome = body(&mut handle).await;
        let released = handle.release().await;

        match (outcome, released) {
            (outcome, Ok(())) => outcome,
            (Ok(_), Err(cause)) => Err(BatchError::ResourceRelease { cause, prior: None }),
            (Err(prior), Err(cause)) => Err(BatchError::ResourceRelease {
                cause,
                prior: Some(Box::new(prior)),
            }),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> TxState {
        self.state
    }

    /// Opens the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidState`] unless the handle is
    /// [`TxState::Connected`], or the backend error if begin fails.
    pub async fn begin(&mut self) -> Result<(), StorageError> {
        self.connection("begin", TxState::Connected)?
            .begin_transaction()
            .await?;
        self.state = TxState::Active;
        Ok(())
    }

    /// Persists one record inside the open transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidState`] unless the handle is
    /// [`TxState::Active`], or the backend error if the write fails.
    pub async fn create(
        &mut self,
        draft: <C::Record as Entity>::Draft,
    ) -> Result<C::Record, StorageError> {
        self.connection("create", TxState::Active)?
            .create(draft)
            .await
    }

    /// Commits the open transaction. On failure the handle stays
    /// [`TxState::Active`] so that a rollback can still be attempted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidState`] unless the handle is
    /// [`TxState::Active`], or the backend error if commit fails.
    pub async fn commit(&mut self) -> Result<(), StorageError> {
        self.connection("commit", TxState::Active)?.commit().await?;
        self.state = TxState::Committed;
        Ok(())
    }

    /// Rolls back the open transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidState`] unless the handle is
    /// [`TxState::Active`], or the backend error if rollback fails.
    pub async fn rollback(&mut self) -> Result<(), StorageError> {
        self.connection("roll back", TxState::Active)?
            .rollback()
            .await?;
        self.state = TxState::RolledBack;
        Ok(())
    }

    async fn release(&mut self) -> Result<(), StorageError> {
        let conn = self.conn.take().ok_or(StorageError::InvalidState {
            operation: "release",
            state: self.state,
        })?;
        if self.state == TxState::Active {
            tracing::warn!("releasing connection with an open transaction");
        }
        self.state = TxState::Released;
        conn.release().await
    }

    fn connection(
        &mut self,
        operation: &'static str,
        expected: TxState,
    ) -> Result<&mut C, StorageError> {
        let state = self.state;
        match self.conn.as_mut() {
            Some(conn) if state == expected => Ok(conn),
            _ => Err(StorageError::InvalidState { operation, state }),
        }
    }
}

impl<C: StoreConnection> Drop for TransactionHandle<C> {
    fn drop(&mut self) {
        if self.state != TxState::Released {
            tracing::warn!(state = %self.state, "transaction handle dropped without release");
        }
    }
}
