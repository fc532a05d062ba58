//! User service: bulk account creation and the paginated user listing.

use std::fmt;

use async_trait::async_trait;

use super::BatchWriter;
use crate::domain::{NewUser, User};
use crate::error::{BatchError, StorageError};
use crate::pagination::{Paginated, PaginationQuery, RequestContext, paginate};
use crate::storage::{ConnectionFactory, ReadSource};

/// User operations exposed to the HTTP layer.
///
/// Handlers hold an `Arc<dyn UsersApi>`; the storage backend behind it is
/// chosen once at startup.
#[async_trait]
pub trait UsersApi: Send + Sync + fmt::Debug {
    /// Creates all `users` in one transaction, in input order.
    ///
    /// # Errors
    ///
    /// Returns a [`BatchError`] if the batch could not be committed or the
    /// connection could not be released.
    async fn create_many(&self, users: Vec<NewUser>) -> Result<Vec<User>, BatchError>;

    /// Returns one page of users.
    ///
    /// # Errors
    ///
    /// Returns the [`StorageError`] raised by the underlying reads.
    async fn list(
        &self,
        query: PaginationQuery,
        ctx: &RequestContext,
    ) -> Result<Paginated<User>, StorageError>;
}

/// [`UsersApi`] over any store that can write and read users.
#[derive(Debug, Clone)]
pub struct UserService<S> {
    writer: BatchWriter<S>,
    store: S,
}

impl<S: Clone> UserService<S> {
    /// Creates a service over `store`.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            writer: BatchWriter::new(store.clone()),
            store,
        }
    }
}

#[async_trait]
impl<S> UsersApi for UserService<S>
where
    S: ConnectionFactory<User> + ReadSource<User> + Clone + fmt::Debug + 'static,
{
    async fn create_many(&self, users: Vec<NewUser>) -> Result<Vec<User>, BatchError> {
        self.writer.execute_batch::<User>(users).await
    }

    async fn list(
        &self,
        query: PaginationQuery,
        ctx: &RequestContext,
    ) -> Result<Paginated<User>, StorageError> {
        paginate(query, &self.store, ctx).await
    }
}
