//! Post service: the paginated post listing.

use std::fmt;

use async_trait::async_trait;

use crate::domain::Post;
use crate::error::StorageError;
use crate::pagination::{Paginated, PaginationQuery, RequestContext, paginate};
use crate::storage::ReadSource;

/// Post operations exposed to the HTTP layer.
#[async_trait]
pub trait PostsApi: Send + Sync + fmt::Debug {
    /// Returns one page of posts.
    ///
    /// # Errors
    ///
    /// Returns the [`StorageError`] raised by the underlying reads.
    async fn list(
        &self,
        query: PaginationQuery,
        ctx: &RequestContext,
    ) -> Result<Paginated<Post>, StorageError>;
}

/// [`PostsApi`] over any store that can read posts.
#[derive(Debug, Clone)]
pub struct PostService<S> {
    store: S,
}

impl<S> PostService<S> {
    /// Creates a service over `store`.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S> PostsApi for PostService<S>
where
    S: ReadSource<Post> + fmt::Debug + 'static,
{
    async fn list(
        &self,
        query: PaginationQuery,
        ctx: &RequestContext,
    ) -> Result<Paginated<Post>, StorageError> {
        paginate(query, &self.store, ctx).await
    }
}
