//! Shared application state injected into all Axum handlers.

use std::fmt;
use std::sync::Arc;

use crate::domain::{Post, User};
use crate::service::{PostService, PostsApi, UserService, UsersApi};
use crate::storage::{ConnectionFactory, ReadSource};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// User operations.
    pub users: Arc<dyn UsersApi>,
    /// Post operations.
    pub posts: Arc<dyn PostsApi>,
    /// Scheme used for pagination links when the request carries none.
    pub public_scheme: Arc<str>,
    /// Name of the storage backend, reported by the health endpoint.
    pub storage_backend: &'static str,
}

impl AppState {
    /// Wires both services over one store.
    #[must_use]
    pub fn with_store<S>(store: S, storage_backend: &'static str, public_scheme: &str) -> Self
    where
        S: ConnectionFactory<User>
            + ReadSource<User>
            + ReadSource<Post>
            + Clone
            + fmt::Debug
            + 'static,
    {
        let users: Arc<dyn UsersApi> = Arc::new(UserService::new(store.clone()));
        let posts: Arc<dyn PostsApi> = Arc::new(PostService::new(store));
        Self {
            users,
            posts,
            public_scheme: Arc::from(public_scheme),
            storage_backend,
        }
    }
}
