//! Service layer: the batch writer and the per-resource services handlers
//! talk to.
//!
//! [`UsersApi`] and [`PostsApi`] are object-safe so that `main` can bind
//! them to whichever storage backend the configuration selects.

pub mod batch_writer;
pub mod post_service;
pub mod user_service;

pub use batch_writer::BatchWriter;
pub use post_service::{PostService, PostsApi};
pub use user_service::{UserService, UsersApi};
