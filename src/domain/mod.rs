//! Domain layer: record identity, the entity contract, and the record types.
//!
//! Every record type implements [`Entity`] so that storage backends, the
//! batch writer and the pagination provider can stay generic over it.

pub mod post;
pub mod record;
pub mod user;

pub use post::{NewPost, Post, PostStatus, PostType};
pub use record::{Entity, RecordId};
pub use user::{NewUser, User, hash_password};
