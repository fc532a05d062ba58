//! Record identity and the [`Entity`] contract shared by every storage backend.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Store-assigned identity of a persisted record.
///
/// Wraps the `BIGSERIAL` primary key. Allocated by the store when a record
/// is created and never reused, even when the surrounding transaction rolls
/// back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    /// Creates a `RecordId` from a raw key.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw key.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecordId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl From<RecordId> for i64 {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

/// A record type the store can create, count and page through.
///
/// `Draft` is the creation payload: everything but the identity. The store
/// assigns the [`RecordId`] and calls [`Entity::create`] to build the record.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Creation payload for one new record.
    type Draft: Send + 'static;

    /// Name of the backing table.
    const TABLE: &'static str;

    /// Builds the record from a draft and its freshly allocated identity.
    fn create(id: RecordId, draft: Self::Draft) -> Self;

    /// Returns the record identity.
    fn id(&self) -> RecordId;

    /// Value that must be unique across the table, if the type has one.
    fn unique_key(&self) -> Option<&str> {
        None
    }
}
