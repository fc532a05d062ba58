//! # quill-gateway
//!
//! REST backend for blog users and posts.
//!
//! The data-access core is two independent pieces: a
//! [`service::BatchWriter`] that persists a list of new records as one
//! all-or-nothing transaction, and [`pagination::paginate`], which turns a
//! page/limit request into a bounded page plus navigation metadata and
//! absolute links.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── UserService / PostService (service/)
//!     │       ├── BatchWriter ──► ConnectionFactory ──► TransactionHandle
//!     │       └── paginate    ──► ReadSource
//!     │
//!     └── Storage backends (storage/): PostgreSQL, in-memory
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod pagination;
pub mod service;
pub mod storage;
