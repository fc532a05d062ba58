//! PostgreSQL storage backend using `sqlx::PgPool`.
//!
//! Each batch runs on one pooled connection with raw `BEGIN` / `COMMIT` /
//! `ROLLBACK` statements. A connection that is still inside a transaction
//! when released or dropped is closed rather than handed back to the pool,
//! which makes the server abort whatever was left open.

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgConnection, PgPool, Postgres};

use super::{ConnectionFactory, ReadSource, StoreConnection};
use crate::domain::{Entity, NewPost, NewUser, Post, RecordId, User};
use crate::error::StorageError;

/// Row mapping for entities stored in PostgreSQL.
#[async_trait]
pub trait PgEntity: Entity + Sized {
    /// Inserts one row on `conn` and returns the stored record.
    ///
    /// # Errors
    ///
    /// Returns the driver error on failure, including constraint violations.
    async fn insert(conn: &mut PgConnection, draft: Self::Draft) -> Result<Self, sqlx::Error>;

    /// Selects rows ordered by primary key.
    ///
    /// # Errors
    ///
    /// Returns the driver error on failure.
    async fn select_page(pool: &PgPool, offset: i64, limit: i64) -> Result<Vec<Self>, sqlx::Error>;
}

/// PostgreSQL-backed store.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if the initial connection fails.
    pub async fn connect_pool(
        options: PgConnectOptions,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: std::time::Duration,
    ) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }
}

/// Pooled connection driving one transaction for records of type `T`.
///
/// `in_transaction` is raised before `BEGIN` is sent and cleared only once
/// `COMMIT` or `ROLLBACK` has succeeded. While it is raised the connection
/// never goes back to the pool: [`StoreConnection::release`] closes it, and
/// so does dropping it, which covers a batch future cancelled mid-way.
#[derive(Debug)]
pub struct PgStoreConnection<T> {
    conn: Option<PoolConnection<Postgres>>,
    in_transaction: bool,
    _record: PhantomData<fn() -> T>,
}

impl<T> PgStoreConnection<T> {
    fn conn(&mut self) -> Result<&mut PgConnection, StorageError> {
        self.conn
            .as_deref_mut()
            .ok_or_else(|| StorageError::Unavailable("connection already released".to_string()))
    }
}

impl<T> Drop for PgStoreConnection<T> {
    fn drop(&mut self) {
        if let (true, Some(conn)) = (self.in_transaction, self.conn.as_mut()) {
            tracing::warn!("connection dropped inside a transaction, closing it");
            conn.close_on_drop();
        }
    }
}

#[async_trait]
impl<T: PgEntity> ConnectionFactory<T> for PostgresStore {
    type Connection = PgStoreConnection<T>;

    async fn connect(&self) -> Result<Self::Connection, StorageError> {
        let conn = self.pool.acquire().await?;
        Ok(PgStoreConnection {
            conn: Some(conn),
            in_transaction: false,
            _record: PhantomData,
        })
    }
}

#[async_trait]
impl<T: PgEntity> StoreConnection for PgStoreConnection<T> {
    type Record = T;

    async fn begin_transaction(&mut self) -> Result<(), StorageError> {
        self.in_transaction = true;
        sqlx::query("BEGIN").execute(self.conn()?).await?;
        Ok(())
    }

    async fn create(&mut self, draft: T::Draft) -> Result<T, StorageError> {
        T::insert(self.conn()?, draft)
            .await
            .map_err(|e| unique_violation(e, T::TABLE))
    }

    async fn commit(&mut self) -> Result<(), StorageError> {
        sqlx::query("COMMIT").execute(self.conn()?).await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StorageError> {
        sqlx::query("ROLLBACK").execute(self.conn()?).await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn release(mut self) -> Result<(), StorageError> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        if self.in_transaction {
            tracing::warn!(table = T::TABLE, "closing connection with an open transaction");
            self.in_transaction = false;
            conn.close().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<T: PgEntity> ReadSource<T> for PostgresStore {
    async fn count(&self) -> Result<u64, StorageError> {
        let sql = format!("SELECT COUNT(*) FROM {}", T::TABLE);
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn find(&self, skip: u64, take: u64) -> Result<Vec<T>, StorageError> {
        let offset = i64::try_from(skip).unwrap_or(i64::MAX);
        let limit = i64::try_from(take).unwrap_or(i64::MAX);
        Ok(T::select_page(&self.pool, offset, limit).await?)
    }
}

/// Maps a unique-constraint violation (`23505`) to
/// [`StorageError::UniqueViolation`]; everything else stays a driver error.
fn unique_violation(err: sqlx::Error, table: &'static str) -> StorageError {
    let key = err
        .as_database_error()
        .filter(|db_err| db_err.code().as_deref() == Some("23505"))
        .map(|db_err| db_err.constraint().unwrap_or("unknown").to_string());
    match key {
        Some(key) => StorageError::UniqueViolation { table, key },
        None => StorageError::Database(err),
    }
}

type UserRow = (i64, String, Option<String>, String, String);

fn user_from_row((id, first_name, last_name, email, password_hash): UserRow) -> User {
    User {
        id: RecordId::new(id),
        first_name,
        last_name,
        email,
        password_hash,
    }
}

#[async_trait]
impl PgEntity for User {
    async fn insert(conn: &mut PgConnection, draft: NewUser) -> Result<Self, sqlx::Error> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (first_name, last_name, email, password) VALUES ($1, $2, $3, $4) \
             RETURNING id, first_name, last_name, email, password",
        )
        .bind(&draft.first_name)
        .bind(&draft.last_name)
        .bind(&draft.email)
        .bind(&draft.password_hash)
        .fetch_one(&mut *conn)
        .await?;

        Ok(user_from_row(row))
    }

    async fn select_page(pool: &PgPool, offset: i64, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, first_name, last_name, email, password FROM users \
             ORDER BY id ASC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(user_from_row).collect())
    }
}

type PostRow = (
    i64,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<DateTime<Utc>>,
    DateTime<Utc>,
);

fn post_from_row(row: PostRow) -> Result<Post, sqlx::Error> {
    let (id, title, post_type, slug, status, content, featured_image_url, publish_on, created_at) =
        row;
    Ok(Post {
        id: RecordId::new(id),
        title,
        post_type: post_type
            .parse()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        slug,
        status: status
            .parse()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        content,
        featured_image_url,
        publish_on,
        created_at,
    })
}

const POST_COLUMNS: &str =
    "id, title, post_type, slug, status, content, featured_image_url, publish_on, created_at";

#[async_trait]
impl PgEntity for Post {
    async fn insert(conn: &mut PgConnection, draft: NewPost) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO posts (title, post_type, slug, status, content, featured_image_url, publish_on) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {POST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(&draft.title)
            .bind(draft.post_type.as_str())
            .bind(&draft.slug)
            .bind(draft.status.as_str())
            .bind(&draft.content)
            .bind(&draft.featured_image_url)
            .bind(draft.publish_on)
            .fetch_one(&mut *conn)
            .await?;

        post_from_row(row)
    }

    async fn select_page(pool: &PgPool, offset: i64, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts ORDER BY id ASC LIMIT $1 OFFSET $2");
        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        rows.into_iter().map(post_from_row).collect()
    }
}
