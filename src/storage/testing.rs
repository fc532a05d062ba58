//! Fault-injecting wrapper around [`MemoryStore`] for exercising failure
//! paths. Every call is recorded so tests can assert on the exact sequence.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::memory::MemoryConnection;
use super::{ConnectionFactory, MemoryStore, ReadSource, StoreConnection};
use crate::domain::Entity;
use crate::error::StorageError;

pub(crate) const STALL: Duration = Duration::from_millis(100);

/// Which operations should fail.
#[derive(Debug, Clone, Default)]
pub(crate) struct Faults {
    pub connect: bool,
    pub begin: bool,
    /// Zero-based index of the create call that fails.
    pub create_at: Option<usize>,
    /// Zero-based index of the create call that stalls for [`STALL`] first.
    pub stall_create_at: Option<usize>,
    pub commit: bool,
    pub rollback: bool,
    pub release: bool,
    /// Fails `count` and `find`.
    pub read: bool,
}

type CallLog = Arc<Mutex<Vec<&'static str>>>;

#[derive(Debug, Clone)]
pub(crate) struct FaultyStore {
    pub inner: MemoryStore,
    faults: Faults,
    calls: CallLog,
}

impl FaultyStore {
    pub fn new(faults: Faults) -> Self {
        Self {
            inner: MemoryStore::new(),
            faults,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }
}

fn record(calls: &CallLog, call: &'static str) {
    if let Ok(mut calls) = calls.lock() {
        calls.push(call);
    }
}

fn injected(operation: &str) -> StorageError {
    StorageError::Unavailable(format!("injected {operation} failure"))
}

#[derive(Debug)]
pub(crate) struct FaultyConnection<T: Entity> {
    inner: MemoryConnection<T>,
    faults: Faults,
    calls: CallLog,
    creates: usize,
}

#[async_trait]
impl<T: Entity> ConnectionFactory<T> for FaultyStore {
    type Connection = FaultyConnection<T>;

    async fn connect(&self) -> Result<Self::Connection, StorageError> {
        record(&self.calls, "connect");
        if self.faults.connect {
            return Err(injected("connect"));
        }
        let inner = ConnectionFactory::<T>::connect(&self.inner).await?;
        Ok(FaultyConnection {
            inner,
            faults: self.faults.clone(),
            calls: Arc::clone(&self.calls),
            creates: 0,
        })
    }
}

#[async_trait]
impl<T: Entity> StoreConnection for FaultyConnection<T> {
    type Record = T;

    async fn begin_transaction(&mut self) -> Result<(), StorageError> {
        record(&self.calls, "begin");
        if self.faults.begin {
            return Err(injected("begin"));
        }
        self.inner.begin_transaction().await
    }

    async fn create(&mut self, draft: T::Draft) -> Result<T, StorageError> {
        record(&self.calls, "create");
        let index = self.creates;
        self.creates += 1;
        if self.faults.stall_create_at == Some(index) {
            tokio::time::sleep(STALL).await;
        }
        if self.faults.create_at == Some(index) {
            return Err(injected("create"));
        }
        self.inner.create(draft).await
    }

    async fn commit(&mut self) -> Result<(), StorageError> {
        record(&self.calls, "commit");
        if self.faults.commit {
            return Err(injected("commit"));
        }
        self.inner.commit().await
    }

    async fn rollback(&mut self) -> Result<(), StorageError> {
        record(&self.calls, "rollback");
        if self.faults.rollback {
            return Err(injected("rollback"));
        }
        self.inner.rollback().await
    }

    async fn release(self) -> Result<(), StorageError> {
        record(&self.calls, "release");
        self.inner.release().await?;
        if self.faults.release {
            return Err(injected("release"));
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Entity> ReadSource<T> for FaultyStore {
    async fn count(&self) -> Result<u64, StorageError> {
        record(&self.calls, "count");
        if self.faults.read {
            return Err(injected("count"));
        }
        ReadSource::<T>::count(&self.inner).await
    }

    async fn find(&self, skip: u64, take: u64) -> Result<Vec<T>, StorageError> {
        record(&self.calls, "find");
        if self.faults.read {
            return Err(injected("find"));
        }
        ReadSource::<T>::find(&self.inner, skip, take).await
    }
}
