#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use modelsweep::core::StoreResult;
use modelsweep::{InMemoryObjectStore, ObjectId, ObjectStore, RepositoryObject, StoreError};
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Wraps an in-memory store with call recording and injected failures.
pub struct FaultyStore {
    pub inner: InMemoryObjectStore,
    /// 1-based enumeration position that yields an error instead of an object
    pub fail_enumeration_at: Option<usize>,
    pub fail_deletes: HashSet<ObjectId>,
    pub delete_delay: Option<Duration>,
    list_calls: AtomicUsize,
    delete_calls: Mutex<Vec<ObjectId>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FaultyStore {
    pub fn new(objects: Vec<RepositoryObject>) -> Self {
        Self {
            inner: InMemoryObjectStore::from_objects(objects),
            fail_enumeration_at: None,
            fail_deletes: HashSet::new(),
            delete_delay: None,
            list_calls: AtomicUsize::new(0),
            delete_calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn failing_enumeration_at(mut self, position: usize) -> Self {
        self.fail_enumeration_at = Some(position);
        self
    }

    pub fn failing_delete(mut self, id: &str) -> Self {
        self.fail_deletes.insert(ObjectId::new(id));
        self
    }

    pub fn with_delete_delay(mut self, delay: Duration) -> Self {
        self.delete_delay = Some(delay);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> Vec<ObjectId> {
        self.delete_calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub async fn remaining(&self) -> Vec<String> {
        self.inner
            .ids()
            .await
            .into_iter()
            .map(|id| id.to_string())
            .collect()
    }
}

#[async_trait]
impl ObjectStore for FaultyStore {
    fn list_all(&self) -> BoxStream<'_, StoreResult<RepositoryObject>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let fail_at = self.fail_enumeration_at;
        self.inner
            .list_all()
            .enumerate()
            .map(move |(index, item)| {
                if Some(index + 1) == fail_at {
                    Err(StoreError::Unavailable("page fetch timed out".into()))
                } else {
                    item
                }
            })
            .boxed()
    }

    async fn delete(&self, id: &ObjectId) -> StoreResult<()> {
        self.delete_calls.lock().unwrap().push(id.clone());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delete_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_deletes.contains(id) {
            return Err(StoreError::Rejected {
                id: id.to_string(),
                reason: "injected failure".into(),
            });
        }
        self.inner.delete(id).await
    }
}

pub fn tagged(id: &str, model: &str) -> RepositoryObject {
    RepositoryObject::new(id).with_model(model)
}

/// `count` objects alternating between Item, Other and Collection.
pub fn mixed_objects(count: usize) -> Vec<RepositoryObject> {
    (1..=count)
        .map(|n| {
            let model = match n % 3 {
                1 => "Item",
                2 => "Other",
                _ => "Collection",
            };
            tagged(&format!("demo:{}", n), model)
        })
        .collect()
}
