use super::ObjectStore;
use super::snapshot::StoreSnapshot;
use crate::core::{ObjectId, RepositoryObject, StoreError, StoreResult};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::ops::Bound;
use tokio::sync::RwLock;

pub const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Default)]
struct MemoryState {
    /// Objects keyed by insertion sequence, which is also enumeration order
    objects: BTreeMap<u64, RepositoryObject>,
    index: HashMap<ObjectId, u64>,
    protected: HashSet<ObjectId>,
    next_seq: u64,
}

/// Object store held entirely in memory.
///
/// Enumeration walks objects in insertion order, one page of identities at a
/// time. Each object is read when it is yielded, so objects removed after the
/// page was fetched are skipped.
pub struct InMemoryObjectStore {
    state: RwLock<MemoryState>,
    page_size: usize,
}

struct PageCursor {
    after: Option<u64>,
    pending: VecDeque<u64>,
    exhausted: bool,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// A zero page size is treated as one.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            page_size: page_size.max(1),
        }
    }

    pub fn from_objects<I>(objects: I) -> Self
    where
        I: IntoIterator<Item = RepositoryObject>,
    {
        let mut state = MemoryState::default();
        for object in objects {
            state.upsert(object);
        }
        Self {
            state: RwLock::new(state),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn from_snapshot(snapshot: StoreSnapshot, page_size: usize) -> Self {
        let mut state = MemoryState::default();
        for object in snapshot.objects {
            state.upsert(object);
        }
        state.protected = snapshot.protected.into_iter().collect();
        Self {
            state: RwLock::new(state),
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Inserts an object, replacing an existing one with the same identity
    /// in place.
    pub async fn insert(&self, object: RepositoryObject) {
        self.state.write().await.upsert(object);
    }

    pub async fn get(&self, id: &ObjectId) -> Option<RepositoryObject> {
        let state = self.state.read().await;
        let seq = state.index.get(id)?;
        state.objects.get(seq).cloned()
    }

    pub async fn contains(&self, id: &ObjectId) -> bool {
        self.state.read().await.index.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.objects.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.objects.is_empty()
    }

    /// Identities in enumeration order.
    pub async fn ids(&self) -> Vec<ObjectId> {
        let state = self.state.read().await;
        state.objects.values().map(|o| o.id.clone()).collect()
    }

    /// Marks an object so that deleting it is rejected.
    pub async fn protect(&self, id: impl Into<ObjectId>) {
        self.state.write().await.protected.insert(id.into());
    }

    pub async fn unprotect(&self, id: &ObjectId) -> bool {
        self.state.write().await.protected.remove(id)
    }

    pub async fn to_snapshot(&self) -> StoreSnapshot {
        let state = self.state.read().await;
        let mut protected: Vec<ObjectId> = state.protected.iter().cloned().collect();
        protected.sort();
        StoreSnapshot::new(state.objects.values().cloned().collect(), protected)
    }

    async fn next_page(&self, cursor: &mut PageCursor) {
        let state = self.state.read().await;
        let lower = match cursor.after {
            Some(seq) => Bound::Excluded(seq),
            None => Bound::Unbounded,
        };
        cursor.pending.extend(
            state
                .objects
                .range((lower, Bound::Unbounded))
                .map(|(seq, _)| *seq)
                .take(self.page_size),
        );
        if cursor.pending.len() < self.page_size {
            cursor.exhausted = true;
        }
        if let Some(last) = cursor.pending.back() {
            cursor.after = Some(*last);
        }
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryState {
    fn upsert(&mut self, object: RepositoryObject) {
        match self.index.get(&object.id) {
            Some(seq) => {
                self.objects.insert(*seq, object);
            }
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.index.insert(object.id.clone(), seq);
                self.objects.insert(seq, object);
            }
        }
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    fn list_all(&self) -> BoxStream<'_, StoreResult<RepositoryObject>> {
        let cursor = PageCursor {
            after: None,
            pending: VecDeque::new(),
            exhausted: false,
        };

        stream::unfold(cursor, move |mut cursor| async move {
            loop {
                if cursor.pending.is_empty() {
                    if cursor.exhausted {
                        return None;
                    }
                    self.next_page(&mut cursor).await;
                    if cursor.pending.is_empty() {
                        return None;
                    }
                }

                let seq = cursor.pending.pop_front()?;
                let object = self.state.read().await.objects.get(&seq).cloned();
                if let Some(object) = object {
                    return Some((Ok(object), cursor));
                }
            }
        })
        .boxed()
    }

    async fn delete(&self, id: &ObjectId) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.protected.contains(id) {
            return Err(StoreError::Rejected {
                id: id.to_string(),
                reason: "object is protected".into(),
            });
        }
        let seq = state
            .index
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        state.objects.remove(&seq);
        Ok(())
    }
}
