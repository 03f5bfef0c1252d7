//! Capability surface of the repository the sweep runs against.

pub mod memory;
pub mod snapshot;

pub use memory::InMemoryObjectStore;
pub use snapshot::{SNAPSHOT_VERSION, SnapshotFile, StoreSnapshot};

use crate::core::{ObjectId, RelationKind, RepositoryObject, StoreResult};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Repository operations the sweep depends on.
///
/// Implementations own the objects; callers only see them for the duration
/// of one enumeration step.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lazily enumerates every object. Each call starts a fresh pass.
    fn list_all(&self) -> BoxStream<'_, StoreResult<RepositoryObject>>;

    /// Tag values of one relationship kind, model URIs reduced to model names.
    fn relationship_tags(&self, object: &RepositoryObject, kind: &RelationKind) -> BTreeSet<String> {
        object.tags(kind)
    }

    /// Removes one object.
    async fn delete(&self, id: &ObjectId) -> StoreResult<()>;
}

#[async_trait]
impl<S: ObjectStore + ?Sized> ObjectStore for Arc<S> {
    fn list_all(&self) -> BoxStream<'_, StoreResult<RepositoryObject>> {
        (**self).list_all()
    }

    fn relationship_tags(&self, object: &RepositoryObject, kind: &RelationKind) -> BTreeSet<String> {
        (**self).relationship_tags(object, kind)
    }

    async fn delete(&self, id: &ObjectId) -> StoreResult<()> {
        (**self).delete(id).await
    }
}
