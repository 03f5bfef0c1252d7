// ============================================================================
// modelsweep Library
// ============================================================================

pub mod config;
pub mod core;
pub mod store;
pub mod sweep;

// Re-export main types for convenience
pub use crate::config::{DeletionPolicy, SweepConfig};
pub use crate::core::{
    ObjectId, RelationKind, RepositoryObject, Result, StoreError, SweepError, TagAllowList,
    model_name, model_uri,
};
pub use crate::store::{InMemoryObjectStore, ObjectStore, SnapshotFile, StoreSnapshot};
pub use crate::sweep::{
    BulkTaggedDeleter, DeletionFailure, PlannedDeletion, SweepHandle, SweepPlan, SweepReport,
    SweepStep,
};

/// Deletes every object tagged as one of `tags` using default settings.
///
/// # Examples
///
/// ```
/// use modelsweep::{InMemoryObjectStore, RepositoryObject, delete_all};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryObjectStore::from_objects(vec![
///     RepositoryObject::new("demo:1").with_model("Item"),
///     RepositoryObject::new("demo:2").with_model("Other"),
///     RepositoryObject::new("demo:3").with_model("Collection"),
/// ]);
///
/// let report = delete_all(&store, ["Item", "Collection"]).await?;
/// assert_eq!(report.deleted, 2);
/// assert_eq!(store.len().await, 1);
/// # Ok(())
/// # }
/// ```
pub async fn delete_all<S, I, T>(store: &S, tags: I) -> Result<SweepReport>
where
    S: ObjectStore + ?Sized,
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    BulkTaggedDeleter::default().sweep_with_tags(store, tags).await
}
