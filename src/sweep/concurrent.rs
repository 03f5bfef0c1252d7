use super::{BulkTaggedDeleter, DeletionFailure, SweepReport};
use crate::config::DeletionPolicy;
use crate::core::{
    ObjectId, RepositoryObject, Result, StoreError, StoreResult, SweepError, TagAllowList,
};
use crate::store::ObjectStore;
use futures::StreamExt;
use futures::stream::{BoxStream, FuturesUnordered};
use tracing::{Level, event};

enum Abort {
    Enumeration(StoreError),
    Deletion(ObjectId, StoreError),
}

/// Sweep with up to `concurrency` deletes in flight.
///
/// Enumeration stays sequential. Once the sweep stops pulling objects
/// (store exhausted, abort or cancellation) the enumeration stream is dropped
/// and every delete still in flight is awaited before returning, so the
/// deleted count and the failures carried by the error cover them.
pub(super) async fn run<S>(
    deleter: &BulkTaggedDeleter,
    store: &S,
    allow_list: &TagAllowList,
) -> Result<SweepReport>
where
    S: ObjectStore + ?Sized,
{
    let limit = deleter.config.concurrency;
    let policy = deleter.config.on_delete_error;
    let mut objects = Some(store.list_all());
    let mut in_flight = FuturesUnordered::new();
    let mut report = SweepReport::default();
    let mut abort: Option<Abort> = None;

    loop {
        if objects.is_some() && deleter.handle.is_cancelled() {
            report.cancelled = true;
            objects = None;
        }
        let can_pull = objects.is_some() && in_flight.len() < limit;
        if !can_pull && in_flight.is_empty() {
            break;
        }

        tokio::select! {
            biased;

            Some((id, result)) = in_flight.next(), if !in_flight.is_empty() => {
                match result {
                    Ok(()) => {
                        event!(Level::DEBUG, object_id = %id, "deleted");
                        report.deleted += 1;
                        report.deleted_ids.push(id);
                    }
                    Err(error) => match policy {
                        DeletionPolicy::Abort if abort.is_none() => {
                            event!(
                                Level::ERROR,
                                object_id = %id,
                                error = %error,
                                in_flight = in_flight.len(),
                                "delete failed, draining in-flight deletes"
                            );
                            abort = Some(Abort::Deletion(id, error));
                            objects = None;
                        }
                        DeletionPolicy::Abort => {
                            event!(Level::ERROR, object_id = %id, error = %error, "delete failed while draining");
                            report.failures.push(DeletionFailure { id, error });
                        }
                        DeletionPolicy::Continue => {
                            event!(Level::WARN, object_id = %id, error = %error, "delete failed, skipping");
                            report.failures.push(DeletionFailure { id, error });
                        }
                    },
                }
            }

            next = next_object(&mut objects), if can_pull => {
                match next {
                    None => objects = None,
                    Some(Err(error)) => {
                        event!(
                            Level::ERROR,
                            error = %error,
                            in_flight = in_flight.len(),
                            "enumeration failed, draining in-flight deletes"
                        );
                        abort = Some(Abort::Enumeration(error));
                        objects = None;
                    }
                    Some(Ok(object)) => {
                        report.scanned += 1;
                        let tags = store.relationship_tags(&object, &deleter.config.relation);
                        if allow_list.first_match(&tags).is_some() {
                            report.matched += 1;
                            in_flight.push(delete_one(store, object.id));
                        }
                    }
                }
            }

            else => break,
        }
    }

    match abort {
        None => Ok(report),
        Some(Abort::Enumeration(source)) => Err(SweepError::Enumeration {
            deleted: report.deleted,
            failures: report.failures,
            source,
        }),
        Some(Abort::Deletion(id, source)) => Err(SweepError::Deletion {
            id: id.to_string(),
            deleted: report.deleted,
            failures: report.failures,
            source,
        }),
    }
}

async fn next_object(
    objects: &mut Option<BoxStream<'_, StoreResult<RepositoryObject>>>,
) -> Option<StoreResult<RepositoryObject>> {
    match objects {
        Some(stream) => stream.next().await,
        None => None,
    }
}

async fn delete_one<S>(store: &S, id: ObjectId) -> (ObjectId, StoreResult<()>)
where
    S: ObjectStore + ?Sized,
{
    let result = store.delete(&id).await;
    (id, result)
}
