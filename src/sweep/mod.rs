//! Bulk deletion of objects whose model tags intersect an allow-list.
//!
//! A sweep makes a single forward pass over [`ObjectStore::list_all`]. Each
//! object is evaluated once; the first allow-listed tag it carries decides
//! the match, so no object is deleted twice. Deletion order is enumeration
//! order unless deletes run concurrently.

mod concurrent;
mod handle;
mod report;

pub use handle::SweepHandle;
pub use crate::core::DeletionFailure;
pub use report::{PlannedDeletion, SweepPlan, SweepReport, SweepStep};

use crate::config::{DeletionPolicy, SweepConfig};
use crate::core::{RepositoryObject, Result, StoreResult, SweepError, TagAllowList};
use crate::store::ObjectStore;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use std::time::Instant;
use tracing::{Instrument, Level, event, info_span};

/// Walks an object store and deletes every object tagged with an
/// allow-listed model.
#[derive(Debug, Clone)]
pub struct BulkTaggedDeleter {
    config: SweepConfig,
    handle: SweepHandle,
}

struct StepState<'a> {
    objects: BoxStream<'a, StoreResult<RepositoryObject>>,
    deleted: usize,
    done: bool,
}

impl BulkTaggedDeleter {
    pub fn new(config: SweepConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            handle: SweepHandle::new(),
        })
    }

    /// Uses an existing handle instead of a fresh one.
    pub fn with_handle(mut self, handle: SweepHandle) -> Self {
        self.handle = handle;
        self
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    pub fn handle(&self) -> SweepHandle {
        self.handle.clone()
    }

    /// Sweeps with the allow-list from the configuration.
    pub async fn run<S>(&self, store: &S) -> Result<SweepReport>
    where
        S: ObjectStore + ?Sized,
    {
        self.sweep(store, &self.config.allow_list).await
    }

    /// Validates `tags` into an allow-list and sweeps with it.
    ///
    /// An empty or blank tag list fails with [`SweepError::Configuration`]
    /// before the store is touched.
    pub async fn sweep_with_tags<S, I, T>(&self, store: &S, tags: I) -> Result<SweepReport>
    where
        S: ObjectStore + ?Sized,
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let allow_list = TagAllowList::new(tags)?;
        self.sweep(store, &allow_list).await
    }

    /// Deletes every object in `store` whose model tags intersect
    /// `allow_list`.
    ///
    /// Enumeration failures abort the sweep. Deletion failures abort it
    /// under [`DeletionPolicy::Abort`] and are collected in the report under
    /// [`DeletionPolicy::Continue`]. Either abort error carries the number
    /// of objects deleted before it and every deletion failure recorded on
    /// the way.
    pub async fn sweep<S>(&self, store: &S, allow_list: &TagAllowList) -> Result<SweepReport>
    where
        S: ObjectStore + ?Sized,
    {
        let span = info_span!(
            "sweep.run",
            tags = ?allow_list.tags(),
            relation = %self.config.relation,
            policy = %self.config.on_delete_error,
            concurrency = self.config.concurrency
        );

        self.sweep_inner(store, allow_list).instrument(span).await
    }

    async fn sweep_inner<S>(&self, store: &S, allow_list: &TagAllowList) -> Result<SweepReport>
    where
        S: ObjectStore + ?Sized,
    {
        let started = Instant::now();
        let mut report = if self.config.concurrency > 1 {
            concurrent::run(self, store, allow_list).await?
        } else {
            self.sweep_sequential(store, allow_list).await?
        };
        report.elapsed = started.elapsed();

        event!(
            Level::INFO,
            scanned = report.scanned,
            matched = report.matched,
            deleted = report.deleted,
            failed = report.failures.len(),
            cancelled = report.cancelled,
            "sweep finished"
        );
        Ok(report)
    }

    async fn sweep_sequential<S>(&self, store: &S, allow_list: &TagAllowList) -> Result<SweepReport>
    where
        S: ObjectStore + ?Sized,
    {
        let mut report = SweepReport::default();
        let mut steps = self.steps(store, allow_list);
        loop {
            if self.handle.is_cancelled() {
                report.cancelled = true;
                break;
            }
            match steps.next().await {
                Some(Ok(step)) => report.record(step),
                Some(Err(err)) => return Err(err.with_failures(report.failures)),
                None => break,
            }
        }
        Ok(report)
    }

    /// Lazy, one-object-per-item form of [`sweep`](Self::sweep).
    ///
    /// Nothing is enumerated or deleted until the stream is polled; dropping
    /// it stops the sweep without touching objects not yet reached. After
    /// an `Err` item the stream ends. Failures skipped under
    /// [`DeletionPolicy::Continue`] arrive as [`SweepStep::Failed`] items, so
    /// the error item itself carries none.
    pub fn steps<'a, S>(
        &'a self,
        store: &'a S,
        allow_list: &'a TagAllowList,
    ) -> BoxStream<'a, Result<SweepStep>>
    where
        S: ObjectStore + ?Sized,
    {
        let state = StepState {
            objects: store.list_all(),
            deleted: 0,
            done: false,
        };

        stream::unfold(state, move |mut state| async move {
            if state.done || self.handle.is_cancelled() {
                return None;
            }

            let object = match state.objects.next().await? {
                Ok(object) => object,
                Err(source) => {
                    state.done = true;
                    event!(
                        Level::ERROR,
                        error = %source,
                        deleted = state.deleted,
                        "enumeration failed, aborting sweep"
                    );
                    let err = SweepError::Enumeration {
                        deleted: state.deleted,
                        failures: Vec::new(),
                        source,
                    };
                    return Some((Err(err), state));
                }
            };

            let Some(tag) = self.match_tag(store, allow_list, &object) else {
                return Some((Ok(SweepStep::Skipped { id: object.id }), state));
            };
            let id = object.id;

            let item = match store.delete(&id).await {
                Ok(()) => {
                    state.deleted += 1;
                    event!(Level::DEBUG, object_id = %id, tag = %tag, "deleted");
                    Ok(SweepStep::Deleted {
                        id,
                        tag: tag.to_string(),
                    })
                }
                Err(source) => match self.config.on_delete_error {
                    DeletionPolicy::Abort => {
                        state.done = true;
                        event!(
                            Level::ERROR,
                            object_id = %id,
                            error = %source,
                            deleted = state.deleted,
                            "delete failed, aborting sweep"
                        );
                        Err(SweepError::Deletion {
                            id: id.to_string(),
                            deleted: state.deleted,
                            failures: Vec::new(),
                            source,
                        })
                    }
                    DeletionPolicy::Continue => {
                        event!(Level::WARN, object_id = %id, error = %source, "delete failed, skipping");
                        Ok(SweepStep::Failed(DeletionFailure { id, error: source }))
                    }
                },
            };
            Some((item, state))
        })
        .boxed()
    }

    /// Dry run: reports what [`sweep`](Self::sweep) would delete without
    /// deleting anything.
    pub async fn plan<S>(&self, store: &S, allow_list: &TagAllowList) -> Result<SweepPlan>
    where
        S: ObjectStore + ?Sized,
    {
        let mut plan = SweepPlan::default();
        let mut objects = store.list_all();
        while let Some(object) = objects.next().await {
            let object = object.map_err(|source| SweepError::Enumeration {
                deleted: 0,
                failures: Vec::new(),
                source,
            })?;
            plan.scanned += 1;
            if let Some(tag) = self.match_tag(store, allow_list, &object) {
                plan.candidates.push(PlannedDeletion {
                    id: object.id,
                    tag: tag.to_string(),
                });
            }
        }
        event!(
            Level::INFO,
            scanned = plan.scanned,
            candidates = plan.len(),
            "sweep planned"
        );
        Ok(plan)
    }

    fn match_tag<'l, S>(
        &self,
        store: &S,
        allow_list: &'l TagAllowList,
        object: &RepositoryObject,
    ) -> Option<&'l str>
    where
        S: ObjectStore + ?Sized,
    {
        let tags = store.relationship_tags(object, &self.config.relation);
        allow_list.first_match(&tags)
    }
}

impl Default for BulkTaggedDeleter {
    fn default() -> Self {
        Self {
            config: SweepConfig::default(),
            handle: SweepHandle::new(),
        }
    }
}
