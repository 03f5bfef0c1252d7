use crate::core::{DeletionFailure, ObjectId};
use std::fmt;
use std::time::Duration;

/// Outcome of evaluating one enumerated object.
#[derive(Debug)]
pub enum SweepStep {
    /// Matched `tag` and was deleted
    Deleted { id: ObjectId, tag: String },
    /// No allow-listed tag
    Skipped { id: ObjectId },
    /// Matched but the store refused or failed the delete
    Failed(DeletionFailure),
}

impl SweepStep {
    pub fn id(&self) -> &ObjectId {
        match self {
            SweepStep::Deleted { id, .. } | SweepStep::Skipped { id } => id,
            SweepStep::Failed(failure) => &failure.id,
        }
    }
}

/// Totals for one completed (or cancelled) sweep.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub scanned: usize,
    pub matched: usize,
    pub deleted: usize,
    /// Deleted identities in completion order
    pub deleted_ids: Vec<ObjectId>,
    pub failures: Vec<DeletionFailure>,
    /// Stopped through a [`SweepHandle`](super::SweepHandle) before the
    /// store was exhausted
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    pub(crate) fn record(&mut self, step: SweepStep) {
        self.scanned += 1;
        match step {
            SweepStep::Deleted { id, .. } => {
                self.matched += 1;
                self.deleted += 1;
                self.deleted_ids.push(id);
            }
            SweepStep::Skipped { .. } => {}
            SweepStep::Failed(failure) => {
                self.matched += 1;
                self.failures.push(failure);
            }
        }
    }
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scanned {}, matched {}, deleted {}, failed {}",
            self.scanned,
            self.matched,
            self.deleted,
            self.failures.len()
        )?;
        if self.cancelled {
            f.write_str(" (cancelled)")?;
        }
        Ok(())
    }
}

/// An object a sweep would delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedDeletion {
    pub id: ObjectId,
    pub tag: String,
}

/// Result of a dry run: what a sweep would delete right now.
#[derive(Debug, Clone, Default)]
pub struct SweepPlan {
    pub scanned: usize,
    pub candidates: Vec<PlannedDeletion>,
}

impl SweepPlan {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.candidates.iter().map(|c| &c.id)
    }
}
