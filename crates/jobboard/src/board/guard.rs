//! Duplicate guard for applications.
//!
//! A job/seeker pair may hold at most one application that has not been withdrawn. The
//! same predicate backs both the read-only check exposed to callers and the insert path
//! of the store, which evaluates it inside the transaction that performs the insert.

use super::domain::{Application, JobId, SeekerId};
use super::repository::{BoardRepository, StoreError};

/// Locate the active application for a pair among already loaded rows.
pub fn active_for_pair<'a, I>(
    applications: I,
    job_id: JobId,
    seeker_id: SeekerId,
) -> Option<&'a Application>
where
    I: IntoIterator<Item = &'a Application>,
{
    applications.into_iter().find(|application| {
        application.job_id == job_id
            && application.seeker_id == seeker_id
            && application.status.is_active()
    })
}

/// True when the pair holds a pending, accepted, or rejected application.
///
/// Rejected applications count as active: a rejected seeker cannot quietly re-apply.
pub fn has_active_application<R>(
    repository: &R,
    job_id: JobId,
    seeker_id: SeekerId,
) -> Result<bool, StoreError>
where
    R: BoardRepository + ?Sized,
{
    Ok(repository.active_application(job_id, seeker_id)?.is_some())
}
