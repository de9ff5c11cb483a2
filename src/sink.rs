//! `sink` is the seam between the scheduler and whatever actually owns the world.

use crate::{Location, Result, VolumeBuffer};

/// Applies a finished [`VolumeBuffer`] to a live world.
///
/// Only ever called from the scheduler loop, one call at a time, so two jobs can never
/// be committed concurrently (to the same target or otherwise).
/// The buffer is borrowed read-only, it's dropped together with the job afterwards.
///
/// Implementations should write the whole volume or nothing, and report rejections
/// as [`Error::CommitFailure`](crate::Error::CommitFailure) (other errors are accepted too,
/// their message ends up in the job's report).
pub trait CommitSink: Send + 'static {
    fn apply(&mut self, buffer: &VolumeBuffer, target: &Location) -> Result<()>;
}

impl<F> CommitSink for F
where
    F: FnMut(&VolumeBuffer, &Location) -> Result<()> + Send + 'static,
{
    fn apply(&mut self, buffer: &VolumeBuffer, target: &Location) -> Result<()> {
        self(buffer, target)
    }
}
