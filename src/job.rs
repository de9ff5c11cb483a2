//! `job` contains [`EditJob`] and it's state machine.
//!
//! ```text
//! Filling ──> Ready ──> Committed
//!    │          │
//!    ├──────────┴─────> Failed | TimedOut | Cancelled
//! ```
//!
//! Transitions only ever move forward, terminal states can't be left.

use crate::{Coords, Error, Location, Result, VolumeBuffer};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

/// Identifies a single job for the lifetime of a process, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    /// The fill is in flight on a worker
    Filling,
    /// The fill finished, the buffer is waiting for the next tick to be committed
    Ready,
    Committed,
    Failed,
    TimedOut,
    /// Dropped because the scheduler shut down
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Committed | JobState::Failed | JobState::TimedOut | JobState::Cancelled
        )
    }

    fn can_become(&self, to: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, to),
            (Filling, Ready)
                | (Filling, Failed)
                | (Filling, TimedOut)
                | (Filling, Cancelled)
                | (Ready, Committed)
                | (Ready, Failed)
                | (Ready, TimedOut)
                | (Ready, Cancelled)
        )
    }
}

/// How a job ended, handed out once per job when it's removed from the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Committed,
    FillFailed(String),
    CommitFailed(String),
    TimedOut,
    Cancelled,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Committed)
    }

    /// The terminal [`JobState`] this outcome leaves a job in
    pub fn state(&self) -> JobState {
        match self {
            JobOutcome::Committed => JobState::Committed,
            JobOutcome::FillFailed(_) | JobOutcome::CommitFailed(_) => JobState::Failed,
            JobOutcome::TimedOut => JobState::TimedOut,
            JobOutcome::Cancelled => JobState::Cancelled,
        }
    }

    /// The error a failed outcome corresponds to, [`None`] when committed
    pub fn error(&self) -> Option<Error> {
        match self {
            JobOutcome::Committed | JobOutcome::Cancelled => None,
            JobOutcome::FillFailed(reason) => Some(Error::FillFailure(reason.clone())),
            JobOutcome::CommitFailed(reason) => Some(Error::CommitFailure(reason.clone())),
            JobOutcome::TimedOut => Some(Error::TimedOut),
        }
    }
}

/// Sent to whoever submitted a job once it has resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub id: JobId,
    pub target: Location,
    pub outcome: JobOutcome,
    /// Time from submission until resolution
    pub elapsed: Duration,
}

impl std::fmt::Display for JobReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let target = &self.target;
        match &self.outcome {
            JobOutcome::Committed => write!(
                f,
                "Edit {} applied at {:?} in '{}' ({:?})",
                self.id, target.coords, target.world, self.elapsed
            ),
            JobOutcome::FillFailed(reason) => {
                write!(f, "Edit {} failed while generating: {reason}", self.id)
            }
            JobOutcome::CommitFailed(reason) => {
                write!(f, "Edit {} could not be applied: {reason}", self.id)
            }
            JobOutcome::TimedOut => write!(f, "Edit {} timed out", self.id),
            JobOutcome::Cancelled => write!(f, "Edit {} was cancelled", self.id),
        }
    }
}

/// Called on the scheduler loop when a job resolves
pub type OnResolved = Box<dyn FnOnce(&JobReport) + Send + 'static>;

/// Called on the scheduler loop right before a ready job is handed to the commit sink
pub type OnCommit = Box<dyn FnOnce(JobId) + Send + 'static>;

/// A single edit: a buffer being filled, where it should go, and when to give up on it.
pub struct EditJob {
    pub id: JobId,
    pub target: Location,
    pub extent: Coords,
    pub created_at: Instant,
    /// Fixed at creation, never extended
    deadline: Instant,
    state: JobState,

    /// [`None`] while the buffer is out on a fill worker
    pub(crate) buffer: Option<VolumeBuffer>,
    /// Shared with the fill worker so it can stop early once the job is abandoned
    pub(crate) cancel: Arc<AtomicBool>,
    pub(crate) on_resolved: Option<OnResolved>,
    pub(crate) on_commit: Option<OnCommit>,
}

impl EditJob {
    pub fn new(
        id: JobId,
        target: Location,
        extent: Coords,
        created_at: Instant,
        ttl: Duration,
        on_resolved: Option<OnResolved>,
    ) -> Self {
        Self {
            id,
            target,
            extent,
            created_at,
            deadline: created_at + ttl,
            state: JobState::Filling,
            buffer: None,
            cancel: Arc::new(AtomicBool::new(false)),
            on_resolved,
            on_commit: None,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    /// Moves the job forward, refusing anything that would leave a terminal state or go backwards
    pub fn transition(&mut self, to: JobState) -> Result<()> {
        if !self.state.can_become(to) {
            return Err(Error::InvalidTransition {
                from: self.state,
                to,
            });
        }

        self.state = to;
        if to.is_terminal() {
            // the buffer is discarded with the job, and any worker still writing should stop
            self.buffer = None;
            self.cancel.store(true, Ordering::Release);
        }
        Ok(())
    }

    /// Builds the report for a terminal job
    pub(crate) fn report(&self, outcome: JobOutcome, now: Instant) -> JobReport {
        JobReport {
            id: self.id,
            target: self.target.clone(),
            outcome,
            elapsed: now.saturating_duration_since(self.created_at),
        }
    }
}

impl std::fmt::Debug for EditJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditJob")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("extent", &self.extent)
            .field("state", &self.state)
            .field("deadline", &self.deadline)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn job() -> EditJob {
        EditJob::new(
            JobId(1),
            Location::new("overworld", (0, 0, 0)),
            Coords::new(1, 1, 1),
            Instant::now(),
            Duration::from_secs(5),
            None,
        )
    }

    #[test]
    fn success_path() -> Result<()> {
        let mut job = job();
        assert_eq!(job.state(), JobState::Filling);
        job.transition(JobState::Ready)?;
        job.transition(JobState::Committed)?;
        assert!(job.state().is_terminal());
        assert!(job.cancel.load(Ordering::Acquire));
        Ok(())
    }

    #[test]
    fn terminal_states_are_final() -> Result<()> {
        for terminal in [
            JobState::Failed,
            JobState::TimedOut,
            JobState::Cancelled,
        ] {
            let mut job = job();
            job.transition(terminal)?;
            for next in [
                JobState::Filling,
                JobState::Ready,
                JobState::Committed,
                JobState::Failed,
                JobState::TimedOut,
            ] {
                assert_eq!(
                    job.transition(next),
                    Err(Error::InvalidTransition { from: terminal, to: next })
                );
            }
            assert_eq!(job.state(), terminal);
        }
        Ok(())
    }

    #[test]
    fn no_commit_without_ready() {
        let mut job = job();
        assert!(job.transition(JobState::Committed).is_err());
        assert_eq!(job.state(), JobState::Filling);
    }

    #[test]
    fn deadline_is_fixed() {
        let job = job();
        assert_eq!(job.deadline(), job.created_at + Duration::from_secs(5));
        assert!(!job.is_expired(job.created_at + Duration::from_secs(4)));
        assert!(job.is_expired(job.created_at + Duration::from_secs(5)));
    }

    #[test]
    fn outcome_states() {
        assert_eq!(JobOutcome::Committed.state(), JobState::Committed);
        assert_eq!(
            JobOutcome::CommitFailed("nope".into()).state(),
            JobState::Failed
        );
        assert_eq!(JobOutcome::TimedOut.error(), Some(Error::TimedOut));
        assert_eq!(JobOutcome::Committed.error(), None);
    }
}
