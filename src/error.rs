//! `error` contains the [`Error`] type for this crate and a shorthand [`Result`] type.

use crate::{Coords, job::JobState};

pub type Result<T> = std::result::Result<T, Error>;

/// Show the [`std::fmt::Display`] of the error to display even further context & info
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Every extent dimension must be greater than zero, got {0:?}")]
    InvalidExtent(Coords),
    #[error("Coordinates {coords:?} are outside of the buffer extent {extent:?}")]
    OutOfBounds { coords: Coords, extent: Coords },
    #[error("Extent {extent:?} has more than the {max} cells a single buffer may hold")]
    ExtentTooLarge { extent: Coords, max: usize },
    #[error("Fill failed: {0}")]
    FillFailure(String),
    #[error("Commit failed: {0}")]
    CommitFailure(String),
    #[error("Job did not finish before its deadline")]
    TimedOut,

    #[error("Local cell {local:?} placed at {target:?} leaves the coordinate space")]
    PositionOverflow { target: Coords, local: Coords },

    #[error("Invalid job state transition: {from:?} -> {to:?}")]
    InvalidTransition { from: JobState, to: JobState },
    #[error("'{0}' is not a valid block id")]
    InvalidBlock(String),
    #[error("No loaded world named '{0}'")]
    UnknownWorld(String),
    #[error("Y {y} is outside of the world build height {min}..={max}")]
    OutsideBuildHeight { y: i32, min: i32, max: i32 },
    #[error("The scheduler is no longer running")]
    SchedulerStopped,
    #[error("Failed to start the scheduler thread: {0}")]
    SchedulerSpawn(String),
    #[error("Command source '{0}' has no location in any world")]
    NotAPlayer(String),
}
