#![doc = include_str!("../readme.md")]

mod block;
mod command;
mod config;
mod coords;
mod error;
pub mod fill;
mod job;
mod plugin;
mod scheduler;
mod selection;
mod service;
mod sink;
mod volume;
mod world;

pub use block::Block;
pub use command::{ChatSource, CommandResult, CommandSource, FillCommand};
pub use config::{DEFAULT_WORLD_HEIGHT, FillConfig, FoxEditConfig, SchedulerConfig};
pub use coords::{Coords, Location};
pub use error::{Error, Result};
pub use job::{EditJob, JobId, JobOutcome, JobReport, JobState, OnCommit, OnResolved};
pub use plugin::FoxEdit;
pub use scheduler::{EditRequest, JobScheduler};
pub use selection::{PositionSelection, SelectionStore};
pub use service::{SchedulerHandle, SchedulerService};
pub use sink::CommitSink;
pub use volume::VolumeBuffer;
pub use world::{MemoryWorld, World};
