use crate::{Block, Coords};
use std::{ops::RangeInclusive, time::Duration};

/// Config for how the [`JobScheduler`](crate::JobScheduler) polls its jobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// How often live jobs are examined, completions picked up and ready buffers committed.
    pub tick_interval: Duration,
    /// Deadline used when a submission doesn't specify its own.
    ///
    /// Always turned into an absolute point in time at submission.
    pub default_ttl: Duration,
    /// Largest cell count a submitted extent may have, checked before any buffer is allocated
    pub max_volume: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5),
            default_ttl: Duration::from_secs(60),
            max_volume: 25 * 25 * 25 * 64,
        }
    }
}

/// What the argument-less `fefill` command generates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillConfig {
    pub extent: Coords,
    pub block: Block,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            extent: Coords::new(25, 25, 25),
            block: Block::new("torch"),
        }
    }
}

/// Everything [`FoxEdit`](crate::FoxEdit) needs at startup
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FoxEditConfig {
    pub scheduler: SchedulerConfig,
    pub fill: FillConfig,
}

/// Vanilla build height, used by [`MemoryWorld`](crate::MemoryWorld) unless told otherwise
pub const DEFAULT_WORLD_HEIGHT: RangeInclusive<i32> = -64..=319;
