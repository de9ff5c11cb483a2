//! `plugin` wires everything together once at startup and tears it down at shutdown.

use crate::{
    FoxEditConfig, Result, SchedulerService,
    command::{CommandResult, CommandSource, FillCommand},
    job::JobReport,
    selection::PositionSelection,
    sink::CommitSink,
    world::World,
};
use std::sync::Arc;

/// The plugin: one scheduler thread plus the `fefill` command that submits to it.
///
/// The world is used twice, as the scheduler's [`CommitSink`] and for the command's
/// direct writes, so it has to be a cheaply cloneable handle (like [`MemoryWorld`](crate::MemoryWorld)).
pub struct FoxEdit<W, P>
where
    W: World + CommitSink + Clone,
    P: PositionSelection,
{
    service: SchedulerService,
    command: FillCommand<W, P>,
}

impl<W, P> FoxEdit<W, P>
where
    W: World + CommitSink + Clone,
    P: PositionSelection,
{
    pub const NAME: &'static str = "FoxEdit";
    pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    pub fn start(config: FoxEditConfig, world: W, selection: P) -> Result<Self> {
        log::info!("Beginning {} initialization", Self::NAME);
        log::info!("Version: {}", Self::VERSION);

        let ttl = config.scheduler.default_ttl;
        let service = SchedulerService::spawn(config.scheduler, world.clone())?;

        log::info!("Registering commands");
        let command = FillCommand::new(service.handle(), world, selection, config.fill, ttl);

        log::info!("Finished loading {}!", Self::NAME);
        Ok(Self { service, command })
    }

    /// Dispatches a command line without the leading slash, `None` if it isn't one of ours
    pub fn process_command<S: CommandSource>(
        &self,
        source: &Arc<S>,
        line: &str,
    ) -> Option<CommandResult> {
        let line = line.trim().trim_start_matches('/');
        let (alias, arguments) = line.split_once(' ').unwrap_or((line, ""));
        if alias != FillCommand::<W, P>::ALIAS {
            return None;
        }

        Some(self.command.process(source, arguments))
    }

    pub fn command(&self) -> &FillCommand<W, P> {
        &self.command
    }

    /// Stops the scheduler, every job still running is cancelled without committing
    pub fn shutdown(self) -> Vec<JobReport> {
        log::info!("Stopping {}", Self::NAME);
        self.service.shutdown()
    }
}
