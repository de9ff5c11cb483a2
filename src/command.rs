//! `command` contains the `fefill` chat command and the [`CommandSource`] it answers to.
//!
//! - `fefill` generates a [`FillConfig`] sized box of blocks at the source's location
//!   through the scheduler, replying when it starts, when the merge begins and when it resolves.
//! - `fefill <block>` sets `<block>` at every position the source has selected, right away.

use crate::{
    Block, Error, FillConfig, Location, Result,
    fill,
    scheduler::EditRequest,
    selection::PositionSelection,
    service::SchedulerHandle,
    world::World,
};
use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

/// Whoever ran a command, a player or the console
pub trait CommandSource: Send + Sync + 'static {
    fn name(&self) -> &str;
    /// Where the source currently stands, [`None`] for sources that aren't in a world
    fn location(&self) -> Option<Location>;
    /// May be called from the scheduler thread
    fn send_message(&self, message: &str);
}

/// A [`CommandSource`] that keeps every message it receives, and logs them
#[derive(Debug)]
pub struct ChatSource {
    name: String,
    location: Option<Location>,
    messages: Mutex<Vec<String>>,
}

impl ChatSource {
    pub fn player<S: Into<String>>(name: S, location: Location) -> Self {
        Self {
            name: name.into(),
            location: Some(location),
            messages: Mutex::new(vec![]),
        }
    }

    pub fn console() -> Self {
        Self {
            name: String::from("Console"),
            location: None,
            messages: Mutex::new(vec![]),
        }
    }

    /// Every message received so far, oldest first
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CommandSource for ChatSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> Option<Location> {
        self.location.clone()
    }

    fn send_message(&self, message: &str) {
        log::info!("[{}] {message}", self.name);
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

/// The acknowledgement a command hands back to whatever dispatched it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Success,
    Failure(String),
}

impl CommandResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandResult::Success)
    }
}

impl From<Error> for CommandResult {
    fn from(value: Error) -> Self {
        CommandResult::Failure(value.to_string())
    }
}

pub struct FillCommand<W: World, P: PositionSelection> {
    scheduler: SchedulerHandle,
    world: W,
    selection: P,
    fill: FillConfig,
    ttl: Duration,
}

impl<W: World, P: PositionSelection> FillCommand<W, P> {
    pub const ALIAS: &'static str = "fefill";

    pub fn new(
        scheduler: SchedulerHandle,
        world: W,
        selection: P,
        fill: FillConfig,
        ttl: Duration,
    ) -> Self {
        Self {
            scheduler,
            world,
            selection,
            fill,
            ttl,
        }
    }

    pub fn usage(&self) -> String {
        format!("/{} [block]", Self::ALIAS)
    }

    /// Nothing to suggest, block types belong to the host's registry
    pub fn suggestions(&self, _source: &dyn CommandSource, _arguments: &str) -> Vec<String> {
        vec![]
    }

    /// Runs the command, every failure is also sent to the source as a message
    pub fn process<S: CommandSource>(&self, source: &Arc<S>, arguments: &str) -> CommandResult {
        let arguments = arguments.trim();
        let result = if arguments.is_empty() {
            self.generate(source)
        } else {
            self.set_selected(source.as_ref(), arguments)
        };

        match result {
            Ok(()) => CommandResult::Success,
            Err(e) => {
                source.send_message(&e.to_string());
                e.into()
            }
        }
    }

    /// Queues the configured box at the source's location
    fn generate<S: CommandSource>(&self, source: &Arc<S>) -> Result<()> {
        let target = source
            .location()
            .ok_or_else(|| Error::NotAPlayer(source.name().to_string()))?;

        let (merging, notify) = (Arc::clone(source), Arc::clone(source));
        let request = EditRequest::new(self.fill.extent, target, fill::uniform(self.fill.block.clone()))
            .ttl(self.ttl)
            .on_commit(move |_| merging.send_message("Merging region"))
            .on_resolved(move |report| notify.send_message(&report.to_string()));

        // acknowledged before submitting, nothing the scheduler sends can overtake it
        source.send_message("Generating region");
        let id = self.scheduler.submit_request(request)?;
        log::debug!("{} queued edit {id}", source.name());
        Ok(())
    }

    /// Sets `block` at every selected position in the source's world, synchronously
    fn set_selected(&self, source: &dyn CommandSource, block: &str) -> Result<()> {
        let block = Block::try_new(block)?;
        let world = source
            .location()
            .ok_or_else(|| Error::NotAPlayer(source.name().to_string()))?
            .world;

        let positions = self.selection.positions(source.name());
        if positions.is_empty() {
            source.send_message("No positions selected");
            return Ok(());
        }

        let mut set = 0;
        let mut first_error = None;
        for position in &positions {
            match self
                .world
                .set_block(&Location::new(world.as_str(), *position), block.clone())
            {
                Ok(()) => set += 1,
                Err(e) => {
                    log::warn!("could not set {block} at {position:?}: {e}");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        source.send_message(&format!("Set {set} of {} block(s) to {block}", positions.len()));
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
