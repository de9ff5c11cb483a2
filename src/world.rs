//! `world` contains the [`World`] trait the command path writes through, and
//! [`MemoryWorld`], an in-memory stand-in for the host's voxel storage.

use crate::{
    Block, Coords, Error, Location, Result, VolumeBuffer, config::DEFAULT_WORLD_HEIGHT,
    sink::CommitSink,
};
use ahash::AHashMap;
use std::{
    ops::RangeInclusive,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// Direct, synchronous block access to a live world
pub trait World {
    fn set_block(&self, location: &Location, block: Block) -> Result<()>;
    fn get_block(&self, location: &Location) -> Result<Block>;
}

/// A set of named worlds kept entirely in memory.
///
/// Cloning is cheap and every clone sees the same worlds, so one clone can be
/// handed to the scheduler as it's [`CommitSink`] while another serves commands.
///
/// Positions that were never set read as [`Block::air`].
#[derive(Debug, Clone, Default)]
pub struct MemoryWorld {
    inner: Arc<Mutex<AHashMap<String, WorldData>>>,
}

#[derive(Debug)]
struct WorldData {
    /// Only non-air blocks are stored
    blocks: AHashMap<Coords, Block>,
    height: RangeInclusive<i32>,
}

impl WorldData {
    fn check_height(&self, y: i32) -> Result<()> {
        if self.height.contains(&y) {
            Ok(())
        } else {
            Err(Error::OutsideBuildHeight {
                y,
                min: *self.height.start(),
                max: *self.height.end(),
            })
        }
    }

    fn put(&mut self, coords: Coords, block: Block) {
        if block.is_air() {
            self.blocks.remove(&coords);
        } else {
            self.blocks.insert(coords, block);
        }
    }
}

impl MemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads an empty world with the vanilla build height.
    ///
    /// Returns `false` if a world with that name was already loaded, it's kept as is then.
    pub fn load_world<S: Into<String>>(&self, name: S) -> bool {
        self.load_world_with_height(name, DEFAULT_WORLD_HEIGHT)
    }

    pub fn load_world_with_height<S: Into<String>>(
        &self,
        name: S,
        height: RangeInclusive<i32>,
    ) -> bool {
        let name = name.into();
        let mut worlds = self.lock();
        if worlds.contains_key(&name) {
            return false;
        }

        log::info!("Loading world \"{name}\"");
        worlds.insert(
            name,
            WorldData {
                blocks: AHashMap::new(),
                height,
            },
        );
        true
    }

    /// Unloads a world and drops all of it's blocks, returns `false` if it wasn't loaded
    pub fn unload_world(&self, name: &str) -> bool {
        let removed = self.lock().remove(name).is_some();
        if removed {
            log::info!("Unloading world \"{name}\"");
        }
        removed
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    /// Amount of non-air blocks in a world
    pub fn block_count(&self, name: &str) -> Result<usize> {
        self.lock()
            .get(name)
            .map(|w| w.blocks.len())
            .ok_or_else(|| Error::UnknownWorld(name.to_string()))
    }

    // a panic while holding the lock can't leave the map half written,
    // every write path validates before touching it
    fn lock(&self) -> MutexGuard<'_, AHashMap<String, WorldData>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl World for MemoryWorld {
    fn set_block(&self, location: &Location, block: Block) -> Result<()> {
        let mut worlds = self.lock();
        let world = worlds
            .get_mut(&location.world)
            .ok_or_else(|| Error::UnknownWorld(location.world.clone()))?;

        world.check_height(location.coords.y)?;
        world.put(location.coords, block);
        Ok(())
    }

    fn get_block(&self, location: &Location) -> Result<Block> {
        let worlds = self.lock();
        let world = worlds
            .get(&location.world)
            .ok_or_else(|| Error::UnknownWorld(location.world.clone()))?;

        Ok(world
            .blocks
            .get(&location.coords)
            .cloned()
            .unwrap_or_default())
    }
}

impl CommitSink for MemoryWorld {
    /// Writes every cell of `buffer` (air included) or nothing at all.
    fn apply(&mut self, buffer: &VolumeBuffer, target: &Location) -> Result<()> {
        let commit_failure = |e: Error| Error::CommitFailure(e.to_string());

        let mut worlds = self.lock();
        let world = worlds
            .get_mut(&target.world)
            .ok_or_else(|| commit_failure(Error::UnknownWorld(target.world.clone())))?;

        // the buffer is a box, cells between its two corners are valid once both corners are
        let extent = buffer.extent();
        for corner in [Coords::ZERO, extent - Coords::new(1, 1, 1)] {
            let position = buffer
                .world_position(target, corner)
                .map_err(commit_failure)?;
            world.check_height(position.coords.y).map_err(commit_failure)?;
        }

        for (local, block) in buffer.iter() {
            let position = buffer.world_position(target, local)?;
            world.put(position.coords, block.clone());
        }
        Ok(())
    }
}
