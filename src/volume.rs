//! `volume` contains [`VolumeBuffer`], a dense, paletted 3D grid of [`Block`]s
//! that lives entirely in memory and is independent of any world.

use crate::{Block, Coords, Error, Location, Result};
use ahash::AHashMap;
use fixedbitset::FixedBitSet;

/// A box of blocks addressed by local coordinates `0..extent` on every axis.
///
/// Blocks are stored as palette indexes, so a 25³ buffer filled with a single
/// block type costs one `u32` per cell plus one palette entry.
/// Every cell starts out as [`Block::air`].
#[derive(Debug, Clone)]
pub struct VolumeBuffer {
    /// Where local `(0, 0, 0)` sits relative to the buffer's own anchor.
    ///
    /// When applied at a target, local cell `c` lands at `target + c - origin`.
    origin: Coords,
    extent: Coords,

    /// Unique blocks in this buffer, index 0 is always air
    palette: Vec<Block>,
    /// Reverse lookup into `palette`
    palette_lookup: AHashMap<Block, u32>,
    /// One palette index per cell, x-fastest then z then y
    cells: Vec<u32>,
    /// Cells that have been explicitly [`set`](VolumeBuffer::set) at least once
    written: FixedBitSet,
}

impl VolumeBuffer {
    /// Upper bound on cells for any buffer, 256³
    pub const MAX_VOLUME: usize = 1 << 24;

    /// Creates an all-air buffer with the given extent and a zero origin.
    ///
    /// Fails with [`Error::InvalidExtent`] if any dimension is `<= 0`, or with
    /// [`Error::ExtentTooLarge`] above [`VolumeBuffer::MAX_VOLUME`] cells. Nothing is allocated then.
    ///
    /// ## Example
    /// ```no_run
    /// let buffer = VolumeBuffer::new((25, 25, 25))?;
    /// assert_eq!(buffer.volume(), 15625);
    /// ```
    pub fn new<C: Into<Coords>>(extent: C) -> Result<Self> {
        let extent = extent.into();
        let volume = Self::checked_volume(extent, Self::MAX_VOLUME)?;

        let air = Block::air();
        let mut palette_lookup = AHashMap::new();
        palette_lookup.insert(air.clone(), 0);

        Ok(Self {
            origin: Coords::ZERO,
            extent,
            palette: vec![air],
            palette_lookup,
            cells: vec![0; volume],
            written: FixedBitSet::with_capacity(volume),
        })
    }

    /// Cell count of `extent` if it's a valid extent of at most `max` cells
    pub fn checked_volume(extent: Coords, max: usize) -> Result<usize> {
        let volume = extent.volume().ok_or(Error::InvalidExtent(extent))?;
        if volume > max {
            return Err(Error::ExtentTooLarge { extent, max });
        }
        Ok(volume)
    }

    /// Same as [`VolumeBuffer::new`] but with a custom origin offset
    pub fn with_origin<C: Into<Coords>, O: Into<Coords>>(extent: C, origin: O) -> Result<Self> {
        let mut buffer = Self::new(extent)?;
        buffer.origin = origin.into();
        Ok(buffer)
    }

    pub fn extent(&self) -> Coords {
        self.extent
    }

    pub fn origin(&self) -> Coords {
        self.origin
    }

    /// Total amount of cells
    pub fn volume(&self) -> usize {
        self.cells.len()
    }

    /// Returns the block at the specified local coordinates.
    ///
    /// ## Example
    /// ```no_run
    /// let block = buffer.get((1, 0, 0))?;
    /// assert!(block.is_air());
    /// ```
    pub fn get<C: Into<Coords>>(&self, coords: C) -> Result<&Block> {
        let index = self.to_index(coords.into())?;
        // palette indexes are only ever pushed by `set`, so they always resolve
        Ok(&self.palette[self.cells[index] as usize])
    }

    /// Sets the block at the specified local coordinates.
    ///
    /// Fails with [`Error::OutOfBounds`] if the coordinates are outside of the extent,
    /// the buffer is left untouched in that case.
    pub fn set<C: Into<Coords>, B: Into<Block>>(&mut self, coords: C, block: B) -> Result<()> {
        let index = self.to_index(coords.into())?;
        let block = block.into();

        let palette_index = match self.palette_lookup.get(&block) {
            Some(i) => *i,
            None => {
                let i = self.palette.len() as u32;
                self.palette.push(block.clone());
                self.palette_lookup.insert(block, i);
                i
            }
        };

        self.cells[index] = palette_index;
        self.written.insert(index);
        Ok(())
    }

    /// Amount of cells that have been set at least once
    pub fn written_count(&self) -> usize {
        self.written.count_ones(..)
    }

    /// `true` once every single cell has been set at least once
    pub fn is_fully_written(&self) -> bool {
        self.written_count() == self.volume()
    }

    /// The unique blocks in this buffer, air is always first
    pub fn palette(&self) -> &[Block] {
        &self.palette
    }

    /// Iterates over every cell with it's local coordinates, x-fastest then z then y
    pub fn iter(&self) -> impl Iterator<Item = (Coords, &Block)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, p)| (self.to_coords(i), &self.palette[*p as usize]))
    }

    /// Where the given local cell ends up when this buffer is applied at `target`.
    ///
    /// Fails with [`Error::PositionOverflow`] if that position isn't representable.
    pub fn world_position(&self, target: &Location, local: Coords) -> Result<Location> {
        local
            .checked_sub(self.origin)
            .and_then(|offset| target.checked_offset(offset))
            .ok_or(Error::PositionOverflow {
                target: target.coords,
                local,
            })
    }

    /// Converts local coordinates to an index into `cells` & `written`
    #[inline(always)]
    fn to_index(&self, coords: Coords) -> Result<usize> {
        if !coords.within(self.extent) {
            return Err(Error::OutOfBounds {
                coords,
                extent: self.extent,
            });
        }

        let (w, d) = (self.extent.x as usize, self.extent.z as usize);
        Ok(coords.y as usize * w * d + coords.z as usize * w + coords.x as usize)
    }

    /// Converts an index back to it's local coordinates
    #[inline(always)]
    pub(crate) fn to_coords(&self, index: usize) -> Coords {
        let (w, d) = (self.extent.x as usize, self.extent.z as usize);
        let y = index / (w * d);
        let rem = index % (w * d);
        Coords::new((rem % w) as i32, y as i32, (rem / w) as i32)
    }
}
