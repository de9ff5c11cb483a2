use std::ops::{Add, Sub};

/// Coordinates (x, y, z)
///
/// Used both for world positions and for cell positions local to a
/// [`VolumeBuffer`](crate::VolumeBuffer), as well as for buffer extents.
/// Implements a few traits for nice conversion between the tuple variant and this.
#[allow(missing_docs)] // its literally just xyz
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Coords {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl std::fmt::Debug for Coords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}, {}", self.x, self.y, self.z)
    }
}

impl From<(i32, i32, i32)> for Coords {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

impl From<Coords> for (i32, i32, i32) {
    fn from(value: Coords) -> Self {
        (value.x, value.y, value.z)
    }
}

impl PartialEq<(i32, i32, i32)> for Coords {
    fn eq(&self, other: &(i32, i32, i32)) -> bool {
        &self.as_tuple() == other
    }
}

impl Add for Coords {
    type Output = Coords;

    fn add(self, rhs: Self) -> Self::Output {
        Coords::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Coords {
    type Output = Coords;

    fn sub(self, rhs: Self) -> Self::Output {
        Coords::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Coords {
    pub const ZERO: Coords = Coords::new(0, 0, 0);

    /// Wraps xyz into a [`Coords`] struct.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns the coordinates as `(i32, i32, i32)`
    pub fn as_tuple(&self) -> (i32, i32, i32) {
        (*self).into()
    }

    /// `true` if every component is strictly positive, which is what an extent needs to be
    pub fn is_positive(&self) -> bool {
        self.x > 0 && self.y > 0 && self.z > 0
    }

    /// Checks `0 <= self < extent` componentwise
    #[inline(always)]
    pub fn within(&self, extent: Coords) -> bool {
        (0..extent.x).contains(&self.x)
            && (0..extent.y).contains(&self.y)
            && (0..extent.z).contains(&self.z)
    }

    /// Componentwise `self + rhs`, [`None`] if any component overflows
    pub fn checked_add(&self, rhs: Coords) -> Option<Coords> {
        Some(Coords::new(
            self.x.checked_add(rhs.x)?,
            self.y.checked_add(rhs.y)?,
            self.z.checked_add(rhs.z)?,
        ))
    }

    /// Componentwise `self - rhs`, [`None`] if any component overflows
    pub fn checked_sub(&self, rhs: Coords) -> Option<Coords> {
        Some(Coords::new(
            self.x.checked_sub(rhs.x)?,
            self.y.checked_sub(rhs.y)?,
            self.z.checked_sub(rhs.z)?,
        ))
    }

    /// The product of all components as a cell count, [`None`] on overflow or if not positive
    pub fn volume(&self) -> Option<usize> {
        if !self.is_positive() {
            return None;
        }
        (self.x as usize)
            .checked_mul(self.y as usize)?
            .checked_mul(self.z as usize)
    }
}

/// A position in a specific world.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    /// Name of the world, as the host knows it
    pub world: String,
    pub coords: Coords,
}

impl Location {
    pub fn new<W: Into<String>, C: Into<Coords>>(world: W, coords: C) -> Self {
        Self {
            world: world.into(),
            coords: coords.into(),
        }
    }

    /// Returns a new [`Location`] in the same world moved by `offset`,
    /// [`None`] if that would leave the `i32` coordinate space
    pub fn checked_offset(&self, offset: Coords) -> Option<Self> {
        Some(Self {
            world: self.world.clone(),
            coords: self.coords.checked_add(offset)?,
        })
    }
}
