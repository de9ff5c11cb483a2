//! `selection` is where the direct `fefill <block>` path gets it's positions from.

use crate::Coords;
use ahash::AHashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Positions a command source has previously selected, in the order they were picked.
pub trait PositionSelection {
    fn positions(&self, source: &str) -> Vec<Coords>;
}

/// An in-memory [`PositionSelection`], keyed by command source name.
///
/// Clones share the same selections.
#[derive(Debug, Clone, Default)]
pub struct SelectionStore {
    selections: Arc<Mutex<AHashMap<String, Vec<Coords>>>>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a position to the source's selection
    pub fn select<S: Into<String>, C: Into<Coords>>(&self, source: S, position: C) {
        self.selections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(source.into())
            .or_default()
            .push(position.into());
    }

    /// Forgets everything the source has selected
    pub fn clear(&self, source: &str) {
        self.selections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(source);
    }
}

impl PositionSelection for SelectionStore {
    fn positions(&self, source: &str) -> Vec<Coords> {
        self.selections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(source)
            .cloned()
            .unwrap_or_default()
    }
}
