use thiserror::Error;

use crate::types::SimTick;

/// Errors that can occur during [`TickSequenceList`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    /// Attempted to insert an item for a tick already present in the list.
    #[error("duplicate simulation tick {tick} not allowed in TickSequenceList")]
    DuplicateTick { tick: SimTick },
}

/// A tick-ordered list of items, inserted by scanning from the back since
/// arrivals are usually near-in-order. Backing store for reorder buffers.
pub struct TickSequenceList<T> {
    list: Vec<(SimTick, T)>,
}

impl<T> TickSequenceList<T> {
    pub fn new() -> Self {
        Self { list: Vec::new() }
    }

    pub fn front(&self) -> Option<&(SimTick, T)> {
        self.list.first()
    }

    pub fn pop_front(&mut self) -> Option<(SimTick, T)> {
        if self.list.is_empty() {
            return None;
        }
        Some(self.list.remove(0))
    }

    pub fn contains(&self, tick: SimTick) -> bool {
        self.list.iter().rev().any(|(existing, _)| *existing == tick)
    }

    /// Inserts an item at its tick-ordered position, scanning from the back.
    /// Returns an error if the tick already exists.
    pub fn try_insert(&mut self, tick: SimTick, item: T) -> Result<(), SequenceError> {
        let mut index = self.list.len();

        loop {
            if index == 0 {
                // made it all the way through, insert at the front
                self.list.insert(0, (tick, item));
                return Ok(());
            }

            index -= 1;

            let (existing, _) = &self.list[index];
            if *existing == tick {
                return Err(SequenceError::DuplicateTick { tick });
            }
            if *existing < tick {
                self.list.insert(index + 1, (tick, item));
                return Ok(());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

impl<T> Default for TickSequenceList<T> {
    fn default() -> Self {
        Self::new()
    }
}
