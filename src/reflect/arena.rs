//=====================================================
// File: reflect/arena.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Append-only storage for reflection metadata
// Objective: Hand out stable, copyable handles for types, methods and fields
//=====================================================

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Index;

/// Handle returned by [`Arena::allocate`].
///
/// Handles are plain indices; they never dangle because arenas only grow.
pub struct ArenaHandle<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ArenaHandle<T> {
    fn new(index: usize) -> Self {
        Self {
            index: index as u32,
            _marker: PhantomData,
        }
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn raw(&self) -> u32 {
        self.index
    }
}

impl<T> Clone for ArenaHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ArenaHandle<T> {}

impl<T> PartialEq for ArenaHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for ArenaHandle<T> {}

impl<T> PartialOrd for ArenaHandle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for ArenaHandle<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

impl<T> Hash for ArenaHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for ArenaHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// Grow-only arena. Entries are never removed, so a handle stays valid for
/// the lifetime of the arena that produced it.
#[derive(Debug)]
pub struct Arena<T> {
    entries: Vec<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn allocate(&mut self, value: T) -> ArenaHandle<T> {
        let handle = ArenaHandle::new(self.entries.len());
        self.entries.push(value);
        handle
    }

    pub fn get(&self, handle: ArenaHandle<T>) -> Option<&T> {
        self.entries.get(handle.index())
    }

    pub fn get_mut(&mut self, handle: ArenaHandle<T>) -> Option<&mut T> {
        self.entries.get_mut(handle.index())
    }

    pub fn handles(&self) -> impl Iterator<Item = ArenaHandle<T>> + '_ {
        (0..self.entries.len()).map(ArenaHandle::new)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Index<ArenaHandle<T>> for Arena<T> {
    type Output = T;

    fn index(&self, handle: ArenaHandle<T>) -> &T {
        &self.entries[handle.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_stable_and_ordered() {
        let mut arena = Arena::new();
        let first = arena.allocate("Player");
        let second = arena.allocate("Inventory");
        assert_eq!(arena.get(first), Some(&"Player"));
        assert_eq!(arena.get(second), Some(&"Inventory"));
        assert!(first < second);
        assert_eq!(arena.handles().collect::<Vec<_>>(), vec![first, second]);
    }

    #[test]
    fn handles_are_copy_for_non_copy_payloads() {
        let mut arena: Arena<String> = Arena::new();
        let handle = arena.allocate("Update".to_string());
        let copy = handle;
        assert_eq!(handle, copy);
        if let Some(name) = arena.get_mut(copy) {
            name.push_str("Late");
        }
        assert_eq!(arena.get(handle).map(String::as_str), Some("UpdateLate"));
    }
}

//=====================================================
// End of file
//=====================================================
