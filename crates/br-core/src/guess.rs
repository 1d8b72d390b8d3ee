//! Best-known values arbitrated by certainty.

use serde::{Deserialize, Serialize};

/// A value together with how sure we are about it.
///
/// Several clues in a dump can point at the same fact (the dump kind, the
/// Android version, a process name). Each clue proposes a value with a
/// certainty; the value only changes when a strictly more certain clue
/// arrives, so certainty never decreases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessedValue<T> {
    value: T,
    certainty: u32,
}

impl<T> GuessedValue<T> {
    /// Creates a guess with an explicit certainty.
    pub const fn new(value: T, certainty: u32) -> Self {
        Self { value, certainty }
    }

    /// Picks the winner between the incumbent and a candidate.
    ///
    /// Ties keep the incumbent.
    pub fn merge(current: Self, candidate: Self) -> Self {
        if candidate.certainty > current.certainty {
            candidate
        } else {
            current
        }
    }

    /// Proposes a new value. Returns `true` if it replaced the incumbent.
    pub fn set(&mut self, value: T, certainty: u32) -> bool {
        if certainty > self.certainty {
            self.value = value;
            self.certainty = certainty;
            true
        } else {
            false
        }
    }

    pub const fn value(&self) -> &T {
        &self.value
    }

    pub const fn certainty(&self) -> u32 {
        self.certainty
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

impl<T: Default> Default for GuessedValue<T> {
    fn default() -> Self {
        Self::new(T::default(), 0)
    }
}
