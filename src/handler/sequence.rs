//! Sequence number pool.
//!
//! Each correlated call borrows one number from `1..=255` and returns it
//! when the call completes, whatever the outcome. A live number identifies
//! exactly one outstanding call, which is what makes
//! `(device_id, command_id, seq)` usable as a correlation key. Zero is
//! never in the pool; it marks messages not tied to any call.

use crate::error::{Result, RovercomError};

const MIN_SEQ: u8 = 1;
const MAX_SEQ: u8 = 255;

/// Free-list of sequence numbers.
pub struct SequencePool {
    free: Vec<u8>,
}

impl SequencePool {
    /// Create a full pool of 255 numbers.
    pub fn new() -> Self {
        Self {
            free: (MIN_SEQ..=MAX_SEQ).collect(),
        }
    }

    /// Borrow the next free number; recently released numbers go out first.
    ///
    /// Fails with [`RovercomError::SequencesExhausted`] when all 255 numbers
    /// are tied up in outstanding calls.
    pub fn allocate(&mut self) -> Result<u8> {
        self.free.pop().ok_or(RovercomError::SequencesExhausted)
    }

    /// Return a previously allocated number to the pool.
    pub fn release(&mut self, seq: u8) {
        debug_assert!(
            !self.free.contains(&seq),
            "sequence {} released twice",
            seq
        );
        self.free.push(seq);
    }

    /// Numbers currently free.
    #[inline]
    pub fn available(&self) -> usize {
        self.free.len()
    }
}

impl Default for SequencePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_new_pool_is_full() {
        let pool = SequencePool::new();
        assert_eq!(pool.available(), 255);
    }

    #[test]
    fn test_allocations_unique_until_exhausted() {
        let mut pool = SequencePool::new();
        let mut seen = HashSet::new();

        for _ in 0..255 {
            let seq = pool.allocate().unwrap();
            assert!((1..=255).contains(&seq));
            assert!(seen.insert(seq), "sequence {} handed out twice", seq);
        }

        assert_eq!(pool.available(), 0);
        let err = pool.allocate().unwrap_err();
        assert!(matches!(err, RovercomError::SequencesExhausted));
    }

    #[test]
    fn test_release_makes_number_available_again() {
        let mut pool = SequencePool::new();
        let seq = pool.allocate().unwrap();
        assert_eq!(pool.available(), 254);

        pool.release(seq);
        assert_eq!(pool.available(), 255);
    }

    #[test]
    fn test_exhausted_pool_recovers_after_release() {
        let mut pool = SequencePool::new();
        let all: Vec<u8> = (0..255).map(|_| pool.allocate().unwrap()).collect();
        assert!(pool.allocate().is_err());

        pool.release(all[0]);
        assert_eq!(pool.allocate().unwrap(), all[0]);
    }

    #[test]
    fn test_zero_is_never_allocated() {
        let mut pool = SequencePool::new();
        for _ in 0..255 {
            assert_ne!(pool.allocate().unwrap(), 0);
        }
    }
}
