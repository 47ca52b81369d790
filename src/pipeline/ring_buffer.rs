//! Elastic fixed-capacity ring buffer.
//!
//! This is the store that decouples the real-time render callback from the
//! asynchronous peer. It is a pure data structure - no I/O, no internal
//! locking. All access is serialized externally through the session's
//! single buffer mutex; see [`crate::pipeline`].

/// A fixed-capacity circular buffer with independent read/write cursors.
///
/// Cursors increase monotonically and index into storage modulo capacity,
/// which keeps "empty" and "full" unambiguous:
///
/// - occupancy = `write_index - read_index`, always in `0..=capacity`
/// - empty when the cursors are equal
/// - full when occupancy equals capacity
///
/// Every operation either completes fully or fails without mutating
/// state. Block operations copy across the wrap boundary as two
/// contiguous slice copies, never per-element modulo arithmetic - they
/// are called from a deadline-bound callback path.
#[derive(Debug)]
pub struct RingBuffer<T> {
    storage: Box<[T]>,
    read_index: u64,
    write_index: u64,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Creates a buffer with the given capacity.
    ///
    /// A zero-capacity buffer is valid: it is simultaneously empty and
    /// full, so every write fails and every read returns `None`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: vec![T::default(); capacity].into_boxed_slice(),
            read_index: 0,
            write_index: 0,
        }
    }

    /// Total number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Number of buffered, unread samples.
    #[must_use]
    pub fn len(&self) -> usize {
        (self.write_index - self.read_index) as usize
    }

    /// Number of free slots.
    #[must_use]
    pub fn available(&self) -> usize {
        self.capacity() - self.len()
    }

    /// Returns `true` if there is nothing to read.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.write_index == self.read_index
    }

    /// Returns `true` if there is no room to write.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Writes a single sample.
    ///
    /// Fails without mutating state when the buffer is full; the producer
    /// decides whether to drop or back off.
    pub fn write(&mut self, value: T) -> bool {
        if self.is_full() {
            return false;
        }
        let capacity = self.storage.len() as u64;
        self.storage[(self.write_index % capacity) as usize] = value;
        self.write_index += 1;
        true
    }

    /// Writes a whole block, all-or-nothing.
    ///
    /// Succeeds only when the free space covers the entire block; on
    /// failure nothing is written and the cursors are untouched.
    pub fn write_block(&mut self, block: &[T]) -> bool {
        if block.len() > self.available() {
            return false;
        }
        if block.is_empty() {
            return true;
        }

        let capacity = self.storage.len();
        let start = (self.write_index % capacity as u64) as usize;
        let tail_space = capacity - start;

        if block.len() <= tail_space {
            self.storage[start..start + block.len()].copy_from_slice(block);
        } else {
            self.storage[start..].copy_from_slice(&block[..tail_space]);
            self.storage[..block.len() - tail_space].copy_from_slice(&block[tail_space..]);
        }

        self.write_index += block.len() as u64;
        true
    }

    /// Reads and consumes the oldest sample, or `None` when empty.
    pub fn read(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let capacity = self.storage.len() as u64;
        let value = self.storage[(self.read_index % capacity) as usize];
        self.read_index += 1;
        Some(value)
    }

    /// Reads `count` samples in FIFO order, all-or-nothing.
    ///
    /// Returns `None` without mutating state when fewer than `count`
    /// samples are buffered.
    pub fn read_block(&mut self, count: usize) -> Option<Vec<T>> {
        if count > self.len() {
            return None;
        }
        let mut out = Vec::with_capacity(count);
        if count == 0 {
            return Some(out);
        }

        let capacity = self.storage.len();
        let start = (self.read_index % capacity as u64) as usize;
        let tail = capacity - start;

        if count <= tail {
            out.extend_from_slice(&self.storage[start..start + count]);
        } else {
            out.extend_from_slice(&self.storage[start..]);
            out.extend_from_slice(&self.storage[..count - tail]);
        }

        self.read_index += count as u64;
        Some(out)
    }

    /// Discards all buffered content.
    ///
    /// Resets both cursors to zero; the storage itself is not zeroed,
    /// only the logical occupancy.
    pub fn clear(&mut self) {
        self.read_index = 0;
        self.write_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_full_flags() {
        let mut buf = RingBuffer::<f64>::new(2);
        assert!(buf.is_empty());
        assert!(!buf.is_full());

        assert!(buf.write(1.0));
        assert!(buf.write(2.0));
        assert!(buf.is_full());
        assert!(!buf.is_empty());
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.available(), 0);
    }

    #[test]
    fn test_write_on_full_leaves_state_unchanged() {
        let mut buf = RingBuffer::<f64>::new(2);
        assert!(buf.write(1.0));
        assert!(buf.write(2.0));

        assert!(!buf.write(3.0));
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.read(), Some(1.0));
        assert_eq!(buf.read(), Some(2.0));
        assert_eq!(buf.read(), None);
    }

    #[test]
    fn test_write_block_atomicity() {
        let mut buf = RingBuffer::<f64>::new(4);
        assert!(buf.write_block(&[1.0, 2.0, 3.0]));

        // One free slot; a two-sample block must be rejected wholesale
        assert!(!buf.write_block(&[4.0, 5.0]));
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.read_block(3), Some(vec![1.0, 2.0, 3.0]));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_wrap_around_round_trip() {
        // capacity 8: write 6, read 4, write 6 - the second block spans the wrap
        let mut buf = RingBuffer::<f64>::new(8);
        assert!(buf.write_block(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        assert_eq!(buf.read_block(4), Some(vec![1.0, 2.0, 3.0, 4.0]));
        assert!(buf.write_block(&[7.0, 8.0, 9.0, 10.0, 11.0, 12.0]));

        assert_eq!(buf.len(), 8);
        assert!(buf.is_full());
        assert_eq!(
            buf.read_block(8),
            Some(vec![5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0])
        );
    }

    #[test]
    fn test_read_block_all_or_nothing() {
        let mut buf = RingBuffer::<f64>::new(4);
        assert!(buf.write_block(&[1.0, 2.0]));

        assert_eq!(buf.read_block(3), None);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.read_block(2), Some(vec![1.0, 2.0]));
    }

    #[test]
    fn test_clear_discards_content() {
        let mut buf = RingBuffer::<f64>::new(4);
        assert!(buf.write_block(&[1.0, 2.0, 3.0]));

        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.read(), None);
        assert_eq!(buf.read_block(1), None);

        // Buffer is fully usable after clear
        assert!(buf.write_block(&[9.0, 8.0, 7.0, 6.0]));
        assert_eq!(buf.read_block(4), Some(vec![9.0, 8.0, 7.0, 6.0]));
    }

    #[test]
    fn test_zero_capacity() {
        let mut buf = RingBuffer::<f64>::new(0);
        assert!(buf.is_empty());
        assert!(buf.is_full());
        assert!(!buf.write(1.0));
        assert_eq!(buf.read(), None);
        assert!(buf.write_block(&[]));
        assert!(!buf.write_block(&[1.0]));
    }

    #[test]
    fn test_occupancy_invariant_over_interleavings() {
        let mut buf = RingBuffer::<u32>::new(7);
        let mut next = 0u32;
        let mut expected = 0u32;

        // Deterministic interleaving of block writes and mixed reads that
        // repeatedly crosses the wrap boundary.
        for round in 0..100 {
            let block: Vec<u32> = (0..(round % 5) as u32).map(|i| next + i).collect();
            if buf.write_block(&block) {
                next += block.len() as u32;
            }
            assert!(buf.len() <= buf.capacity());

            for _ in 0..(round % 3) {
                if let Some(value) = buf.read() {
                    assert_eq!(value, expected);
                    expected += 1;
                }
            }
            assert!(buf.len() <= buf.capacity());
        }

        // Drain and verify FIFO order held throughout
        while let Some(value) = buf.read() {
            assert_eq!(value, expected);
            expected += 1;
        }
        assert_eq!(expected, next);
    }
}
