//! Scratch memory
//!
//! A byte buffer that is logically infinite and zero-filled, physically
//! backed by a capacity that doubles on demand. Capacity only grows within
//! one call's lifetime; every address ever read or written lies within it.

use fugue_primitives::U256;

/// Starting capacity in bytes
const INITIAL_CAPACITY: usize = 1024;

/// Capacity multiplier applied per growth step
const GROWTH_FACTOR: usize = 2;

/// Growable, zero-initialized scratch memory
#[derive(Clone, Debug)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Create memory at the initial capacity, zero-filled
    pub fn new() -> Self {
        Self {
            data: vec![0; INITIAL_CAPACITY],
        }
    }

    /// Current capacity in bytes
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Grow until `offset + len` fits, doubling per step.
    ///
    /// One doubling is not enough for an arbitrarily large extent, so the
    /// doubling loops. New bytes are zero.
    pub fn ensure(&mut self, offset: usize, len: usize) {
        let required = offset.saturating_add(len);
        let mut capacity = self.data.len();
        if required <= capacity {
            return;
        }
        while capacity < required {
            capacity *= GROWTH_FACTOR;
        }
        self.data.resize(capacity, 0);
    }

    /// Read `len` bytes starting at `offset`, growing first so the whole
    /// range lies within capacity
    pub fn read(&mut self, offset: usize, len: usize) -> &[u8] {
        self.ensure(offset, len);
        &self.data[offset..offset + len]
    }

    /// Write bytes starting at `offset`, growing as needed
    pub fn write(&mut self, offset: usize, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.ensure(offset, bytes.len());
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Write a single byte at `offset`
    pub fn write_byte(&mut self, offset: usize, byte: u8) {
        self.ensure(offset, 1);
        self.data[offset] = byte;
    }

    /// Load the 32-byte big-endian word at `offset`
    pub fn load_word(&mut self, offset: usize) -> U256 {
        self.ensure(offset, 32);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&self.data[offset..offset + 32]);
        U256::from_be_bytes(bytes)
    }

    /// Store a 32-byte big-endian word at `offset`
    pub fn store_word(&mut self, offset: usize, value: U256) {
        self.write(offset, &value.to_be_bytes());
    }

    /// Deep copy for the call-revert protocol
    pub fn snapshot(&self) -> Memory {
        self.clone()
    }

    /// Replace the live buffer with a snapshot; the old buffer is dropped
    pub fn restore(&mut self, snapshot: Memory) {
        *self = snapshot;
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_capacity() {
        let mem = Memory::new();
        assert_eq!(mem.capacity(), INITIAL_CAPACITY);
    }

    #[test]
    fn test_ensure_doubles() {
        let mut mem = Memory::new();
        mem.ensure(0, INITIAL_CAPACITY + 1);
        assert_eq!(mem.capacity(), INITIAL_CAPACITY * 2);
    }

    #[test]
    fn test_ensure_loops_for_large_extent() {
        let mut mem = Memory::new();
        // A single doubling cannot cover this; the loop must keep going
        mem.ensure(0, INITIAL_CAPACITY * 9);
        assert_eq!(mem.capacity(), INITIAL_CAPACITY * 16);
    }

    #[test]
    fn test_capacity_never_shrinks() {
        let mut mem = Memory::new();
        mem.ensure(0, 5000);
        let grown = mem.capacity();
        mem.ensure(0, 10);
        assert_eq!(mem.capacity(), grown);
    }

    #[test]
    fn test_new_bytes_are_zero() {
        let mut mem = Memory::new();
        assert!(mem.read(0, INITIAL_CAPACITY).iter().all(|&b| b == 0));
        mem.ensure(0, INITIAL_CAPACITY * 4);
        assert!(mem
            .read(INITIAL_CAPACITY, INITIAL_CAPACITY * 3)
            .iter()
            .all(|&b| b == 0));
    }

    #[test]
    fn test_write_read() {
        let mut mem = Memory::new();
        mem.write(10, &[1, 2, 3, 4, 5]);
        assert_eq!(mem.read(10, 5), &[1, 2, 3, 4, 5]);
        // Surrounding bytes untouched
        assert_eq!(mem.read(9, 1), &[0]);
        assert_eq!(mem.read(15, 1), &[0]);
    }

    #[test]
    fn test_write_grows() {
        let mut mem = Memory::new();
        mem.write(INITIAL_CAPACITY * 2, &[0xAA]);
        assert!(mem.capacity() > INITIAL_CAPACITY * 2);
        assert_eq!(mem.read(INITIAL_CAPACITY * 2, 1), &[0xAA]);
    }

    #[test]
    fn test_read_grows() {
        let mut mem = Memory::new();
        let bytes = mem.read(INITIAL_CAPACITY * 3, 4).to_vec();
        assert_eq!(bytes, vec![0; 4]);
        assert!(mem.capacity() >= INITIAL_CAPACITY * 3 + 4);
    }

    #[test]
    fn test_word_round_trip() {
        let mut mem = Memory::new();
        let value = U256::from_u64(0xDEAD_BEEF);
        mem.store_word(64, value);
        assert_eq!(mem.load_word(64), value);
        // Big-endian layout: the low byte lands at offset 64 + 31
        assert_eq!(mem.read(64 + 31, 1), &[0xEF]);
    }

    #[test]
    fn test_write_byte() {
        let mut mem = Memory::new();
        mem.write_byte(0, 0x66);
        assert_eq!(mem.read(0, 1), &[0x66]);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut mem = Memory::new();
        mem.write(0, &[1, 2, 3]);
        let snapshot = mem.snapshot();
        mem.write(0, &[9, 9, 9]);
        mem.write(5000, &[7]);
        mem.restore(snapshot);
        assert_eq!(mem.read(0, 3), &[1, 2, 3]);
        assert_eq!(mem.capacity(), INITIAL_CAPACITY);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut mem = Memory::new();
        mem.write(0, &[5]);
        let snapshot = mem.snapshot();
        mem.write(0, &[6]);
        assert_eq!(mem.read(0, 1), &[6]);
        mem.restore(snapshot);
        assert_eq!(mem.read(0, 1), &[5]);
    }
}
