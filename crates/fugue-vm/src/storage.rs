//! Persistent contract storage
//!
//! An open-addressed hash table from 256-bit keys to 256-bit values, using
//! quadratic probing. Slots are implicitly zero-initialized forever: reading
//! an absent key yields zero rather than an error, and writing zero is the
//! idiomatic "clear" (there is no deletion).

use fugue_primitives::U256;
use thiserror::Error;

/// Starting slot count
const INITIAL_CAPACITY: usize = 16;

/// Capacity multiplier applied per resize
const GROWTH_FACTOR: usize = 2;

/// Storage contract violations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Strict insertion against a key that is already present
    #[error("storage key {0} already occupied")]
    DuplicateKey(U256),
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    key: U256,
    value: U256,
}

/// Persistent key/value storage for one contract
#[derive(Clone, Debug)]
pub struct Storage {
    slots: Vec<Option<Entry>>,
    occupied: usize,
}

impl Storage {
    /// Create empty storage at the initial capacity
    pub fn new() -> Self {
        Self {
            slots: vec![None; INITIAL_CAPACITY],
            occupied: 0,
        }
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.occupied
    }

    /// Check if no slot has ever been written
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Current slot count
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Read the value for `key`; absent keys read as zero
    pub fn get(&self, key: &U256) -> U256 {
        match Self::locate(&self.slots, key) {
            Some(index) => self.slots[index].as_ref().map(|e| e.value).unwrap_or(U256::ZERO),
            None => U256::ZERO,
        }
    }

    /// Check whether `key` has an entry
    pub fn contains(&self, key: &U256) -> bool {
        Self::locate(&self.slots, key).is_some()
    }

    /// Insert a new entry; a duplicate key is a contract violation
    pub fn insert(&mut self, key: U256, value: U256) -> Result<(), StorageError> {
        if Self::locate(&self.slots, &key).is_some() {
            return Err(StorageError::DuplicateKey(key));
        }
        self.place(Entry { key, value });
        Ok(())
    }

    /// Write `value` under `key`, replacing any existing entry in place
    pub fn store(&mut self, key: U256, value: U256) {
        match Self::locate(&self.slots, &key) {
            Some(index) => {
                if let Some(entry) = self.slots[index].as_mut() {
                    entry.value = value;
                }
            }
            None => self.place(Entry { key, value }),
        }
    }

    /// Iterate over the live entries in slot order
    pub fn entries(&self) -> impl Iterator<Item = (U256, U256)> + '_ {
        self.slots.iter().flatten().map(|e| (e.key, e.value))
    }

    /// Deep copy for the call-revert protocol
    pub fn snapshot(&self) -> Storage {
        self.clone()
    }

    /// Replace the live table with a snapshot; the old table is dropped
    pub fn restore(&mut self, snapshot: Storage) {
        *self = snapshot;
    }

    fn place(&mut self, entry: Entry) {
        loop {
            if let Some(index) = Self::vacancy(&self.slots, &entry.key) {
                self.slots[index] = Some(entry);
                self.occupied += 1;
                // Keep the load factor below one half
                if self.occupied * 2 >= self.slots.len() {
                    self.grow();
                }
                return;
            }
            // Quadratic probing on a non-prime table can exhaust its probe
            // sequence before visiting every slot
            self.grow();
        }
    }

    fn grow(&mut self) {
        let mut capacity = self.slots.len() * GROWTH_FACTOR;
        loop {
            if let Some(slots) = Self::rebuild(&self.slots, capacity) {
                self.slots = slots;
                return;
            }
            capacity *= GROWTH_FACTOR;
        }
    }

    // Rehash every entry into probe positions for the new capacity; probe
    // positions from the old capacity would be unreachable after the move
    fn rebuild(old: &[Option<Entry>], capacity: usize) -> Option<Vec<Option<Entry>>> {
        let mut slots = vec![None; capacity];
        for entry in old.iter().flatten() {
            let index = Self::vacancy(&slots, &entry.key)?;
            slots[index] = Some(*entry);
        }
        Some(slots)
    }

    // Probe for the slot holding `key`; stops at the first never-written slot
    fn locate(slots: &[Option<Entry>], key: &U256) -> Option<usize> {
        let capacity = slots.len();
        let base = Self::bucket(key, capacity);
        for k in 0..capacity {
            let index = (base + k * k) % capacity;
            match &slots[index] {
                None => return None,
                Some(entry) if entry.key == *key => return Some(index),
                Some(_) => {}
            }
        }
        None
    }

    // Probe for the first empty slot along `key`'s sequence
    fn vacancy(slots: &[Option<Entry>], key: &U256) -> Option<usize> {
        let capacity = slots.len();
        let base = Self::bucket(key, capacity);
        (0..capacity)
            .map(|k| (base + k * k) % capacity)
            .find(|&index| slots[index].is_none())
    }

    fn bucket(key: &U256, capacity: usize) -> usize {
        (Self::hash(key) % capacity as u64) as usize
    }

    // Pair the four limbs through the Cantor pairing function, pairwise,
    // then pair the two results
    fn hash(key: &U256) -> u64 {
        let [a, b, c, d] = key.limbs();
        Self::cantor(Self::cantor(a, b), Self::cantor(c, d))
    }

    fn cantor(a: u64, b: u64) -> u64 {
        let sum = a.wrapping_add(b);
        (sum / 2).wrapping_mul(sum.wrapping_add(1))
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}
