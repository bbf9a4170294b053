use log::trace;

use super::VertexValues;

const MIN_CAPACITY: usize = 16;
const HASH_MULTIPLIER: usize = 1664525;

/// Dense id of a lattice vertex. Ids are handed out in insertion order starting at 0 and stay valid for the
/// lifetime of the [`VertexHashTable`] that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexId(usize);

impl VertexId {
    pub fn index(self) -> usize {
        self.0
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }
}

fn hash_key(key: &[i32]) -> usize {
    key.iter().fold(0usize, |h, &k| {
        h.wrapping_add(k as usize).wrapping_mul(HASH_MULTIPLIER)
    })
}

/// Open-addressing hash table from integer lattice keys to dense [`VertexId`]s, with one accumulator row
/// per vertex
///
/// Collisions are resolved by linear probing. The slot table doubles whenever an insertion would push the
/// load factor above one half. Growing only rebuilds the slots, keys and value rows are stored by id and
/// never move.
///
/// ```
/// # use permutohedral_core::lattice::*;
/// let mut table = VertexHashTable::new(3, 1);
/// let id = table.insert(&[1, -2, 1]);
/// assert_eq!(Some(id), table.lookup(&[1, -2, 1]));
/// assert_eq!(None, table.lookup(&[0, 0, 0]));
/// table.values_mut().row_mut(id.index())[0] += 2.0;
/// assert_eq!(&[2.0], table.values().row(id.index()));
/// ```
#[derive(Debug, Clone)]
pub struct VertexHashTable {
    key_size: usize,
    keys: Vec<i32>,
    slots: Vec<Option<VertexId>>,
    values: VertexValues,
}

impl VertexHashTable {
    /// Creates an empty table for keys of `key_size` components and value rows of `value_width` entries
    pub fn new(key_size: usize, value_width: usize) -> Self {
        Self::with_capacity(key_size, value_width, 0)
    }

    /// Creates an empty table that can hold `expected_vertices` vertices without growing
    pub fn with_capacity(key_size: usize, value_width: usize, expected_vertices: usize) -> Self {
        let capacity = (2 * expected_vertices).max(MIN_CAPACITY);
        Self {
            key_size,
            keys: Vec::with_capacity(expected_vertices * key_size),
            slots: vec![None; capacity],
            values: VertexValues::zeros(0, value_width),
        }
    }

    /// Number of components per key
    pub fn key_size(&self) -> usize {
        self.key_size
    }

    /// Number of vertices in this table
    pub fn len(&self) -> usize {
        self.values.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots of the probing table
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the id of `key`. If `key` is not yet in the table and `create` is `true`, a new vertex with a
    /// zeroed value row is inserted, otherwise `None` is returned.
    ///
    /// # Panics
    ///
    /// If `key` does not have `key_size` components
    pub fn find(&mut self, key: &[i32], create: bool) -> Option<VertexId> {
        assert_eq!(self.key_size, key.len());
        match self.probe(key) {
            Ok(id) => Some(id),
            Err(mut slot) if create => {
                if 2 * (self.len() + 1) > self.capacity() {
                    self.grow();
                    slot = self.free_slot(key);
                }
                let id = VertexId::from_index(self.len());
                self.keys.extend_from_slice(key);
                self.values.push_zero_row();
                self.slots[slot] = Some(id);
                Some(id)
            }
            Err(_) => None,
        }
    }

    /// Returns the id of `key`, inserting it if necessary
    pub fn insert(&mut self, key: &[i32]) -> VertexId {
        match self.find(key, true) {
            Some(id) => id,
            None => unreachable!("find with create always yields an id"),
        }
    }

    /// Read-only lookup. Never inserts and never grows the table.
    ///
    /// # Panics
    ///
    /// If `key` does not have `key_size` components
    pub fn lookup(&self, key: &[i32]) -> Option<VertexId> {
        assert_eq!(self.key_size, key.len());
        self.probe(key).ok()
    }

    /// Returns the key of the vertex `id`
    ///
    /// # Panics
    ///
    /// If `id` was not created by this table
    pub fn key(&self, id: VertexId) -> &[i32] {
        let start = id.index() * self.key_size;
        &self.keys[start..start + self.key_size]
    }

    /// Iterates over all keys in id order
    pub fn keys(&self) -> impl Iterator<Item = &[i32]> + '_ {
        (0..self.len()).map(move |index| self.key(VertexId::from_index(index)))
    }

    /// Iterates over all vertex ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = VertexId> {
        (0..self.len()).map(VertexId::from_index)
    }

    /// The value rows of all vertices, indexed by [`VertexId::index`]
    pub fn values(&self) -> &VertexValues {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut VertexValues {
        &mut self.values
    }

    /// Finds the vertex for `key`, or the empty slot where it would be inserted
    fn probe(&self, key: &[i32]) -> Result<VertexId, usize> {
        let capacity = self.capacity();
        let mut slot = hash_key(key) % capacity;
        loop {
            match self.slots[slot] {
                Some(id) if self.key(id) == key => return Ok(id),
                Some(_) => slot = (slot + 1) % capacity,
                None => return Err(slot),
            }
        }
    }

    /// First empty slot on the probe sequence of `key`
    fn free_slot(&self, key: &[i32]) -> usize {
        let capacity = self.capacity();
        let mut slot = hash_key(key) % capacity;
        while self.slots[slot].is_some() {
            slot = (slot + 1) % capacity;
        }
        slot
    }

    fn grow(&mut self) {
        let capacity = 2 * self.capacity();
        trace!(
            "Growing vertex table from {} to {} slots ({} vertices)",
            self.capacity(),
            capacity,
            self.len()
        );
        self.slots = vec![None; capacity];
        for id in self.ids() {
            let slot = self.free_slot(self.key(id));
            self.slots[slot] = Some(id);
        }
    }
}
