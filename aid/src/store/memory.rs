use std::collections::HashMap;
use std::hash::Hash;

use aid_common::policy::{FILE_POLICY_CAPACITY, SOCKET_POLICY_CAPACITY};
use aid_common::{FileKey, FilePerm, FilePolicyLookup, SocketKey, SocketPerm, SocketPolicyLookup};

use super::{PolicyStore, StoreError, Table};

/// Fixed-capacity map with the kernel hash map's insert semantics: a new key
/// is refused once `capacity` entries exist, an existing key is overwritten.
#[derive(Debug)]
struct BoundedTable<K, V> {
    entries: HashMap<K, V>,
    capacity: u32,
    table: Table,
}

impl<K: Eq + Hash + Copy + Ord, V: Copy> BoundedTable<K, V> {
    fn new(table: Table, capacity: u32) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            table,
        }
    }

    fn upsert(&mut self, key: K, value: V) -> Result<(), StoreError> {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity as usize {
            return Err(StoreError::CapacityExceeded {
                table: self.table,
                capacity: self.capacity,
            });
        }
        self.entries.insert(key, value);
        Ok(())
    }

    fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).copied()
    }

    fn snapshot(&self) -> Vec<(K, V)> {
        let mut rows: Vec<(K, V)> = self.entries.iter().map(|(k, v)| (*k, *v)).collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }
}

/// In-process policy store with the same bounds as the kernel tables.
#[derive(Debug)]
pub struct MemoryStore {
    files: BoundedTable<FileKey, FilePerm>,
    sockets: BoundedTable<SocketKey, SocketPerm>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_capacity(FILE_POLICY_CAPACITY, SOCKET_POLICY_CAPACITY)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(files: u32, sockets: u32) -> Self {
        Self {
            files: BoundedTable::new(Table::File, files),
            sockets: BoundedTable::new(Table::Socket, sockets),
        }
    }

    /// Drops every grant; capacities are kept.
    pub fn reset(&mut self) {
        self.files.entries.clear();
        self.sockets.entries.clear();
    }
}

impl PolicyStore for MemoryStore {
    fn upsert_file(&mut self, key: FileKey, perm: FilePerm) -> Result<(), StoreError> {
        self.files.upsert(key, perm)
    }

    fn upsert_socket(&mut self, key: SocketKey, perm: SocketPerm) -> Result<(), StoreError> {
        self.sockets.upsert(key, perm)
    }

    fn file_entries(&self) -> Result<Vec<(FileKey, FilePerm)>, StoreError> {
        Ok(self.files.snapshot())
    }

    fn socket_entries(&self) -> Result<Vec<(SocketKey, SocketPerm)>, StoreError> {
        Ok(self.sockets.snapshot())
    }
}

impl FilePolicyLookup for MemoryStore {
    fn lookup_file(&self, key: &FileKey) -> Option<FilePerm> {
        self.files.get(key)
    }
}

impl SocketPolicyLookup for MemoryStore {
    fn lookup_socket(&self, key: &SocketKey) -> Option<SocketPerm> {
        self.sockets.get(key)
    }
}
