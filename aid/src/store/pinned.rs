//! The live tables, opened from their bpffs pins.

use std::path::{Path, PathBuf};

use aid_common::policy::{
    CONFIG_MAP, FILE_POLICIES_MAP, FILE_POLICY_CAPACITY, SOCKET_POLICIES_MAP,
    SOCKET_POLICY_CAPACITY,
};
use aid_common::{
    EngineFlags, FileKey, FilePerm, FilePolicyLookup, SocketKey, SocketPerm, SocketPolicyLookup,
};
use aya::Pod;
use aya::maps::{Array, HashMap as AyaHashMap, Map, MapData, MapError};

use super::{PolicyStore, StoreError, Table};
use crate::logging::LogLevel;

pub struct PinnedStore {
    pin_dir: PathBuf,
    files: AyaHashMap<MapData, FileKey, FilePerm>,
    sockets: AyaHashMap<MapData, SocketKey, SocketPerm>,
}

impl PinnedStore {
    /// Opens both policy tables under `pin_dir`. Fails with
    /// [`StoreError::NotLoaded`] when `aid load` has not run.
    pub fn open(pin_dir: &Path) -> Result<Self, StoreError> {
        let files = open_hash_map(&pin_dir.join(FILE_POLICIES_MAP))?;
        let sockets = open_hash_map(&pin_dir.join(SOCKET_POLICIES_MAP))?;
        policy_log!(LogLevel::Debug, "Opened pinned tables in {}", pin_dir.display());
        Ok(Self {
            pin_dir: pin_dir.to_path_buf(),
            files,
            sockets,
        })
    }

    /// The flag word the probes currently run with.
    pub fn engine_flags(&self) -> Result<EngineFlags, StoreError> {
        let path = self.pin_dir.join(CONFIG_MAP);
        let data = open_map_data(&path)?;
        let config: Array<MapData, EngineFlags> = Array::try_from(Map::Array(data))
            .map_err(|e| StoreError::Map(format!("{}: {}", path.display(), e)))?;
        let flags = config
            .get(&0, 0)
            .map_err(|e| StoreError::Map(format!("{}: {}", path.display(), e)))?;
        Ok(EngineFlags::from_bits_truncate(flags.bits()))
    }
}

fn open_map_data(path: &Path) -> Result<MapData, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotLoaded(path.to_path_buf()));
    }
    MapData::from_pin(path)
        .map_err(|e| StoreError::Map(format!("failed to open {}: {}", path.display(), e)))
}

fn open_hash_map<K: Pod, V: Pod>(path: &Path) -> Result<AyaHashMap<MapData, K, V>, StoreError> {
    let data = open_map_data(path)?;
    AyaHashMap::try_from(Map::HashMap(data))
        .map_err(|e| StoreError::Map(format!("{}: {}", path.display(), e)))
}

/// The kernel reports a full hash map as E2BIG on insert of a new key.
fn insert_error(err: MapError, table: Table, capacity: u32) -> StoreError {
    match &err {
        MapError::SyscallError(syscall) if syscall.io_error.raw_os_error() == Some(libc::E2BIG) => {
            StoreError::CapacityExceeded { table, capacity }
        }
        _ => StoreError::Map(err.to_string()),
    }
}

/// Absent keys are the common case; anything else is logged and treated as absent.
fn lookup_result<V>(result: Result<V, MapError>, table: Table) -> Option<V> {
    match result {
        Ok(value) => Some(value),
        Err(MapError::KeyNotFound) => None,
        Err(e) => {
            policy_log!(LogLevel::Warn, "{} table lookup failed: {}", table, e);
            None
        }
    }
}

fn collect<K: Pod, V: Pod>(
    map: &AyaHashMap<MapData, K, V>,
    table: Table,
) -> Result<Vec<(K, V)>, StoreError> {
    let mut rows = Vec::new();
    for entry in map.iter() {
        match entry {
            Ok(row) => rows.push(row),
            // Removed between key fetch and lookup; the walk restarts cleanly.
            Err(MapError::KeyNotFound) => continue,
            Err(e) => return Err(StoreError::Map(format!("{} table iteration: {}", table, e))),
        }
    }
    Ok(rows)
}

impl PolicyStore for PinnedStore {
    fn upsert_file(&mut self, key: FileKey, perm: FilePerm) -> Result<(), StoreError> {
        self.files
            .insert(key, perm, 0)
            .map_err(|e| insert_error(e, Table::File, FILE_POLICY_CAPACITY))
    }

    fn upsert_socket(&mut self, key: SocketKey, perm: SocketPerm) -> Result<(), StoreError> {
        self.sockets
            .insert(key, perm, 0)
            .map_err(|e| insert_error(e, Table::Socket, SOCKET_POLICY_CAPACITY))
    }

    fn file_entries(&self) -> Result<Vec<(FileKey, FilePerm)>, StoreError> {
        collect(&self.files, Table::File)
    }

    fn socket_entries(&self) -> Result<Vec<(SocketKey, SocketPerm)>, StoreError> {
        collect(&self.sockets, Table::Socket)
    }
}

impl FilePolicyLookup for PinnedStore {
    fn lookup_file(&self, key: &FileKey) -> Option<FilePerm> {
        lookup_result(self.files.get(key, 0), Table::File)
    }
}

impl SocketPolicyLookup for PinnedStore {
    fn lookup_socket(&self, key: &SocketKey) -> Option<SocketPerm> {
        lookup_result(self.sockets.get(key, 0), Table::Socket)
    }
}
