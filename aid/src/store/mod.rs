//! Policy store.
//!
//! Two bounded tables keyed by identity: file grants and IPv4 connect grants.
//! [`PinnedStore`] is the live kernel state behind the LSM probes, and
//! [`MemoryStore`] is the same contract in process memory. Both are read by
//! the decision engines through the `aid_common` lookup traits.
//!
//! Writes are upserts. There is no per-entry delete; entries only go away
//! when `aid reset` destroys the pinned maps.

use std::fmt;
use std::path::PathBuf;

use aid_common::{FileKey, FilePerm, SocketKey, SocketPerm};
use thiserror::Error;

mod memory;
mod pinned;

pub use memory::MemoryStore;
pub use pinned::PinnedStore;

/// Which of the two tables an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    File,
    Socket,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Table::File => write!(f, "file"),
            Table::Socket => write!(f, "socket"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// Inserting a new key into a full table. Overwrites never hit this.
    #[error("{table} policy table is full ({capacity} entries)")]
    CapacityExceeded { table: Table, capacity: u32 },
    #[error("policy store is not loaded: {} does not exist (run `aid load` first)", .0.display())]
    NotLoaded(PathBuf),
    #[error("map operation failed: {0}")]
    Map(String),
}

/// Write and enumerate side of a policy store.
pub trait PolicyStore {
    /// Inserts or overwrites a file grant.
    fn upsert_file(&mut self, key: FileKey, perm: FilePerm) -> Result<(), StoreError>;

    /// Inserts or overwrites a connect grant.
    fn upsert_socket(&mut self, key: SocketKey, perm: SocketPerm) -> Result<(), StoreError>;

    /// Snapshot of the file table. Not transactional with concurrent writers.
    fn file_entries(&self) -> Result<Vec<(FileKey, FilePerm)>, StoreError>;

    fn socket_entries(&self) -> Result<Vec<(SocketKey, SocketPerm)>, StoreError>;
}
