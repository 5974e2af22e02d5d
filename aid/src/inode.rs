//! `stat()` metadata in the shapes the policy layer needs.
//!
//! Grants are keyed with the legacy device encoding, checks are evaluated
//! from the kernel encoding. Both come from the same major/minor split here,
//! so a path always maps to the key the probe will compute for it.

use std::fmt;
use std::path::{Path, PathBuf};

use aid_common::device::{kernel_encode, legacy_encode};
use aid_common::{FileId, FileMeta};
use nix::sys::stat::{SFlag, major, minor, stat};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InodeInfo {
    pub path: PathBuf,
    /// `st_dev` exactly as the C library reports it.
    pub raw_dev: u64,
    pub major: u32,
    pub minor: u32,
    pub ino: u64,
    pub mode: u32,
}

impl InodeInfo {
    pub fn stat(path: &Path) -> Result<Self> {
        let st = stat(path)?;
        let raw_dev = st.st_dev as u64;
        Ok(Self {
            path: path.to_path_buf(),
            raw_dev,
            major: major(raw_dev) as u32,
            minor: minor(raw_dev) as u32,
            ino: st.st_ino as u64,
            mode: st.st_mode as u32,
        })
    }

    /// Device in the policy key encoding.
    pub fn legacy_dev(&self) -> u64 {
        legacy_encode(self.major, self.minor)
    }

    /// Device as the kernel stores it in `s_dev`.
    pub fn kernel_dev(&self) -> u32 {
        kernel_encode(self.major, self.minor)
    }

    pub fn file_id(&self) -> FileId {
        FileId {
            dev: self.kernel_dev(),
            ino: self.ino,
        }
    }

    /// What the file probe would read for this inode.
    pub fn file_meta(&self) -> FileMeta {
        FileMeta::new(self.kernel_dev(), self.ino, self.mode as u16)
    }

    fn file_type(&self) -> SFlag {
        SFlag::from_bits_truncate(self.mode & SFlag::S_IFMT.bits())
    }

    pub fn is_regular(&self) -> bool {
        self.file_type() == SFlag::S_IFREG
    }

    pub fn is_dir(&self) -> bool {
        self.file_type() == SFlag::S_IFDIR
    }

    /// Only regular files and directories can carry grants.
    pub fn is_grantable(&self) -> bool {
        self.is_regular() || self.is_dir()
    }
}

impl fmt::Display for InodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Path:       {}", self.path.display())?;
        writeln!(f, "st_dev:     {} (0x{:x})", self.raw_dev, self.raw_dev)?;
        writeln!(f, "Major:      {}", self.major)?;
        writeln!(f, "Minor:      {}", self.minor)?;
        writeln!(
            f,
            "Policy dev: {} (0x{:x})",
            self.legacy_dev(),
            self.legacy_dev()
        )?;
        writeln!(f, "Kernel dev: 0x{:x}", self.kernel_dev())?;
        writeln!(f, "Inode:      {}", self.ino)?;
        write!(f, "Mode:       {:o}", self.mode)
    }
}
