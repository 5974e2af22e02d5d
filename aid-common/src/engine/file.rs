use core::ops::BitOr;

use super::{Decision, Reason};
use crate::config::EngineFlags;
use crate::device::kernel_to_legacy;
use crate::identity::is_agent;
use crate::policy::{FileKey, FilePerm, FilePolicyLookup};

const S_IFMT: u16 = 0o170_000;
const S_IFSOCK: u16 = 0o140_000;
const S_IFBLK: u16 = 0o060_000;
const S_IFCHR: u16 = 0o020_000;
const S_IXUGO: u16 = 0o111;

/// Kernel `MAY_*` access mask as passed to `security_file_permission`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessMask(u32);

impl AccessMask {
    pub const EXEC: Self = Self(0x1);
    pub const WRITE: Self = Self(0x2);
    pub const READ: Self = Self(0x4);
    pub const APPEND: Self = Self(0x8);

    #[inline(always)]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[inline(always)]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline(always)]
    pub const fn wants_exec(self) -> bool {
        self.0 & Self::EXEC.0 != 0
    }

    #[inline(always)]
    pub const fn wants_read(self) -> bool {
        self.0 & Self::READ.0 != 0
    }

    /// Append is a write as far as the table is concerned.
    #[inline(always)]
    pub const fn wants_write(self) -> bool {
        self.0 & (Self::WRITE.0 | Self::APPEND.0) != 0
    }

    /// Exactly `MAY_READ`, nothing else.
    #[inline(always)]
    pub const fn is_read_only(self) -> bool {
        self.0 == Self::READ.0
    }
}

impl BitOr for AccessMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Kernel identity of an inode: `s_dev` (kernel encoding) and `i_ino`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileId {
    pub dev: u32,
    pub ino: u64,
}

/// What the file probe managed to read from `struct file`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    pub id: FileId,
    pub mode: u16,
    /// Parent directory of the dentry. Only filled in when directory
    /// inheritance is enabled.
    pub parent: Option<FileId>,
}

impl FileMeta {
    pub const fn new(dev: u32, ino: u64, mode: u16) -> Self {
        Self {
            id: FileId { dev, ino },
            mode,
            parent: None,
        }
    }

    #[must_use]
    pub const fn with_parent(mut self, parent: FileId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Terminals, null devices, block devices and socket files.
    #[inline(always)]
    pub const fn is_special(&self) -> bool {
        matches!(self.mode & S_IFMT, S_IFCHR | S_IFBLK | S_IFSOCK)
    }

    /// Executable by owner, group or other.
    #[inline(always)]
    pub const fn is_executable(&self) -> bool {
        self.mode & S_IXUGO != 0
    }

    /// The policy key this file maps to for `uid`.
    #[inline(always)]
    pub const fn key(&self, uid: u32) -> FileKey {
        file_key(self.id, uid)
    }
}

#[inline(always)]
const fn file_key(id: FileId, uid: u32) -> FileKey {
    FileKey::new(kernel_to_legacy(id.dev), id.ino, uid)
}

/// File-permission decision engine.
pub struct FileAccessPolicy<'a, T: ?Sized> {
    table: &'a T,
    flags: EngineFlags,
}

impl<'a, T: FilePolicyLookup + ?Sized> FileAccessPolicy<'a, T> {
    pub const fn new(table: &'a T, flags: EngineFlags) -> Self {
        Self { table, flags }
    }

    /// Decides one `file_permission` call.
    ///
    /// `file` is `None` when the probe could not resolve the backing inode.
    /// The carve-outs run before the table lookup; without them an agent could
    /// not load shared libraries or open its terminal.
    #[inline(always)]
    pub fn decide(&self, uid: u32, file: Option<&FileMeta>, mask: AccessMask) -> Decision {
        if !is_agent(uid) {
            return Decision::allow(Reason::NotAgent);
        }

        let Some(meta) = file else {
            return Decision::allow(Reason::Unresolved);
        };

        if meta.is_special() {
            return Decision::allow(Reason::SpecialFile);
        }

        let key = meta.key(uid);

        if mask.wants_exec() {
            return Decision::allow(Reason::Execute);
        }

        if mask.is_read_only() && meta.is_executable() {
            return Decision::allow(Reason::ExecutableRead);
        }

        if let Some(perm) = self.table.lookup_file(&key) {
            return check(perm, mask, Reason::Granted);
        }

        if self.flags.contains(EngineFlags::DIRECTORY_INHERITANCE)
            && let Some(parent) = meta.parent
            && let Some(perm) = self.table.lookup_file(&file_key(parent, uid))
        {
            return check(perm, mask, Reason::Inherited);
        }

        Decision::deny(Reason::NoPolicy)
    }
}

#[inline(always)]
fn check(perm: FilePerm, mask: AccessMask, granted: Reason) -> Decision {
    if mask.wants_read() && !perm.can_read() {
        return Decision::deny(Reason::ReadNotGranted);
    }
    if mask.wants_write() && !perm.can_write() {
        return Decision::deny(Reason::WriteNotGranted);
    }
    Decision::allow(granted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::kernel_encode;
    use crate::engine::Verdict;
    use std::collections::HashMap;

    const AGENT: u32 = 50_010;
    const REGULAR: u16 = 0o100_644;

    #[derive(Default)]
    struct Table(HashMap<FileKey, FilePerm>);

    impl FilePolicyLookup for Table {
        fn lookup_file(&self, key: &FileKey) -> Option<FilePerm> {
            self.0.get(key).copied()
        }
    }

    fn sda1_file(ino: u64, mode: u16) -> FileMeta {
        FileMeta::new(kernel_encode(8, 1), ino, mode)
    }

    fn read_only_table() -> Table {
        let mut table = Table::default();
        table
            .0
            .insert(FileKey::new(0x0801, 1234, AGENT), FilePerm::new(true, false));
        table
    }

    #[test]
    fn scenario_read_only_entry() {
        let table = read_only_table();
        let engine = FileAccessPolicy::new(&table, EngineFlags::empty());
        let file = sda1_file(1234, REGULAR);

        let read = engine.decide(AGENT, Some(&file), AccessMask::READ);
        assert_eq!(read, Decision::allow(Reason::Granted));

        let write = engine.decide(AGENT, Some(&file), AccessMask::WRITE);
        assert_eq!(write, Decision::deny(Reason::WriteNotGranted));

        let exec = engine.decide(AGENT, Some(&file), AccessMask::EXEC);
        assert_eq!(exec, Decision::allow(Reason::Execute));
    }

    #[test]
    fn write_only_entry_denies_read() {
        let mut table = Table::default();
        table
            .0
            .insert(FileKey::new(0x0801, 7, AGENT), FilePerm::new(false, true));
        let engine = FileAccessPolicy::new(&table, EngineFlags::empty());
        let file = sda1_file(7, REGULAR);

        assert!(engine.decide(AGENT, Some(&file), AccessMask::WRITE).is_allowed());
        assert!(engine.decide(AGENT, Some(&file), AccessMask::APPEND).is_allowed());
        assert_eq!(
            engine.decide(AGENT, Some(&file), AccessMask::READ),
            Decision::deny(Reason::ReadNotGranted)
        );
        assert_eq!(
            engine
                .decide(AGENT, Some(&file), AccessMask::READ | AccessMask::WRITE)
                .verdict,
            Verdict::Deny
        );
    }

    #[test]
    fn absent_entry_is_denied() {
        let table = Table::default();
        let engine = FileAccessPolicy::new(&table, EngineFlags::empty());
        let file = sda1_file(99, REGULAR);
        assert_eq!(
            engine.decide(AGENT, Some(&file), AccessMask::READ),
            Decision::deny(Reason::NoPolicy)
        );
        assert_eq!(
            engine.decide(AGENT, Some(&file), AccessMask::WRITE),
            Decision::deny(Reason::NoPolicy)
        );
    }

    #[test]
    fn non_agents_bypass_everything() {
        let table = Table::default();
        let engine = FileAccessPolicy::new(&table, EngineFlags::empty());
        let file = sda1_file(99, REGULAR);
        for uid in [0, 1000, 49_999, 60_000] {
            assert_eq!(
                engine.decide(uid, Some(&file), AccessMask::WRITE),
                Decision::allow(Reason::NotAgent)
            );
        }
    }

    #[test]
    fn unresolved_inode_fails_open() {
        let table = Table::default();
        let engine = FileAccessPolicy::new(&table, EngineFlags::empty());
        assert_eq!(
            engine.decide(AGENT, None, AccessMask::WRITE),
            Decision::allow(Reason::Unresolved)
        );
    }

    #[test]
    fn special_files_are_exempt() {
        let table = Table::default();
        let engine = FileAccessPolicy::new(&table, EngineFlags::empty());
        for mode in [0o020_620, 0o060_660, 0o140_777] {
            let file = sda1_file(5, mode);
            assert_eq!(
                engine.decide(AGENT, Some(&file), AccessMask::WRITE),
                Decision::allow(Reason::SpecialFile)
            );
        }
    }

    #[test]
    fn executable_read_exemption_is_read_only() {
        let table = Table::default();
        let engine = FileAccessPolicy::new(&table, EngineFlags::empty());
        let lib = sda1_file(42, 0o100_755);
        assert_eq!(
            engine.decide(AGENT, Some(&lib), AccessMask::READ),
            Decision::allow(Reason::ExecutableRead)
        );
        assert_eq!(
            engine.decide(AGENT, Some(&lib), AccessMask::WRITE),
            Decision::deny(Reason::NoPolicy)
        );
        assert_eq!(
            engine
                .decide(AGENT, Some(&lib), AccessMask::READ | AccessMask::APPEND)
                .verdict,
            Verdict::Deny
        );
    }

    #[test]
    fn inheritance_is_opt_in() {
        let mut table = Table::default();
        table
            .0
            .insert(FileKey::new(0x0801, 2, AGENT), FilePerm::new(true, true));
        let file = sda1_file(300, REGULAR).with_parent(FileId {
            dev: kernel_encode(8, 1),
            ino: 2,
        });

        let canonical = FileAccessPolicy::new(&table, EngineFlags::empty());
        assert_eq!(
            canonical.decide(AGENT, Some(&file), AccessMask::WRITE),
            Decision::deny(Reason::NoPolicy)
        );

        let inheriting = FileAccessPolicy::new(&table, EngineFlags::DIRECTORY_INHERITANCE);
        assert_eq!(
            inheriting.decide(AGENT, Some(&file), AccessMask::WRITE),
            Decision::allow(Reason::Inherited)
        );
    }

    #[test]
    fn direct_entry_wins_over_parent() {
        let mut table = Table::default();
        table
            .0
            .insert(FileKey::new(0x0801, 2, AGENT), FilePerm::new(true, true));
        table
            .0
            .insert(FileKey::new(0x0801, 300, AGENT), FilePerm::new(true, false));
        let file = sda1_file(300, REGULAR).with_parent(FileId {
            dev: kernel_encode(8, 1),
            ino: 2,
        });
        let engine = FileAccessPolicy::new(&table, EngineFlags::DIRECTORY_INHERITANCE);
        assert_eq!(
            engine.decide(AGENT, Some(&file), AccessMask::WRITE),
            Decision::deny(Reason::WriteNotGranted)
        );
    }

    #[test]
    fn entries_are_per_identity() {
        let table = read_only_table();
        let engine = FileAccessPolicy::new(&table, EngineFlags::empty());
        let file = sda1_file(1234, REGULAR);
        assert_eq!(
            engine.decide(AGENT + 1, Some(&file), AccessMask::READ),
            Decision::deny(Reason::NoPolicy)
        );
    }
}
