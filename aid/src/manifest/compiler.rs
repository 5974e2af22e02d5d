// aid/src/manifest/compiler.rs

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use aid_common::{FileKey, FilePerm, SocketKey, SocketPerm};
use glob::MatchOptions;

use super::{FileRule, Manifest, NetworkRule};
use crate::inode::InodeInfo;
use crate::logging::LogLevel;
use crate::store::{PolicyStore, StoreError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Register the parent directory of every match with the same grants.
    pub grant_parent_dirs: bool,
}

/// A resolved file grant: one inode and what the agent may do with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileGrant {
    pub path: PathBuf,
    /// Legacy device encoding, ready for the key.
    pub dev: u64,
    pub ino: u64,
    pub read: bool,
    pub write: bool,
}

impl FileGrant {
    fn from_inode(info: &InodeInfo, read: bool, write: bool) -> Self {
        Self {
            path: info.path.clone(),
            dev: info.legacy_dev(),
            ino: info.ino,
            read,
            write,
        }
    }

    pub fn key(&self, uid: u32) -> FileKey {
        FileKey::new(self.dev, self.ino, uid)
    }

    pub fn perm(&self) -> FilePerm {
        FilePerm::new(self.read, self.write)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketGrant {
    pub addr: Ipv4Addr,
    pub port: u16,
    pub connect: bool,
}

impl SocketGrant {
    pub fn key(&self, uid: u32) -> SocketKey {
        SocketKey::ipv4(uid, self.addr.octets(), self.port)
    }

    pub fn perm(&self) -> SocketPerm {
        SocketPerm::new(self.connect)
    }
}

/// Everything `addagent` will write, resolved before the first write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledManifest {
    pub agentname: String,
    pub files: Vec<FileGrant>,
    pub sockets: Vec<SocketGrant>,
    /// Non-fatal problems: empty paths, patterns without matches, skipped
    /// special files.
    pub warnings: Vec<String>,
}

/// Counts of what [`CompiledManifest::install`] wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub files: usize,
    pub sockets: usize,
}

impl Manifest {
    /// Resolves every rule against the live filesystem.
    ///
    /// Pattern syntax errors and bad addresses are fatal. Missing files are not:
    /// a manifest may name paths that will only exist later.
    pub fn compile(&self, options: CompileOptions) -> Result<CompiledManifest, String> {
        let mut compiled = CompiledManifest {
            agentname: self.agentname.clone(),
            files: Vec::new(),
            sockets: Vec::new(),
            warnings: Vec::new(),
        };

        for rule in &self.permissions.files {
            compile_file_rule(rule, options, &mut compiled)?;
        }

        for rule in &self.permissions.network {
            compiled.sockets.push(compile_network_rule(rule)?);
        }

        Ok(compiled)
    }
}

fn compile_file_rule(
    rule: &FileRule,
    options: CompileOptions,
    out: &mut CompiledManifest,
) -> Result<(), String> {
    let pattern = rule.path.trim();
    if pattern.is_empty() {
        out.warnings.push("skipping file rule with empty path".to_string());
        return Ok(());
    }
    if pattern.contains('\0') {
        return Err(format!("path '{}' contains a NUL byte", pattern.escape_default()));
    }

    let matches = glob::glob_with(pattern, match_options())
        .map_err(|e| format!("invalid pattern '{}': {}", pattern, e))?;

    let mut matched = 0usize;
    for entry in matches {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                out.warnings.push(format!("{}: {}", pattern, e));
                continue;
            }
        };
        let info = match InodeInfo::stat(&path) {
            Ok(info) => info,
            Err(e) => {
                out.warnings
                    .push(format!("cannot stat {}: {}", path.display(), e));
                continue;
            }
        };
        if !info.is_grantable() {
            out.warnings.push(format!(
                "skipping {}: not a regular file or directory",
                path.display()
            ));
            continue;
        }

        matched += 1;
        policy_log!(
            LogLevel::Debug,
            "{} -> dev=0x{:x} ino={} read={} write={}",
            path.display(),
            info.legacy_dev(),
            info.ino,
            rule.read,
            rule.write
        );
        out.files.push(FileGrant::from_inode(&info, rule.read, rule.write));

        if options.grant_parent_dirs
            && let Some(parent) = parent_dir(&path)
        {
            push_parent(parent, rule, out);
        }
    }

    if matched == 0 {
        out.warnings
            .push(format!("pattern '{}' matched no files", pattern));
        if options.grant_parent_dirs
            && let Some(parent) = parent_dir(Path::new(pattern))
            && parent != Path::new("/")
        {
            push_parent(parent, rule, out);
        }
    }
    Ok(())
}

/// Wildcards never match a leading `.`, as with POSIX `glob(3)`.
pub fn match_options() -> MatchOptions {
    MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    }
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty() && *p != Path::new("."))
}

fn push_parent(parent: &Path, rule: &FileRule, out: &mut CompiledManifest) {
    match InodeInfo::stat(parent) {
        Ok(info) if info.is_dir() => {
            out.files.push(FileGrant::from_inode(&info, rule.read, rule.write));
        }
        Ok(_) => {}
        Err(e) => out
            .warnings
            .push(format!("cannot stat parent {}: {}", parent.display(), e)),
    }
}

fn compile_network_rule(rule: &NetworkRule) -> Result<SocketGrant, String> {
    let addr: Ipv4Addr = rule.address.trim().parse().map_err(|_| {
        format!(
            "network address '{}' is not an IPv4 address",
            rule.address
        )
    })?;
    Ok(SocketGrant {
        addr,
        port: rule.port,
        connect: rule.connect,
    })
}

impl CompiledManifest {
    pub fn file_entries(&self, uid: u32) -> impl Iterator<Item = (FileKey, FilePerm)> + '_ {
        self.files.iter().map(move |g| (g.key(uid), g.perm()))
    }

    pub fn socket_entries(&self, uid: u32) -> impl Iterator<Item = (SocketKey, SocketPerm)> + '_ {
        self.sockets.iter().map(move |g| (g.key(uid), g.perm()))
    }

    /// Writes every grant for `uid` in manifest order. Stops at the first
    /// store error; entries written before it stay.
    pub fn install<S: PolicyStore + ?Sized>(
        &self,
        uid: u32,
        store: &mut S,
    ) -> Result<InstallReport, StoreError> {
        let mut report = InstallReport::default();
        for (key, perm) in self.file_entries(uid) {
            store.upsert_file(key, perm)?;
            report.files += 1;
        }
        for (key, perm) in self.socket_entries(uid) {
            store.upsert_socket(key, perm)?;
            report.sockets += 1;
        }
        Ok(report)
    }
}
