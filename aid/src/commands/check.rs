// aid/src/commands/check.rs

use std::net::SocketAddrV4;
use std::path::Path;

use aid_common::{
    AccessMask, ConnectPolicy, Decision, Destination, EngineFlags, FileAccessPolicy,
    FilePolicyLookup, SocketPolicyLookup,
};

use crate::config::AidConfig;
use crate::error::{AidError, Result};
use crate::identity::lookup_agent;
use crate::inode::InodeInfo;
use crate::store::PinnedStore;

/// Access mask requested on the command line. No flag means a plain read.
pub fn requested_mask(read: bool, write: bool, exec: bool) -> AccessMask {
    let mut mask = AccessMask::default();
    if read {
        mask = mask | AccessMask::READ;
    }
    if write {
        mask = mask | AccessMask::WRITE;
    }
    if exec {
        mask = mask | AccessMask::EXEC;
    }
    if mask == AccessMask::default() {
        AccessMask::READ
    } else {
        mask
    }
}

/// Evaluates a file access the way the kernel hook would for `uid`.
/// The path is resolved first so the parent is the one of the real inode.
pub fn evaluate_file<T: FilePolicyLookup + ?Sized>(
    table: &T,
    flags: EngineFlags,
    uid: u32,
    path: &Path,
    mask: AccessMask,
) -> Result<Decision> {
    let path = std::fs::canonicalize(path)?;
    let info = InodeInfo::stat(&path)?;
    let mut meta = info.file_meta();
    if flags.contains(EngineFlags::DIRECTORY_INHERITANCE)
        && let Some(parent) = path.parent()
    {
        let parent = InodeInfo::stat(parent)?;
        meta = meta.with_parent(parent.file_id());
    }
    Ok(FileAccessPolicy::new(table, flags).decide(uid, Some(&meta), mask))
}

pub fn parse_target(target: &str) -> Result<Destination> {
    let addr: SocketAddrV4 = target.parse().map_err(|_| {
        AidError::Config(format!("'{}' is not an IPv4 ip:port pair", target))
    })?;
    Ok(Destination::ipv4(addr.ip().octets(), addr.port()))
}

pub fn evaluate_connect<T: SocketPolicyLookup + ?Sized>(
    table: &T,
    uid: u32,
    dest: &Destination,
) -> Decision {
    ConnectPolicy::new(table).decide(uid, Some(dest))
}

fn report(subject: &str, decision: Decision) -> bool {
    println!(
        "{}: {} ({})",
        subject,
        decision.verdict.as_str(),
        decision.reason.as_str()
    );
    decision.is_allowed()
}

/// Returns whether the access would be allowed.
pub fn handle_check(
    config: &AidConfig,
    agentname: &str,
    path: &Path,
    mask: AccessMask,
) -> Result<bool> {
    let account = lookup_agent(config, agentname)?;
    let store = PinnedStore::open(&config.pin_dir)?;
    let flags = store.engine_flags()?;
    let decision = evaluate_file(&store, flags, account.uid, path, mask)?;
    Ok(report(
        &format!("{} {}", account.account, path.display()),
        decision,
    ))
}

pub fn handle_check_connect(config: &AidConfig, agentname: &str, target: &str) -> Result<bool> {
    let account = lookup_agent(config, agentname)?;
    let dest = parse_target(target)?;
    let store = PinnedStore::open(&config.pin_dir)?;
    let decision = evaluate_connect(&store, account.uid, &dest);
    Ok(report(&format!("{} connect {}", account.account, target), decision))
}
