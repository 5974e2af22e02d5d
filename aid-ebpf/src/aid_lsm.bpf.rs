#![no_std]
#![no_main]

#[allow(
    non_upper_case_globals,
    non_snake_case,
    non_camel_case_types,
    dead_code,
    unnecessary_transmutes,
    clippy::all
)]
mod vmlinux {
    include!(concat!(env!("OUT_DIR"), "/vmlinux.rs"));
}

use aid_common::config::EngineFlags;
use aid_common::device::kernel_to_legacy;
use aid_common::event::{
    DecisionEvent, EVENT_KIND_CONNECT, EVENT_KIND_FILE, EVENTS_BYTE_SIZE, should_trace,
};
use aid_common::policy::{
    AF_INET, FILE_POLICY_CAPACITY, FileKey, FilePerm, FilePolicyLookup, SOCKADDR_IN_LEN,
    SOCKET_POLICY_CAPACITY, SocketKey, SocketPerm, SocketPolicyLookup,
};
use aid_common::{
    AccessMask, ConnectPolicy, Decision, Destination, FileAccessPolicy, FileId, FileMeta, is_agent,
};
use aya_ebpf::{
    helpers::{
        bpf_get_current_pid_tgid, bpf_get_current_task, bpf_get_current_uid_gid,
        bpf_ktime_get_ns, bpf_probe_read_kernel,
    },
    macros::{lsm, map},
    maps::{Array, HashMap, RingBuf},
    programs::LsmContext,
};
use vmlinux::{cred, dentry, file, inode, sockaddr, sockaddr_in, super_block, task_struct};

// Pinned by name under the loader's pin directory; a reload reuses them.
#[map]
static FILE_POLICIES: HashMap<FileKey, FilePerm> = HashMap::pinned(FILE_POLICY_CAPACITY, 0);

#[map]
static SOCKET_POLICIES: HashMap<SocketKey, SocketPerm> =
    HashMap::pinned(SOCKET_POLICY_CAPACITY, 0);

#[map]
static AID_CONFIG: Array<EngineFlags> = Array::pinned(1, 0);

#[map]
static AID_EVENTS: RingBuf = RingBuf::pinned(EVENTS_BYTE_SIZE, 0);

struct FileTable;

impl FilePolicyLookup for FileTable {
    #[inline(always)]
    fn lookup_file(&self, key: &FileKey) -> Option<FilePerm> {
        // SAFETY: the value is copied out while the map element is still live.
        unsafe { FILE_POLICIES.get(key).copied() }
    }
}

struct SocketTable;

impl SocketPolicyLookup for SocketTable {
    #[inline(always)]
    fn lookup_socket(&self, key: &SocketKey) -> Option<SocketPerm> {
        // SAFETY: as above.
        unsafe { SOCKET_POLICIES.get(key).copied() }
    }
}

#[inline(always)]
fn engine_flags() -> EngineFlags {
    AID_CONFIG.get(0).copied().unwrap_or_default()
}

/// Effective uid of the current task, falling back to the real uid when the
/// credentials cannot be read.
#[inline(always)]
fn current_euid() -> u32 {
    let task = unsafe { bpf_get_current_task() } as *const task_struct;
    let euid = unsafe {
        bpf_probe_read_kernel(&raw const (*task).cred)
            .ok()
            .filter(|creds: &*const cred| !creds.is_null())
            .and_then(|creds| bpf_probe_read_kernel(&raw const (*creds).euid.val).ok())
    };
    euid.unwrap_or(bpf_get_current_uid_gid() as u32)
}

#[lsm(hook = "file_permission")]
pub fn file_permission(ctx: LsmContext) -> i32 {
    // Keep an earlier denial from another program on this hook.
    let retval: i32 = unsafe { ctx.arg(2) };
    if retval != 0 {
        return retval;
    }
    try_file_permission(&ctx)
}

fn try_file_permission(ctx: &LsmContext) -> i32 {
    let uid = current_euid();
    if !is_agent(uid) {
        return 0;
    }

    let flags = engine_flags();
    let file: *const file = unsafe { ctx.arg(0) };
    let mask = AccessMask::from_bits(unsafe { ctx.arg::<i32>(1) } as u32);
    let meta = unsafe { read_file_meta(file, flags) };

    let decision = FileAccessPolicy::new(&FileTable, flags).decide(uid, meta.as_ref(), mask);
    if should_trace(flags, &decision) {
        let (dev, ino) = meta
            .map(|m| (kernel_to_legacy(m.id.dev), m.id.ino))
            .unwrap_or((0, 0));
        emit(DecisionEvent {
            dev,
            ino,
            mask: mask.bits(),
            ..event(EVENT_KIND_FILE, uid, &decision)
        });
    }
    decision.verdict.retval()
}

/// Reads the inode identity and mode behind `file`. `None` means the inode
/// could not be resolved and the engine fails open.
#[inline(always)]
unsafe fn read_file_meta(file: *const file, flags: EngineFlags) -> Option<FileMeta> {
    if file.is_null() {
        return None;
    }
    unsafe {
        let inode: *const inode = bpf_probe_read_kernel(&raw const (*file).f_inode).ok()?;
        let id = read_inode_id(inode)?;
        let mode: u16 = bpf_probe_read_kernel(&raw const (*inode).i_mode).ok()?;
        let meta = FileMeta { id, mode, parent: None };

        if !flags.contains(EngineFlags::DIRECTORY_INHERITANCE) {
            return Some(meta);
        }
        match read_parent_id(file) {
            Some(parent) => Some(meta.with_parent(parent)),
            None => Some(meta),
        }
    }
}

#[inline(always)]
unsafe fn read_inode_id(inode: *const inode) -> Option<FileId> {
    if inode.is_null() {
        return None;
    }
    unsafe {
        let ino = bpf_probe_read_kernel(&raw const (*inode).i_ino).ok()?;
        let sb: *const super_block = bpf_probe_read_kernel(&raw const (*inode).i_sb).ok()?;
        if sb.is_null() {
            return None;
        }
        let dev = bpf_probe_read_kernel(&raw const (*sb).s_dev).ok()?;
        Some(FileId { dev, ino })
    }
}

#[inline(always)]
unsafe fn read_parent_id(file: *const file) -> Option<FileId> {
    unsafe {
        let dentry: *const dentry = bpf_probe_read_kernel(&raw const (*file).f_path.dentry).ok()?;
        if dentry.is_null() {
            return None;
        }
        let parent: *const dentry = bpf_probe_read_kernel(&raw const (*dentry).d_parent).ok()?;
        // The root of a mount is its own parent.
        if parent.is_null() || parent == dentry {
            return None;
        }
        let inode: *const inode = bpf_probe_read_kernel(&raw const (*parent).d_inode).ok()?;
        read_inode_id(inode)
    }
}

#[lsm(hook = "socket_connect")]
pub fn socket_connect(ctx: LsmContext) -> i32 {
    let retval: i32 = unsafe { ctx.arg(3) };
    if retval != 0 {
        return retval;
    }
    try_socket_connect(&ctx)
}

fn try_socket_connect(ctx: &LsmContext) -> i32 {
    let uid = current_euid();
    if !is_agent(uid) {
        return 0;
    }

    let address: *const sockaddr = unsafe { ctx.arg(1) };
    let addrlen: i32 = unsafe { ctx.arg(2) };
    let dest = unsafe { read_destination(address, addrlen) };

    let decision = ConnectPolicy::new(&SocketTable).decide(uid, dest.as_ref());
    let flags = engine_flags();
    if should_trace(flags, &decision) {
        let (addr, port) = dest.map(|d| (d.addr, d.port)).unwrap_or((0, 0));
        emit(DecisionEvent {
            addr,
            port,
            ..event(EVENT_KIND_CONNECT, uid, &decision)
        });
    }
    decision.verdict.retval()
}

/// Reads the destination. Port and address are only read for a full-length
/// AF_INET address; the engine decides everything else from family and length.
#[inline(always)]
unsafe fn read_destination(address: *const sockaddr, len: i32) -> Option<Destination> {
    if address.is_null() {
        return None;
    }
    unsafe {
        let family: u16 = bpf_probe_read_kernel(&raw const (*address).sa_family).ok()?;
        let mut dest = Destination {
            family,
            len,
            port: 0,
            addr: 0,
        };
        if family == AF_INET && len >= SOCKADDR_IN_LEN {
            let sin = address as *const sockaddr_in;
            let port: u16 = bpf_probe_read_kernel(&raw const (*sin).sin_port).ok()?;
            dest.port = u16::from_be(port);
            dest.addr = bpf_probe_read_kernel(&raw const (*sin).sin_addr.s_addr).ok()?;
        }
        Some(dest)
    }
}

#[inline(always)]
fn event(kind: u8, uid: u32, decision: &Decision) -> DecisionEvent {
    DecisionEvent {
        timestamp_ns: unsafe { bpf_ktime_get_ns() },
        uid,
        pid: (bpf_get_current_pid_tgid() >> 32) as u32,
        kind,
        verdict: decision.verdict as u8,
        reason: decision.reason as u8,
        ..DecisionEvent::default()
    }
}

/// Best effort: a full ring buffer drops the event, the verdict stands.
#[inline(always)]
fn emit(event: DecisionEvent) {
    if let Some(mut entry) = AID_EVENTS.reserve::<DecisionEvent>(0) {
        entry.write(event);
        entry.submit(0);
    }
}

#[unsafe(link_section = "license")]
#[unsafe(no_mangle)]
static LICENSE: [u8; 4] = *b"GPL\0";

#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    unsafe { core::hint::unreachable_unchecked() }
}
