// src/tests/test_trace.rs

use crate::loader::{link_pin_path, lists_bpf_lsm};
use crate::trace::{TraceLine, limit_reached, parse_event};
use aid_common::event::{DecisionEvent, EVENT_KIND_CONNECT, EVENT_KIND_FILE};
use aid_common::{AccessMask, Reason, Verdict};
use std::path::{Path, PathBuf};

fn as_bytes(event: &DecisionEvent) -> Vec<u8> {
    let ptr = event as *const DecisionEvent as *const u8;
    unsafe { std::slice::from_raw_parts(ptr, std::mem::size_of::<DecisionEvent>()) }.to_vec()
}

#[test]
fn test_parse_event() {
    let event = DecisionEvent {
        timestamp_ns: 1_500_000_000,
        dev: 0x0801,
        ino: 1234,
        uid: 50_010,
        pid: 4242,
        mask: AccessMask::WRITE.bits(),
        kind: EVENT_KIND_FILE,
        verdict: Verdict::Deny as u8,
        reason: Reason::WriteNotGranted as u8,
        ..DecisionEvent::default()
    };
    let bytes = as_bytes(&event);
    assert_eq!(parse_event(&bytes), Some(event));

    // Records may sit at any offset in the ring.
    let mut shifted = vec![0u8];
    shifted.extend_from_slice(&bytes);
    assert_eq!(parse_event(&shifted[1..]), Some(event));

    assert_eq!(parse_event(&bytes[..10]), None);
}

#[test]
fn test_file_event_line() {
    let event = DecisionEvent {
        timestamp_ns: 1_500_000_000,
        dev: 0x0801,
        ino: 1234,
        uid: 50_010,
        pid: 4242,
        mask: AccessMask::WRITE.bits(),
        kind: EVENT_KIND_FILE,
        verdict: Verdict::Deny as u8,
        reason: Reason::WriteNotGranted as u8,
        ..DecisionEvent::default()
    };
    let line = TraceLine(&event).to_string();
    assert!(line.starts_with("[1.500000000] DENY"));
    assert!(line.contains("uid=50010"));
    assert!(line.contains("dev=0x801 ino=1234 mask=w"));
    assert!(line.ends_with(&format!("({})", Reason::WriteNotGranted.as_str())));
}

#[test]
fn test_connect_event_line() {
    let event = DecisionEvent {
        uid: 50_020,
        addr: u32::from_ne_bytes([93, 184, 216, 34]),
        port: 443,
        kind: EVENT_KIND_CONNECT,
        verdict: Verdict::Allow as u8,
        reason: Reason::Granted as u8,
        ..DecisionEvent::default()
    };
    let line = TraceLine(&event).to_string();
    assert!(line.contains("ALLOW"));
    assert!(line.contains("connect 93.184.216.34:443"));
}

#[test]
fn test_bpf_lsm_detection() {
    assert!(lists_bpf_lsm("lockdown,capability,landlock,yama,apparmor,bpf\n"));
    assert!(lists_bpf_lsm("bpf"));
    assert!(!lists_bpf_lsm("lockdown,capability,yama,apparmor"));
    assert!(!lists_bpf_lsm("bpfilter"));
    assert!(!lists_bpf_lsm(""));
}

#[test]
fn test_link_pin_paths() {
    assert_eq!(
        link_pin_path(Path::new("/sys/fs/bpf/aid"), "file_permission"),
        PathBuf::from("/sys/fs/bpf/aid/file_permission_link")
    );
}

#[test]
fn test_trace_limit() {
    assert!(limit_reached(0, Some(0)));
    assert!(!limit_reached(0, Some(1)));
    assert!(limit_reached(1, Some(1)));
    assert!(!limit_reached(2, Some(3)));
    assert!(limit_reached(3, Some(3)));
    assert!(!limit_reached(0, None));
    assert!(!limit_reached(usize::MAX, None));
}
