//! Property-based tests for AID
//!
//! These tests use proptest to check the engine invariants over randomized
//! identities, masks and file metadata.

use proptest::prelude::*;

use crate::manifest::parser::validate_agent_name;
use crate::store::{MemoryStore, PolicyStore};
use aid_common::device::{kernel_encode, kernel_to_legacy, legacy_encode};
use aid_common::{
    AGENT_UID_BASE, AGENT_UID_MAX, AccessMask, ConnectPolicy, Destination, EngineFlags,
    FileAccessPolicy, FileKey, FileMeta, FilePerm, Reason, Verdict,
};

const REGULAR: u16 = 0o100_000;
const DIRECTORY: u16 = 0o040_000;

fn non_agent_uid() -> impl Strategy<Value = u32> {
    prop_oneof![0u32..AGENT_UID_BASE, AGENT_UID_MAX..=u32::MAX]
}

fn agent_uid() -> impl Strategy<Value = u32> {
    AGENT_UID_BASE..AGENT_UID_MAX
}

/// Regular files and directories with any permission bits.
fn grantable_mode() -> impl Strategy<Value = u16> {
    (prop::sample::select(vec![REGULAR, DIRECTORY]), 0u16..0o7777).prop_map(|(t, p)| t | p)
}

fn any_meta() -> impl Strategy<Value = FileMeta> {
    (any::<u32>(), any::<u64>(), any::<u16>()).prop_map(|(dev, ino, mode)| FileMeta::new(dev, ino, mode))
}

proptest! {
    #[test]
    fn non_agents_are_always_allowed(
        uid in non_agent_uid(),
        meta in any_meta(),
        mask in 0u32..16,
        flags in 0u32..8,
    ) {
        let store = MemoryStore::new();
        let engine = FileAccessPolicy::new(&store, EngineFlags::from_bits_truncate(flags));
        let decision = engine.decide(uid, Some(&meta), AccessMask::from_bits(mask));
        prop_assert_eq!(decision.reason, Reason::NotAgent);
        prop_assert_eq!(decision.verdict.retval(), 0);

        let dest = Destination::ipv4([10, 0, 0, 1], 443);
        prop_assert!(ConnectPolicy::new(&store).decide(uid, Some(&dest)).is_allowed());
    }

    #[test]
    fn agents_are_denied_by_default(
        uid in agent_uid(),
        dev in any::<u32>(),
        ino in any::<u64>(),
        perms in 0u16..0o7777,
        want_write in any::<bool>(),
    ) {
        // Non-executable regular file, so only the table can grant a read.
        let meta = FileMeta::new(dev, ino, REGULAR | (perms & !0o111));
        let mask = if want_write { AccessMask::WRITE } else { AccessMask::READ };
        let store = MemoryStore::new();
        let decision = FileAccessPolicy::new(&store, EngineFlags::empty()).decide(uid, Some(&meta), mask);
        prop_assert_eq!(decision.verdict, Verdict::Deny);
        prop_assert_eq!(decision.verdict.retval(), -13);

        let dest = Destination::ipv4([93, 184, 216, 34], 443);
        prop_assert_eq!(ConnectPolicy::new(&store).decide(uid, Some(&dest)).verdict, Verdict::Deny);
    }

    #[test]
    fn execute_is_always_allowed(
        uid in agent_uid(),
        dev in any::<u32>(),
        ino in any::<u64>(),
        mode in grantable_mode(),
        extra in 0u32..16,
        grant in prop::option::of((any::<bool>(), any::<bool>())),
    ) {
        let meta = FileMeta::new(dev, ino, mode);
        let mask = AccessMask::from_bits(extra) | AccessMask::EXEC;
        let mut store = MemoryStore::new();
        if let Some((read, write)) = grant {
            store
                .upsert_file(FileKey::new(kernel_to_legacy(dev), ino, uid), FilePerm::new(read, write))
                .unwrap();
        }
        let decision = FileAccessPolicy::new(&store, EngineFlags::empty()).decide(uid, Some(&meta), mask);
        prop_assert!(decision.is_allowed());
    }

    #[test]
    fn device_encodings_agree(major in 0u32..4096, minor in 0u32..256) {
        prop_assert_eq!(kernel_to_legacy(kernel_encode(major, minor)), legacy_encode(major, minor));
    }

    #[test]
    fn stored_grant_is_honoured(
        uid in agent_uid(),
        major in 0u32..256,
        minor in 0u32..256,
        ino in any::<u64>(),
        read in any::<bool>(),
        write in any::<bool>(),
    ) {
        let mut store = MemoryStore::new();
        store
            .upsert_file(FileKey::new(legacy_encode(major, minor), ino, uid), FilePerm::new(read, write))
            .unwrap();
        let meta = FileMeta::new(kernel_encode(major, minor), ino, REGULAR | 0o644);
        let engine = FileAccessPolicy::new(&store, EngineFlags::empty());

        prop_assert_eq!(engine.decide(uid, Some(&meta), AccessMask::READ).is_allowed(), read);
        prop_assert_eq!(engine.decide(uid, Some(&meta), AccessMask::WRITE).is_allowed(), write);
    }

    #[test]
    fn table_never_exceeds_capacity(inos in prop::collection::vec(0u64..64, 0..200)) {
        let mut store = MemoryStore::with_capacity(16, 16);
        for ino in inos {
            let _ = store.upsert_file(FileKey::new(1, ino, AGENT_UID_BASE), FilePerm::new(true, false));
        }
        prop_assert!(store.file_entries().unwrap().len() <= 16);
    }

    #[test]
    fn agent_name_validation_never_panics(name in "\\PC*") {
        let _ = validate_agent_name(&name);
    }

    #[test]
    fn valid_agent_names_accepted(name in "[A-Za-z0-9_][A-Za-z0-9_-]{0,20}") {
        prop_assert!(validate_agent_name(&name).is_ok());
    }
}
