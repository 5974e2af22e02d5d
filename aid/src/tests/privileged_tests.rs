//! Tests against a real kernel. They need root, a bpffs mount, the BPF LSM
//! and a probe object; run them with `--ignored`.

use crate::commands::check::{evaluate_connect, evaluate_file};
use crate::loader::{self, LsmLoader};
use crate::manifest::compiler::CompileOptions;
use crate::store::{PinnedStore, PolicyStore};
use super::fixtures::{AGENT_UID, ManifestBuilder, Workspace};
use aid_common::{AccessMask, Destination, EngineFlags, Reason};
use std::path::PathBuf;

fn skip_reason() -> Option<String> {
    if unsafe { libc::geteuid() } != 0 {
        return Some("not root".to_string());
    }
    if let Err(e) = loader::check_bpf_lsm() {
        return Some(e.to_string());
    }
    if loader::builtin_object().is_none() && std::env::var_os("AID_TEST_OBJECT").is_none() {
        return Some("no probe object (build with --features ebpf or set AID_TEST_OBJECT)".to_string());
    }
    None
}

fn object_path() -> PathBuf {
    std::env::var_os("AID_TEST_OBJECT")
        .map(PathBuf::from)
        .or_else(loader::builtin_object)
        .expect("object checked in skip_reason")
}

#[test]
#[ignore]
fn test_privileged_load_install_and_reset() {
    if let Some(reason) = skip_reason() {
        println!("Skipping privileged test ({})", reason);
        return;
    }

    let pin_dir = PathBuf::from(format!("/sys/fs/bpf/aid-test-{}", std::process::id()));
    let mut lsm = LsmLoader::new(&pin_dir, EngineFlags::TRACE_DENIALS);
    lsm.load_file(&object_path()).expect("Failed to load object");
    lsm.write_engine_flags().expect("Failed to write flags");
    lsm.attach_programs().expect("Failed to attach programs");
    assert!(loader::is_attached(&pin_dir));

    let ws = Workspace::new();
    let notes = ws.file("notes.txt", "hello");
    let compiled = ManifestBuilder::new("privtest")
        .file(&notes, true, false)
        .connect("127.0.0.1", 8080, true)
        .build()
        .compile(CompileOptions::default())
        .expect("Failed to compile");

    let mut store = PinnedStore::open(&pin_dir).expect("Failed to open pinned store");
    compiled.install(AGENT_UID, &mut store).expect("Failed to install");
    assert!(!store.file_entries().unwrap().is_empty());
    assert_eq!(store.engine_flags().unwrap(), EngineFlags::TRACE_DENIALS);

    let decision = evaluate_file(&store, EngineFlags::empty(), AGENT_UID, &notes, AccessMask::READ)
        .expect("Failed to evaluate");
    assert_eq!(decision.reason, Reason::Granted);
    let decision = evaluate_connect(&store, AGENT_UID, &Destination::ipv4([127, 0, 0, 1], 8080));
    assert!(decision.is_allowed());

    let removed = loader::reset(&pin_dir).expect("Failed to reset");
    assert!(removed.len() >= 6);
    assert!(!pin_dir.exists());
    assert!(PinnedStore::open(&pin_dir).is_err());
}
