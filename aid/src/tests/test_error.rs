// src/tests/test_error.rs

use crate::error::AidError;
use crate::loader::BpfError;
use crate::store::{StoreError, Table};
use std::error::Error;
use std::io;

#[test]
fn test_error_conversions() {
    let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
    let aid_error: AidError = io_error.into();
    match aid_error {
        AidError::Io(e) => {
            assert_eq!(e.kind(), io::ErrorKind::NotFound);
            assert_eq!(e.to_string(), "File not found");
        }
        _ => panic!("Expected Io variant"),
    }

    let aid_error: AidError = nix::Error::EACCES.into();
    match aid_error {
        AidError::Io(e) => assert_eq!(e.raw_os_error(), Some(libc::EACCES)),
        _ => panic!("Expected Io variant"),
    }

    let store_error = StoreError::CapacityExceeded {
        table: Table::Socket,
        capacity: 4096,
    };
    assert!(matches!(AidError::from(store_error), AidError::Store(_)));

    let yaml_error = serde_yaml::from_str::<u32>("not a number").unwrap_err();
    match AidError::from(yaml_error) {
        AidError::Config(msg) => assert!(msg.starts_with("YAML parsing error")),
        _ => panic!("Expected Config variant"),
    }

    assert!(matches!(
        AidError::from(BpfError::NoObject),
        AidError::Bpf(BpfError::NoObject)
    ));
}

#[test]
fn test_error_display() {
    let error = AidError::Launch("setuid(50010) failed".to_string());
    assert_eq!(error.to_string(), "Launch error: setuid(50010) failed");

    let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "Permission denied");
    let error: AidError = io_error.into();
    assert_eq!(error.to_string(), "IO error: Permission denied");

    let error: AidError = StoreError::CapacityExceeded {
        table: Table::File,
        capacity: 16_384,
    }
    .into();
    assert_eq!(
        error.to_string(),
        "Policy store error: file policy table is full (16384 entries)"
    );

    let error = AidError::from(BpfError::LsmNotActive("lockdown,capability,yama".to_string()));
    assert!(error.to_string().contains("lockdown,capability,yama"));
}

#[test]
fn test_error_source() {
    let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
    let aid_error: AidError = io_error.into();

    assert!(aid_error.source().is_some());
    assert_eq!(aid_error.source().unwrap().to_string(), "File not found");

    let error = AidError::Permission("load must be run as root".to_string());
    assert!(error.source().is_none());
}
