// src/tests/test_identity.rs

use crate::error::AidError;
use crate::identity::{MAX_ACCOUNT_NAME_LEN, account_name, check_range, find_free_uid, useradd_args};
use aid_common::{AGENT_UID_BASE, AGENT_UID_MAX};
use std::path::Path;

#[test]
fn test_account_name() {
    assert_eq!(account_name("agent_", "mailer").unwrap(), "agent_mailer");
    assert!(account_name("agent_", "").is_err());
    assert!(account_name("agent_", "mail er").is_err());
    assert!(account_name("agent_", "root;id").is_err());

    let longest = "a".repeat(MAX_ACCOUNT_NAME_LEN - "agent_".len());
    assert!(account_name("agent_", &longest).is_ok());
    let too_long = format!("{}a", longest);
    assert!(matches!(
        account_name("agent_", &too_long),
        Err(AidError::Identity(_))
    ));
}

#[test]
fn test_range_check() {
    assert!(check_range("agent_a", AGENT_UID_BASE).is_ok());
    assert!(check_range("agent_a", AGENT_UID_MAX - 1).is_ok());
    assert!(check_range("agent_a", AGENT_UID_MAX).is_err());
    assert!(check_range("agent_a", 1000).is_err());
    assert!(check_range("agent_a", 0).is_err());
}

#[test]
fn test_lowest_free_uid_is_chosen() {
    let taken = [AGENT_UID_BASE, AGENT_UID_BASE + 1, AGENT_UID_BASE + 3];
    let uid = find_free_uid(|uid| Ok(taken.contains(&uid))).unwrap();
    assert_eq!(uid, Some(AGENT_UID_BASE + 2));

    assert_eq!(find_free_uid(|_| Ok(false)).unwrap(), Some(AGENT_UID_BASE));
}

#[test]
fn test_exhausted_range() {
    assert_eq!(find_free_uid(|_| Ok(true)).unwrap(), None);
}

#[test]
fn test_lookup_errors_propagate() {
    let result = find_free_uid(|_| Err(AidError::Identity("passwd unreadable".to_string())));
    assert!(result.is_err());
}

#[test]
fn test_useradd_arguments() {
    let args = useradd_args(Path::new("/usr/sbin/nologin"), "agent_mailer", 50_004);
    assert_eq!(
        args,
        vec![
            "-r",
            "-M",
            "-s",
            "/usr/sbin/nologin",
            "-u",
            "50004",
            "agent_mailer"
        ]
    );
}
