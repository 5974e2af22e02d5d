//! Starts a command under an agent identity.
//!
//! Privileges are dropped in the only order that works: supplementary groups,
//! then the group, then the user. Once `setuid` succeeds the process can no
//! longer change its gid.

use std::convert::Infallible;
use std::ffi::CString;

use nix::unistd::{Uid, execvp, setgid, setgroups, setuid};

use crate::error::{AidError, Result};
use crate::identity::{AgentAccount, check_range, primary_gid};
use crate::logging::LogLevel;

pub fn require_root(action: &str) -> Result<()> {
    if !Uid::effective().is_root() {
        return Err(AidError::Permission(format!("{} must be run as root", action)));
    }
    Ok(())
}

fn to_cstrings(command: &[String]) -> Result<Vec<CString>> {
    command
        .iter()
        .map(|arg| {
            CString::new(arg.as_str())
                .map_err(|_| AidError::Launch(format!("argument '{}' contains a NUL byte", arg)))
        })
        .collect()
}

/// Replaces the current process with `command` running as `account`.
/// Only returns on failure.
pub fn exec_as_agent(account: &AgentAccount, command: &[String]) -> Result<Infallible> {
    check_range(&account.account, account.uid)?;
    require_root("run")?;

    let argv = to_cstrings(command)?;
    let program = argv
        .first()
        .ok_or_else(|| AidError::Launch("no command given".to_string()))?;

    setgroups(&[])
        .map_err(|e| AidError::Launch(format!("setgroups failed: {}", e)))?;
    setgid(primary_gid(account))
        .map_err(|e| AidError::Launch(format!("setgid({}) failed: {}", account.gid, e)))?;
    setuid(Uid::from_raw(account.uid))
        .map_err(|e| AidError::Launch(format!("setuid({}) failed: {}", account.uid, e)))?;

    identity_log!(
        LogLevel::Info,
        "Executing as {} (uid {}): {}",
        account.account,
        account.uid,
        command.join(" ")
    );

    execvp(program, &argv)
        .map_err(|e| AidError::Launch(format!("exec {} failed: {}", program.to_string_lossy(), e)))
}
