//! Agent accounts.
//!
//! An agent is a system account `<prefix><agentname>` whose uid lies in the
//! reserved range. The uid is the agent's identity everywhere: policy keys,
//! probe checks and the launcher all go through it.

use std::path::Path;
use std::process::Command;

use aid_common::{AGENT_UID_BASE, AGENT_UID_MAX, is_agent};
use nix::unistd::{Gid, Uid, User};

use crate::config::AidConfig;
use crate::error::{AidError, Result};
use crate::logging::LogLevel;
use crate::manifest::parser::validate_agent_name;

/// `useradd` refuses longer names on most distributions.
pub const MAX_ACCOUNT_NAME_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentAccount {
    pub agentname: String,
    pub account: String,
    pub uid: u32,
    pub gid: u32,
}

/// `<prefix><agentname>`, validated.
pub fn account_name(prefix: &str, agentname: &str) -> Result<String> {
    validate_agent_name(agentname).map_err(AidError::Identity)?;
    let account = format!("{}{}", prefix, agentname);
    if account.len() > MAX_ACCOUNT_NAME_LEN {
        return Err(AidError::Identity(format!(
            "account name '{}' is longer than {} characters",
            account, MAX_ACCOUNT_NAME_LEN
        )));
    }
    Ok(account)
}

pub fn check_range(account: &str, uid: u32) -> Result<()> {
    if !is_agent(uid) {
        return Err(AidError::Identity(format!(
            "user '{}' has uid {} outside the agent range {}-{}",
            account,
            uid,
            AGENT_UID_BASE,
            AGENT_UID_MAX - 1
        )));
    }
    Ok(())
}

/// Resolves an existing agent. Never creates anything.
pub fn lookup_agent(config: &AidConfig, agentname: &str) -> Result<AgentAccount> {
    let account = account_name(&config.user_prefix, agentname)?;
    let user = User::from_name(&account)?
        .ok_or_else(|| AidError::Identity(format!("user '{}' does not exist", account)))?;
    let uid = user.uid.as_raw();
    check_range(&account, uid)?;
    Ok(AgentAccount {
        agentname: agentname.to_string(),
        account,
        uid,
        gid: user.gid.as_raw(),
    })
}

/// Returns the agent's account, creating it with the lowest free uid when it
/// does not exist yet.
pub fn ensure_agent(config: &AidConfig, agentname: &str) -> Result<AgentAccount> {
    let account = account_name(&config.user_prefix, agentname)?;
    if let Some(user) = User::from_name(&account)? {
        let uid = user.uid.as_raw();
        check_range(&account, uid)?;
        identity_log!(LogLevel::Info, "Using existing user {} (uid {})", account, uid);
        return Ok(AgentAccount {
            agentname: agentname.to_string(),
            account,
            uid,
            gid: user.gid.as_raw(),
        });
    }

    let uid = find_free_uid(|uid| Ok(User::from_uid(Uid::from_raw(uid))?.is_some()))?
        .ok_or_else(|| {
            AidError::Identity(format!(
                "no free uid in the agent range {}-{}",
                AGENT_UID_BASE,
                AGENT_UID_MAX - 1
            ))
        })?;

    create_account(&config.useradd_path, &config.nologin_shell, &account, uid)?;

    let user = User::from_name(&account)?.ok_or_else(|| {
        AidError::Identity(format!("user '{}' missing after useradd", account))
    })?;
    identity_log!(LogLevel::Info, "Created user {} (uid {})", account, uid);
    Ok(AgentAccount {
        agentname: agentname.to_string(),
        account,
        uid: user.uid.as_raw(),
        gid: user.gid.as_raw(),
    })
}

/// Lowest uid in the agent range for which `is_taken` says no.
pub fn find_free_uid<F>(mut is_taken: F) -> Result<Option<u32>>
where
    F: FnMut(u32) -> Result<bool>,
{
    for uid in AGENT_UID_BASE..AGENT_UID_MAX {
        if !is_taken(uid)? {
            return Ok(Some(uid));
        }
    }
    Ok(None)
}

/// Arguments passed to `useradd`: system account, no home, no login shell.
pub fn useradd_args(shell: &Path, account: &str, uid: u32) -> Vec<String> {
    vec![
        "-r".to_string(),
        "-M".to_string(),
        "-s".to_string(),
        shell.display().to_string(),
        "-u".to_string(),
        uid.to_string(),
        account.to_string(),
    ]
}

fn create_account(useradd: &Path, shell: &Path, account: &str, uid: u32) -> Result<()> {
    let args = useradd_args(shell, account, uid);
    identity_log!(
        LogLevel::Debug,
        "Running {} {}",
        useradd.display(),
        args.join(" ")
    );
    let status = Command::new(useradd).args(&args).status().map_err(|e| {
        AidError::Identity(format!("failed to run {}: {}", useradd.display(), e))
    })?;
    if !status.success() {
        return Err(AidError::Identity(format!(
            "useradd for '{}' failed with {}",
            account, status
        )));
    }
    Ok(())
}

/// Primary group of a looked-up account.
pub fn primary_gid(account: &AgentAccount) -> Gid {
    Gid::from_raw(account.gid)
}
