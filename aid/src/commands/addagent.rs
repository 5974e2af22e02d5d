// aid/src/commands/addagent.rs

use std::path::Path;

use aid_common::AGENT_UID_BASE;
use nix::unistd::User;

use crate::commands::dump::{collect_dump, render_text};
use crate::config::AidConfig;
use crate::error::{AidError, Result};
use crate::identity;
use crate::launcher::require_root;
use crate::logging::LogLevel;
use crate::manifest::compiler::{CompileOptions, CompiledManifest};
use crate::manifest::parser::load_manifest_from_file;
use crate::store::{MemoryStore, PinnedStore};

pub fn handle_addagent(config: &AidConfig, manifest_path: &Path, dry_run: bool) -> Result<()> {
    if !dry_run {
        require_root("addagent")?;
    }

    let manifest = load_manifest_from_file(manifest_path)?;
    let options = CompileOptions {
        grant_parent_dirs: config.enforcement.grant_parent_dirs,
    };
    let compiled = manifest.compile(options).map_err(AidError::Manifest)?;
    for warning in &compiled.warnings {
        policy_log!(LogLevel::Warn, "{}", warning);
    }

    if dry_run {
        return preview(config, &compiled);
    }

    // No account is created unless the store is loaded.
    let mut store = PinnedStore::open(&config.pin_dir)?;
    let account = identity::ensure_agent(config, &manifest.agentname)?;

    let report = compiled.install(account.uid, &mut store)?;
    policy_log!(
        LogLevel::Info,
        "Installed {} file and {} socket entries for {}",
        report.files,
        report.sockets,
        account.account
    );

    println!(
        "Agent '{}' ready: user {} (uid {}), {} file entries, {} socket entries",
        account.agentname, account.account, account.uid, report.files, report.sockets
    );
    if !compiled.warnings.is_empty() {
        println!("{} warnings, see log output", compiled.warnings.len());
    }
    Ok(())
}

/// Installs into a scratch store with the kernel table bounds and prints it.
fn preview(config: &AidConfig, compiled: &CompiledManifest) -> Result<()> {
    let account = identity::account_name(&config.user_prefix, &compiled.agentname)?;
    let uid = match User::from_name(&account)? {
        Some(user) => user.uid.as_raw(),
        None => {
            println!("User {} does not exist yet; showing uid {}", account, AGENT_UID_BASE);
            AGENT_UID_BASE
        }
    };

    let mut store = MemoryStore::new();
    compiled.install(uid, &mut store)?;
    print!("{}", render_text(&collect_dump(&store, true)?));
    Ok(())
}
