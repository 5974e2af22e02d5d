// aid/src/commands/load.rs

use std::path::Path;

use crate::config::AidConfig;
use crate::error::Result;
use crate::launcher::require_root;
use crate::loader::{self, BpfError, LsmLoader};
use crate::logging::LogLevel;

pub fn handle_load(config: &AidConfig, object: Option<&Path>) -> Result<()> {
    require_root("load")?;
    loader::check_bpf_lsm()?;

    let flags = config.enforcement.engine_flags();
    if loader::is_attached(&config.pin_dir) {
        loader::write_pinned_flags(&config.pin_dir, flags)?;
        println!(
            "Already loaded under {}; engine flags updated to {:#x}",
            config.pin_dir.display(),
            flags.bits()
        );
        return Ok(());
    }

    let object = match object {
        Some(path) => path.to_path_buf(),
        None => loader::builtin_object().ok_or(BpfError::NoObject)?,
    };
    bpf_log!(LogLevel::Info, "Using object {}", object.display());

    let mut lsm = LsmLoader::new(&config.pin_dir, flags);
    lsm.load_file(&object)?;
    lsm.write_engine_flags()?;
    let links = lsm.attach_programs()?;

    println!("AID enforcement loaded");
    println!("  Pin directory: {}", config.pin_dir.display());
    for link in links {
        println!("  Link: {}", link.display());
    }
    Ok(())
}

pub fn handle_reset(config: &AidConfig) -> Result<()> {
    require_root("reset")?;
    let removed = loader::reset(&config.pin_dir)?;
    for path in &removed {
        println!("Removed {}", path.display());
    }
    println!(
        "Reset complete: {} pins removed, all policies destroyed",
        removed.len()
    );
    Ok(())
}
