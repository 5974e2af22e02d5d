// aid/src/config.rs
//!
//! Control-plane configuration.
//!
//! Read once at startup from `$AID_CONFIG` or `/etc/aid/aid.yaml`. A missing
//! file means defaults, so a fresh host needs no configuration at all.

use aid_common::EngineFlags;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AidError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/aid/aid.yaml";
pub const CONFIG_PATH_ENV: &str = "AID_CONFIG";
pub const PIN_DIR_ENV: &str = "AID_PIN_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AidConfig {
    /// bpffs directory holding the pinned maps and links (default: /sys/fs/bpf/aid)
    pub pin_dir: PathBuf,
    /// Prefix prepended to an agent name to form its account (default: agent_)
    pub user_prefix: String,
    /// Login shell for created agent accounts (default: /usr/sbin/nologin)
    pub nologin_shell: PathBuf,
    /// useradd binary (default: /usr/sbin/useradd)
    pub useradd_path: PathBuf,
    pub enforcement: EnforcementConfig,
}

impl Default for AidConfig {
    fn default() -> Self {
        Self {
            pin_dir: PathBuf::from("/sys/fs/bpf/aid"),
            user_prefix: "agent_".to_string(),
            nologin_shell: PathBuf::from("/usr/sbin/nologin"),
            useradd_path: PathBuf::from("/usr/sbin/useradd"),
            enforcement: EnforcementConfig::default(),
        }
    }
}

/// Engine switches. Everything but denial tracing is off by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnforcementConfig {
    /// Let a file with no entry of its own use its parent directory's entry.
    pub directory_inheritance: bool,
    /// Make `addagent` also register the parent directory of every match.
    pub grant_parent_dirs: bool,
    pub trace_denials: bool,
    pub trace_allows: bool,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            directory_inheritance: false,
            grant_parent_dirs: false,
            trace_denials: true,
            trace_allows: false,
        }
    }
}

impl EnforcementConfig {
    /// The flag word the loader writes into the kernel config map.
    /// `grant_parent_dirs` is a compile-time option and has no bit.
    pub fn engine_flags(&self) -> EngineFlags {
        EngineFlags::empty()
            .with(EngineFlags::DIRECTORY_INHERITANCE, self.directory_inheritance)
            .with(EngineFlags::TRACE_DENIALS, self.trace_denials)
            .with(EngineFlags::TRACE_ALLOWS, self.trace_allows)
    }
}

impl AidConfig {
    /// Loads the configuration, honouring `$AID_CONFIG` and `$AID_PIN_DIR`.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut config = Self::load_from(&path)?;
        if let Some(pin_dir) = std::env::var_os(PIN_DIR_ENV) {
            config.pin_dir = PathBuf::from(pin_dir);
        }
        Ok(config)
    }

    /// Loads from an explicit path. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AidError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::parse(&contents)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.pin_dir.is_absolute() {
            return Err(AidError::Config(format!(
                "pin_dir must be absolute, got {}",
                self.pin_dir.display()
            )));
        }
        if self.user_prefix.is_empty() {
            return Err(AidError::Config("user_prefix must not be empty".to_string()));
        }
        Ok(())
    }
}
