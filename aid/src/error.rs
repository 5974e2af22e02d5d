// aid/src/error.rs

use std::io;

use thiserror::Error;

use crate::loader::BpfError;
use crate::store::StoreError;

/// Control-plane errors. Every one of them ends the process with exit code 1;
/// nothing is retried.
#[derive(Debug, Error)]
pub enum AidError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Manifest error: {0}")]
    Manifest(String),
    #[error("Identity error: {0}")]
    Identity(String),
    /// Store writes failing here leave the agent partially provisioned.
    #[error("Policy store error: {0}")]
    Store(#[from] StoreError),
    #[error("eBPF error: {0}")]
    Bpf(#[from] BpfError),
    #[error("Launch error: {0}")]
    Launch(String),
    #[error("Permission error: {0}")]
    Permission(String),
}

impl From<nix::Error> for AidError {
    fn from(err: nix::Error) -> Self {
        AidError::Io(io::Error::from(err))
    }
}

impl From<serde_yaml::Error> for AidError {
    fn from(err: serde_yaml::Error) -> Self {
        AidError::Config(format!("YAML parsing error: {}", err))
    }
}

/// Result type for control-plane operations
pub type Result<T> = std::result::Result<T, AidError>;
