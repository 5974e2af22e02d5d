// aid/src/manifest/mod.rs

use serde::{Deserialize, Deserializer, Serialize};

pub mod compiler;
pub mod parser;

/// Agent manifest as written by an operator.
///
/// Only the `files` and `network` permission kinds exist; any other key under
/// `permissions` is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub agentname: String,
    #[serde(default)]
    pub permissions: Permissions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub files: Vec<FileRule>,
    #[serde(default)]
    pub network: Vec<NetworkRule>,
}

/// A glob pattern and the grants every match receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRule {
    #[serde(default)]
    pub path: String,
    #[serde(default, deserialize_with = "flag")]
    pub read: bool,
    #[serde(default, deserialize_with = "flag")]
    pub write: bool,
}

/// One IPv4 destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRule {
    pub address: String,
    pub port: u16,
    #[serde(default = "default_connect", deserialize_with = "flag")]
    pub connect: bool,
}

fn default_connect() -> bool {
    true
}

/// Accepts `true`/`false`, `1`/`0` and the quoted spellings of either.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Int(i) => Ok(i != 0),
        Flag::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected a boolean, got '{}'",
                other
            ))),
        },
    }
}
