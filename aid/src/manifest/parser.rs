// aid/src/manifest/parser.rs

use std::path::Path;

use super::Manifest;
use crate::error::{AidError, Result};

pub fn load_manifest_from_file(path: &Path) -> Result<Manifest> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        AidError::Manifest(format!("failed to read {}: {}", path.display(), e))
    })?;
    parse_manifest(&contents)
        .map_err(|e| AidError::Manifest(format!("{}: {}", path.display(), e)))
}

/// Parses and validates a manifest document.
pub fn parse_manifest(contents: &str) -> std::result::Result<Manifest, String> {
    let manifest: Manifest = serde_yaml::from_str(contents).map_err(|e| e.to_string())?;
    validate_agent_name(&manifest.agentname)?;
    Ok(manifest)
}

/// Agent names end up in an account name, so they are restricted to what
/// `useradd` accepts everywhere.
pub fn validate_agent_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("agentname is required".to_string());
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(format!(
            "agentname '{}' contains invalid character '{}'",
            name, bad
        ));
    }
    if name.starts_with('-') {
        return Err(format!("agentname '{}' must not start with '-'", name));
    }
    Ok(())
}
