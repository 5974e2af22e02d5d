// aid/src/commands/stat.rs

use std::path::Path;

use crate::error::Result;
use crate::inode::InodeInfo;

pub fn handle_stat(path: &Path) -> Result<()> {
    let info = InodeInfo::stat(path)?;
    println!("{}", info);
    Ok(())
}
