// aid/src/commands/trace.rs

use crate::config::AidConfig;
use crate::error::Result;
use crate::trace::{TraceLine, TraceReader};

pub fn handle_trace(config: &AidConfig, count: Option<usize>) -> Result<()> {
    let mut reader = TraceReader::open(&config.pin_dir)?;
    let flags = config.enforcement;
    if !flags.trace_denials && !flags.trace_allows {
        log::warn!("Tracing is disabled in the configuration; no events will arrive");
    }
    reader.follow(count, |event| println!("{}", TraceLine(event)));
    Ok(())
}
