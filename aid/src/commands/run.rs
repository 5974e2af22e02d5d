// aid/src/commands/run.rs

use crate::config::AidConfig;
use crate::error::Result;
use crate::identity::lookup_agent;
use crate::launcher::exec_as_agent;

pub fn handle_run(config: &AidConfig, agentname: &str, command: &[String]) -> Result<()> {
    let account = lookup_agent(config, agentname)?;
    match exec_as_agent(&account, command)? {}
}
