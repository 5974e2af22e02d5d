#[macro_use]
mod logging;
mod cli;
mod commands;
mod config;
mod error;
mod identity;
mod inode;
mod launcher;
mod loader;
mod manifest;
mod store;
mod trace;

#[cfg(test)]
mod tests;

use clap::Parser;
use cli::{Cli, Commands};
use config::AidConfig;
use logging::{init_logging, parse_level};

fn main() {
    let cli = Cli::parse();

    let log_level = parse_level(&cli.log_level);
    if let Err(e) = init_logging(log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let config = match AidConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    log::debug!("Pin directory: {}", config.pin_dir.display());

    let result = match &cli.command {
        Commands::Load { object } => commands::handle_load(&config, object.as_deref()),
        Commands::Reset => commands::handle_reset(&config),
        Commands::AddAgent { manifest, dry_run } => {
            commands::handle_addagent(&config, manifest, *dry_run)
        }
        Commands::Run { agentname, command } => commands::handle_run(&config, agentname, command),
        Commands::Dump(args) => commands::handle_dump(&config, args.sockets, args.format),
        Commands::Stat { path } => commands::handle_stat(path),
        Commands::Check(args) => {
            let mask = commands::check::requested_mask(args.read, args.write, args.exec);
            commands::handle_check(&config, &args.agentname, &args.path, mask).map(exit_on_deny)
        }
        Commands::CheckConnect { agentname, target } => {
            commands::handle_check_connect(&config, agentname, target).map(exit_on_deny)
        }
        Commands::Trace { count } => commands::handle_trace(&config, *count),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn exit_on_deny(allowed: bool) {
    if !allowed {
        std::process::exit(1);
    }
}
