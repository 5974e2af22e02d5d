// aid/src/commands/mod.rs

pub mod addagent;
pub mod check;
pub mod dump;
pub mod load;
pub mod run;
pub mod stat;
pub mod trace;

pub use addagent::handle_addagent;
pub use check::{handle_check, handle_check_connect};
pub use dump::handle_dump;
pub use load::{handle_load, handle_reset};
pub use run::handle_run;
pub use stat::handle_stat;
pub use trace::handle_trace;
