//! CLI subcommand implementations.

pub mod export;
pub mod logs;
pub mod report;
pub mod sections;
mod util;

pub use util::{load_run, parse_window};
