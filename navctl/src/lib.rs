//! `starnav` operator tool.
//!
//! Replays operation scripts through a single conversation engine and
//! reports every decision. Useful for checking a flight config's call
//! sequence against the enforcement rules without a live transport.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod cli;
pub mod replay;
pub mod script;

pub use cli::{Cli, Command, ConfigArgs, ReplayArgs};
pub use replay::{ReplayReport, StepOutcome, replay};
pub use script::{ScriptLine, ScriptStep, parse_line, parse_script};
