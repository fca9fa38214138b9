//! CLI module for the countdown timer.
//!
//! This module provides the command-line interface:
//! - `commands`: Command definitions using clap derive
//! - `context`: Config directory, settings and engine wiring
//! - `display`: Output formatting and display logic
//! - `session`: The interactive countdown session

pub mod commands;
pub mod context;
pub mod display;
pub mod session;

pub use commands::{Cli, Commands, RunArgs, SoundCommand, ThemeArg};
pub use context::{AppContext, EngineParts};
pub use display::Display;
pub use session::{play_preview, run_session, SessionCommand};
