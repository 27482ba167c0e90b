//! TUI debugger.
//!
//! Provides an interactive terminal-based debugger with:
//! - Paired, CPU-only and RAM-only ticks
//! - Register, flag, pipeline and bus panes
//! - Scrollable RAM view
//! - Run/pause with IP breakpoints

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
