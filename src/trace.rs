//! Diagnostic trace categories.
//!
//! Every component logs through `tracing` under its own target. Turning a
//! category on or off is a subscriber filter decision made by the host;
//! the simulated state never depends on it.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Target for the tick orchestrator.
pub const ORCHESTRATOR: &str = "minicomp::computer";
/// Target for the CPU pipeline state machine.
pub const PIPELINE: &str = "minicomp::pipeline";
/// Target for the opcode table and instruction handlers.
pub const COMMANDS: &str = "minicomp::commands";
/// Target for ALU primitives.
pub const ALU: &str = "minicomp::alu";
/// Target for the RAM bus responder.
pub const RAM: &str = "minicomp::ram";
/// Target for individual memory reads and writes.
pub const MEMORY: &str = "minicomp::memory";

/// A trace category that can be enabled independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceCategory {
    Orchestrator,
    Pipeline,
    Commands,
    Alu,
    Ram,
    Memory,
}

impl TraceCategory {
    /// All categories.
    pub const ALL: [TraceCategory; 6] = [
        TraceCategory::Orchestrator,
        TraceCategory::Pipeline,
        TraceCategory::Commands,
        TraceCategory::Alu,
        TraceCategory::Ram,
        TraceCategory::Memory,
    ];

    /// The `tracing` target this category logs under.
    pub const fn target(self) -> &'static str {
        match self {
            TraceCategory::Orchestrator => ORCHESTRATOR,
            TraceCategory::Pipeline => PIPELINE,
            TraceCategory::Commands => COMMANDS,
            TraceCategory::Alu => ALU,
            TraceCategory::Ram => RAM,
            TraceCategory::Memory => MEMORY,
        }
    }

    /// Short name used on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            TraceCategory::Orchestrator => "computer",
            TraceCategory::Pipeline => "pipeline",
            TraceCategory::Commands => "commands",
            TraceCategory::Alu => "alu",
            TraceCategory::Ram => "ram",
            TraceCategory::Memory => "memory",
        }
    }
}

impl fmt::Display for TraceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TraceCategory {
    type Err = TraceCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        TraceCategory::ALL
            .into_iter()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| TraceCategoryError::Unknown(s.to_string()))
    }
}

/// Build an `EnvFilter`-style directive string enabling the given
/// categories at TRACE level and everything else at WARN.
pub fn filter_directives(categories: &[TraceCategory]) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(categories.iter().map(|c| format!("{}=trace", c.target())));
    directives.join(",")
}

/// Errors parsing a trace category name.
#[derive(Debug, Clone, Error)]
pub enum TraceCategoryError {
    #[error("unknown trace category '{0}' (expected one of: computer, pipeline, commands, alu, ram, memory)")]
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for category in TraceCategory::ALL {
            assert_eq!(category.name().parse::<TraceCategory>().unwrap(), category);
        }
        assert_eq!(" ALU ".parse::<TraceCategory>().unwrap(), TraceCategory::Alu);
    }

    #[test]
    fn test_parse_unknown() {
        assert!("disk".parse::<TraceCategory>().is_err());
    }

    #[test]
    fn test_filter_directives() {
        assert_eq!(filter_directives(&[]), "warn");
        assert_eq!(
            filter_directives(&[TraceCategory::Pipeline, TraceCategory::Ram]),
            "warn,minicomp::pipeline=trace,minicomp::ram=trace"
        );
    }

    #[test]
    fn test_targets_are_distinct() {
        let mut targets: Vec<_> = TraceCategory::ALL.iter().map(|c| c.target()).collect();
        targets.sort();
        targets.dedup();
        assert_eq!(targets.len(), TraceCategory::ALL.len());
    }
}
