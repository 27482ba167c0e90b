//! minicomp emulator - CLI Entry Point
//!
//! Commands:
//! - `minicomp-emu run <image>` - Run a RAM image until it stops
//! - `minicomp-emu debug <image>` - Interactive debugger
//! - `minicomp-emu disasm <image>` - Disassemble a RAM image

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use minicomp::{Computer, MachineConfig, RamImage, RunOutcome, StopReason, TraceCategory};

#[derive(Parser)]
#[command(name = "minicomp-emu")]
#[command(version = "0.1.0")]
#[command(about = "A cycle-accurate model of a minimal stored-program binary computer")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a RAM image until the machine stops
    Run {
        /// Path to the RAM image
        image: PathBuf,
        /// Maximum number of paired ticks
        #[arg(short, long, default_value = "10000")]
        ticks: u64,
        /// Trace categories to enable (computer, pipeline, commands, alu, ram, memory)
        #[arg(long, value_delimiter = ',')]
        trace: Vec<TraceCategory>,
        /// Machine configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print the final state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive debugger
    Debug {
        /// Path to the RAM image
        image: PathBuf,
        /// Machine configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Disassemble a RAM image
    Disasm {
        /// Path to the RAM image
        image: PathBuf,
        /// Machine configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { image, ticks, trace, config, json }) => {
            init_tracing(&trace);
            run_image(&image, config.as_deref(), ticks, json);
        }
        Some(Commands::Debug { image, config }) => {
            debug_image(&image, config.as_deref());
        }
        Some(Commands::Disasm { image, config }) => {
            disassemble_file(&image, config.as_deref());
        }
        None => {
            init_tracing(&[]);
            println!("minicomp emulator v0.1.0");
            println!("A cycle-accurate minimal stored-program computer");
            println!();
            println!("Use --help for available commands");
            println!();
            run_demo();
        }
    }
}

/// Install the fmt subscriber: `--trace` categories win over `RUST_LOG`.
fn init_tracing(categories: &[TraceCategory]) {
    use tracing_subscriber::EnvFilter;

    let filter = if categories.is_empty() {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    } else {
        EnvFilter::new(minicomp::trace::filter_directives(categories))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {}", message);
    std::process::exit(1);
}

fn load_config(path: Option<&std::path::Path>) -> MachineConfig {
    match path {
        Some(p) => MachineConfig::load(p).unwrap_or_else(|e| fail(format!("failed to load config: {}", e))),
        None => MachineConfig::default(),
    }
}

fn load(image: &std::path::Path, config: Option<&std::path::Path>) -> (MachineConfig, RamImage) {
    let config = load_config(config);
    let image = minicomp::load_image(image, config.word_width)
        .unwrap_or_else(|e| fail(format!("failed to load image: {}", e)));
    (config, image)
}

fn build(config: MachineConfig, image: &RamImage) -> Computer {
    Computer::new(config, image).unwrap_or_else(|e| fail(format!("invalid machine: {}", e)))
}

fn run_image(path: &std::path::Path, config: Option<&std::path::Path>, max_ticks: u64, json: bool) {
    let (config, image) = load(path, config);
    let mut computer = build(config, &image);

    if !json {
        println!("Running: {} ({} words)", path.display(), image.len());
    }

    let outcome = computer.run_until_halt(max_ticks);
    report(&computer, outcome, json);
}

fn report(computer: &Computer, outcome: RunOutcome, json: bool) {
    let snapshot = computer.snapshot();

    if json {
        match serde_json::to_string_pretty(&snapshot) {
            Ok(text) => println!("{}", text),
            Err(e) => fail(e),
        }
        return;
    }

    println!();
    println!("--- Result ---");
    println!("Ticks: {}", outcome.ticks);
    println!("Outcome: {}", outcome.reason.describe());
    println!();
    print!("{}", snapshot);

    if outcome.reason == StopReason::TickLimit {
        println!();
        println!("Reached tick limit ({}). Use --ticks to increase.", outcome.ticks);
    }
}

#[cfg(feature = "tui")]
fn debug_image(path: &std::path::Path, config: Option<&std::path::Path>) {
    let (config, image) = load(path, config);
    let computer = build(config, &image);

    if let Err(e) = minicomp::run_debugger(computer) {
        fail(format!("debugger error: {}", e));
    }
}

#[cfg(not(feature = "tui"))]
fn debug_image(_path: &std::path::Path, _config: Option<&std::path::Path>) {
    fail("built without the `tui` feature");
}

fn disassemble_file(path: &std::path::Path, config: Option<&std::path::Path>) {
    let (_, image) = load(path, config);
    println!("{}", minicomp::disassemble(&image));
}

fn run_demo() {
    let image = minicomp::image::demo();
    let config = MachineConfig::new(minicomp::image::DEMO_WORD_WIDTH, 16, 32);

    println!("--- Demo program ---");
    print!("{}", minicomp::disassemble(&image));
    println!();

    let mut computer = build(config, &image);
    let outcome = computer.run_until_halt(1_000);
    report(&computer, outcome, false);
}
