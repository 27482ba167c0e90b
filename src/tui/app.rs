//! Debugger application state and logic.

use std::collections::HashSet;

use crate::image::{disassemble_lines, RamImage};
use crate::machine::{Computer, PipelineState};

/// Debugger application state.
pub struct DebuggerApp {
    /// The machine being debugged.
    pub computer: Computer,
    /// Breakpoints on IP, checked at Fetch.
    pub breakpoints: HashSet<u64>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// RAM view scroll offset.
    pub mem_scroll: usize,
    /// Let the first tick of a run leave a breakpoint.
    resume: bool,
}

impl DebuggerApp {
    /// Create a debugger around a freshly built machine.
    pub fn new(computer: Computer) -> Self {
        Self {
            computer,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: "Ready. Press 's' to tick, 'r' to run, 'q' to quit.".into(),
            mem_scroll: 0,
            resume: false,
        }
    }

    fn ip(&self) -> u64 {
        self.computer.snapshot().ip
    }

    fn describe_stop(&mut self) {
        let snap = self.computer.snapshot();
        self.running = false;
        self.status = if snap.flags.fatal {
            format!("Fatal fault after {} ticks (IP={:03})", snap.ticks, snap.ip)
        } else if snap.flags.terminated {
            format!("Terminated after {} ticks, {} instructions", snap.ticks, snap.counter)
        } else {
            format!("RAM bus fault at address {}", snap.buses.address)
        };
    }

    /// One paired tick.
    pub fn step(&mut self) {
        if !self.computer.is_running() {
            self.describe_stop();
            return;
        }
        if self.computer.tick(1) {
            let snap = self.computer.snapshot();
            let stage = snap.pipeline_state.map_or("invalid", PipelineState::name);
            self.status = format!("tick {}: next stage {}, IP={:03}", snap.ticks, stage, snap.ip);
        } else {
            self.describe_stop();
        }
    }

    /// Advance only the CPU.
    pub fn step_cpu(&mut self) {
        self.running = false;
        if self.computer.tick_cpu() {
            self.status = "CPU ticked.".into();
        } else {
            self.describe_stop();
        }
    }

    /// Advance only RAM.
    pub fn step_ram(&mut self) {
        self.running = false;
        if self.computer.tick_ram() {
            self.status = "RAM ticked.".into();
        } else {
            self.describe_stop();
        }
    }

    /// Run until termination, a fault, or a breakpoint.
    pub fn run(&mut self) {
        self.running = true;
        self.resume = true;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        let at_fetch = self.computer.pipeline_state() == Some(PipelineState::Fetch);
        let ip = self.ip();
        if at_fetch && !self.resume && self.breakpoints.contains(&ip) {
            self.running = false;
            self.status = format!("Breakpoint at IP={:03}", ip);
            return;
        }
        self.resume = false;

        self.step();
    }

    /// Toggle a breakpoint at the current IP.
    pub fn toggle_breakpoint(&mut self) {
        let ip = self.ip();
        if self.breakpoints.remove(&ip) {
            self.status = format!("Removed breakpoint at IP={:03}", ip);
        } else {
            self.breakpoints.insert(ip);
            self.status = format!("Set breakpoint at IP={:03}", ip);
        }
    }

    /// Reset the machine to its power-on state.
    pub fn reset(&mut self) {
        self.computer.reset();
        self.running = false;
        self.status = "Reset. Ready.".into();
    }

    pub fn scroll_up(&mut self) {
        self.mem_scroll = self.mem_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        if self.mem_scroll + 1 < self.computer.ram_len() {
            self.mem_scroll += 1;
        }
    }

    /// Disassembly around the current IP: `(address, text, is_current)`.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(u64, String, bool)> {
        let image: RamImage = self.computer.ram_image();
        let ip = self.ip();
        let all = disassemble_lines(&image);

        let current = all
            .iter()
            .position(|line| line.address as u64 >= ip)
            .unwrap_or(0);
        let start = current.saturating_sub(lines / 2);

        all.iter()
            .skip(start)
            .take(lines)
            .map(|line| {
                let addr = line.address as u64;
                (addr, line.text(), addr == ip)
            })
            .collect()
    }
}

/// Run the debugger on a machine.
pub fn run_debugger(computer: Computer) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(computer);

    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('c') => app.step_cpu(),
                        KeyCode::Char('m') => app.step_ram(),
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => app.scroll_up(),
                        KeyCode::Down => app.scroll_down(),
                        _ => {}
                    }
                }
            }
        }

        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image;
    use crate::machine::MachineConfig;

    fn app() -> DebuggerApp {
        DebuggerApp::new(Computer::new(MachineConfig::default(), &image::demo()).unwrap())
    }

    #[test]
    fn test_step_advances_one_tick() {
        let mut app = app();
        app.step();
        assert_eq!(app.computer.ticks(), 1);
        assert!(app.status.contains("Decode"));
    }

    #[test]
    fn test_run_to_termination() {
        let mut app = app();
        app.run();
        for _ in 0..1_000 {
            app.tick();
        }
        assert!(!app.running);
        assert!(app.status.starts_with("Terminated"));
        assert_eq!(app.computer.snapshot().ar, 6);
    }

    #[test]
    fn test_breakpoint_stops_run() {
        let mut app = app();
        app.breakpoints.insert(0x06);
        app.run();
        for _ in 0..100 {
            app.tick();
        }
        assert!(!app.running);
        assert_eq!(app.computer.snapshot().ip, 0x06);
        assert!(app.status.contains("Breakpoint"));

        // resuming leaves the breakpoint behind
        app.run();
        app.tick();
        assert!(app.running);
    }

    #[test]
    fn test_toggle_breakpoint() {
        let mut app = app();
        app.toggle_breakpoint();
        assert!(app.breakpoints.contains(&0));
        app.toggle_breakpoint();
        assert!(app.breakpoints.is_empty());
    }

    #[test]
    fn test_disassembly_marks_ip() {
        let app = app();
        let lines = app.get_disassembly(4);
        assert_eq!(lines[0], (0, "INC 1".to_string(), true));
        assert!(!lines[1].2);
    }

    #[test]
    fn test_reset() {
        let mut app = app();
        app.step();
        app.step_cpu();
        app.reset();
        assert_eq!(app.computer.ticks(), 0);
        assert_eq!(app.status, "Reset. Ready.");
    }
}
