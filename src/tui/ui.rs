//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, List, ListItem},
    style::{Color, Style, Modifier},
};
use crate::image::format_word;
use crate::machine::{PipelineState, Snapshot};
use super::app::DebuggerApp;

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let snap = app.computer.snapshot();

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(55),
            Constraint::Percentage(45),
        ])
        .split(frame.area());

    // Left side: code, registers and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(8),
            Constraint::Length(7),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_disassembly(frame, left_chunks[0], app);
    draw_registers(frame, left_chunks[1], &snap);
    draw_status(frame, left_chunks[2], app);

    // Right side: general registers, buses, RAM and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(snap.general.len().min(8) as u16 + 2),
            Constraint::Length(4),
            Constraint::Min(6),
            Constraint::Length(4),
        ])
        .split(chunks[1]);

    draw_general(frame, right_chunks[0], &snap);
    draw_buses(frame, right_chunks[1], &snap);
    draw_memory(frame, right_chunks[2], app, &snap);
    draw_help(frame, right_chunks[3]);
}

fn draw_disassembly(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let disasm = app.get_disassembly((area.height as usize).saturating_sub(2));

    let items: Vec<ListItem> = disasm
        .iter()
        .map(|(addr, instr, is_current)| {
            let prefix = if *is_current { "▶ " } else { "  " };
            let bp = if app.breakpoints.contains(addr) { "●" } else { " " };
            let text = format!("{}{:03}: {}", prefix, addr, instr);

            let style = if *is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if app.breakpoints.contains(addr) {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };

            ListItem::new(format!("{} {}", bp, text)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Disassembly ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(list, area);
}

fn word_line(label: &str, value: u64, width: usize, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::raw(format!("{:<5}", label)),
        Span::styled(format_word(value, width), Style::default().fg(color)),
        Span::raw(format!(" = {}", value)),
    ])
}

fn flag_span(name: &'static str, set: bool, on: Color) -> Span<'static> {
    let style = if set { Style::default().fg(on).add_modifier(Modifier::BOLD) } else { Style::default().fg(Color::DarkGray) };
    Span::styled(format!("{} ", name), style)
}

/// Draw service registers, flags and the pipeline stage.
fn draw_registers(frame: &mut Frame, area: Rect, snap: &Snapshot) {
    let w = snap.word_width;
    let stage = snap.pipeline_state.map_or("invalid", PipelineState::name);

    let content = vec![
        word_line("IP:", snap.ip, w, Color::Yellow),
        word_line("AR:", snap.ar, w, Color::White),
        word_line("CNT:", snap.counter, w, Color::Cyan),
        Line::from(vec![
            Span::raw("Stage: "),
            Span::styled(stage, Style::default().fg(Color::Cyan)),
            Span::raw(format!("  CMD {:#04x}  ARG {} {}", snap.command_code, snap.arg1, snap.arg2)),
        ]),
        Line::from(vec![
            Span::raw("Flags: "),
            flag_span("TERM", snap.flags.terminated, Color::Red),
            flag_span("OVF", snap.flags.overflow, Color::Yellow),
            flag_span("FATAL", snap.flags.fatal, Color::Red),
            flag_span("ZERO", snap.flags.zero, Color::Green),
            Span::raw(format!("  ticks {}", snap.ticks)),
        ]),
    ];

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

fn draw_general(frame: &mut Frame, area: Rect, snap: &Snapshot) {
    let content: Vec<Line> = snap.general
        .iter()
        .enumerate()
        .map(|(i, value)| word_line(&format!("CR{}:", i), *value, snap.word_width, Color::White))
        .collect();

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" General ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

fn draw_buses(frame: &mut Frame, area: Rect, snap: &Snapshot) {
    let w = snap.word_width;
    let request = match (snap.buses.enable, snap.buses.write) {
        (false, _) => Span::styled("idle", Style::default().fg(Color::DarkGray)),
        (true, false) => Span::styled("READ", Style::default().fg(Color::Cyan)),
        (true, true) => Span::styled("WRITE", Style::default().fg(Color::Magenta)),
    };

    let content = vec![
        Line::from(vec![
            Span::raw("ctl "),
            request,
            Span::raw(format!("  addr {}", format_word(snap.buses.address, w))),
        ]),
        Line::from(format!("data {}", format_word(snap.buses.data, w))),
    ];

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Buses ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)));

    frame.render_widget(paragraph, area);
}

fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp, snap: &Snapshot) {
    let visible_rows = (area.height as usize).saturating_sub(2);
    let start = app.mem_scroll;
    let end = (start + visible_rows).min(snap.ram.len());

    let items: Vec<ListItem> = (start..end)
        .map(|addr| {
            let value = snap.ram[addr];
            let is_ip = addr as u64 == snap.ip;
            let is_bus = snap.buses.enable && addr as u64 == snap.buses.address;

            let text = format!("{:03}: {} = {}", addr, format_word(value, snap.word_width), value);

            let style = if is_ip {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if is_bus {
                Style::default().fg(Color::Magenta)
            } else if value != 0 {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" RAM ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(list, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Status ")
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("s: Tick  c: CPU  m: RAM  r: Run  p: Pause"),
        Line::from("b: Breakpoint  x: Reset  ↑↓: Scroll  q: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}
