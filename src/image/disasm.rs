//! Disassembler for RAM images.
//!
//! Walks RAM from address 0, consuming argument words according to each
//! opcode's arity.

use crate::image::loader::{format_word, RamImage};
use crate::machine::commands::Command;

/// One disassembled instruction (or stray word).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Address of the opcode word.
    pub address: usize,
    /// Decoded command, or `None` for an unknown opcode.
    pub command: Option<Command>,
    /// Argument words actually present in the image.
    pub args: Vec<u64>,
    /// Raw words covered by this line.
    pub words: Vec<u64>,
}

impl Line {
    /// Assembly text without address or raw bits.
    pub fn text(&self) -> String {
        match self.command {
            Some(command) => {
                let mut out = command.mnemonic().to_string();
                for arg in &self.args {
                    out.push_str(&format!(" {}", arg));
                }
                if self.args.len() < command.arity() {
                    out.push_str(" <truncated>");
                }
                out
            }
            None => "???".to_string(),
        }
    }
}

/// Decode an image into instruction lines.
pub fn disassemble_lines(image: &RamImage) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut addr = 0;

    while addr < image.words.len() {
        let code = image.words[addr];
        let command = Command::from_code(code);
        let arity = command.map_or(0, Command::arity);
        let end = (addr + 1 + arity).min(image.words.len());

        lines.push(Line {
            address: addr,
            command,
            args: image.words[addr + 1..end].to_vec(),
            words: image.words[addr..end].to_vec(),
        });
        addr = end;
    }

    lines
}

/// Disassemble an image to a listing.
pub fn disassemble(image: &RamImage) -> String {
    let mut output = String::new();
    output.push_str("; minicomp disassembly\n");
    output.push_str("; --------------------\n\n");

    for line in disassemble_lines(image) {
        let bits: Vec<String> = line.words.iter().map(|w| format_word(*w, image.width)).collect();
        output.push_str(&format!("{:03}: {:<12} ; {}\n", line.address, line.text(), bits.join(" ")));
    }

    output
}
