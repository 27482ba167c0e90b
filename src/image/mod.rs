//! RAM images: the text file format, a disassembler, and a demo program.

pub mod loader;
pub mod disasm;

pub use loader::{RamImage, ImageError, parse_image, load_image, save_image, render_image, format_word};
pub use disasm::{disassemble, disassemble_lines, Line};

use crate::machine::commands::Command;

/// Word width of the demo program.
pub const DEMO_WORD_WIDTH: usize = 8;

/// A small loop that leaves `3 + 2 + 1 = 6` in AR and stops.
pub fn demo() -> RamImage {
    RamImage::new(DEMO_WORD_WIDTH, vec![
        Command::Inc.code(), 1,             // 00: CR[1] = 3
        Command::Inc.code(), 1,             // 02
        Command::Inc.code(), 1,             // 04
        Command::Adda.code(), 1,            // 06: AR += CR[1]
        Command::Dec.code(), 1,             // 08: CR[1] -= 1
        Command::Cmp.code(), 1, 0,          // 0A: Zero = CR[1] == CR[0]
        Command::Jz.code(), 0x11,           // 0D: done?
        Command::Jmp.code(), 0x06,          // 0F
        Command::Rst.code(),                // 11
    ])
}
