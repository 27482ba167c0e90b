//! RAM image text format.
//!
//! A RAM image is plain text:
//! - One word per line, written most significant bit first
//! - Bits are `0`/`1`; `_` and spaces may separate groups
//! - `;` starts a comment that runs to the end of the line
//! - Blank lines are ignored
//!
//! Every word line must carry exactly `width` bits.

use std::io::Write;
use std::path::Path;
use thiserror::Error;

use crate::machine::config::MAX_WORD_WIDTH;

/// A sequence of words destined for RAM, starting at address 0.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RamImage {
    /// Bits per word.
    pub width: usize,
    /// Words in address order.
    pub words: Vec<u64>,
}

impl RamImage {
    pub fn new(width: usize, words: Vec<u64>) -> Self {
        Self { width, words }
    }

    /// Number of words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Format `value` as `width` bits, MSB first, grouped by four with `_`.
pub fn format_word(value: u64, width: usize) -> String {
    let mut out = String::with_capacity(width + width / 4);
    for i in (0..width).rev() {
        let bit = i < 64 && (value >> i) & 1 == 1;
        out.push(if bit { '1' } else { '0' });
        if i > 0 && i % 4 == 0 {
            out.push('_');
        }
    }
    out
}

/// Parse image text for a machine with `width`-bit words.
pub fn parse_image(text: &str, width: usize) -> Result<RamImage, ImageError> {
    if width == 0 || width > MAX_WORD_WIDTH {
        return Err(ImageError::UnsupportedWidth(width));
    }

    let mut image = RamImage::new(width, Vec::new());

    for (line_num, line) in text.lines().enumerate() {
        let code = line.split(';').next().unwrap_or("").trim();
        if code.is_empty() {
            continue;
        }

        let mut value = 0u64;
        let mut bits = 0usize;
        for c in code.chars() {
            match c {
                '0' | '1' => {
                    if bits < 64 {
                        value = (value << 1) | u64::from(c == '1');
                    }
                    bits += 1;
                }
                '_' | ' ' | '\t' => {}
                other => {
                    return Err(ImageError::Parse {
                        line: line_num + 1,
                        message: format!("unexpected character '{}'", other),
                    });
                }
            }
        }

        if bits != width {
            return Err(ImageError::Parse {
                line: line_num + 1,
                message: format!("expected {} bits, found {}", width, bits),
            });
        }

        image.words.push(value);
    }

    Ok(image)
}

/// Load an image file from disk.
pub fn load_image<P: AsRef<Path>>(path: P, width: usize) -> Result<RamImage, ImageError> {
    let text = std::fs::read_to_string(path.as_ref())
        .map_err(|e| ImageError::Io(e.to_string()))?;
    parse_image(&text, width)
}

/// Render an image in the text format, one commented word per line.
pub fn render_image(image: &RamImage) -> String {
    let mut out = String::new();
    out.push_str(&format!("; RAM image, {}-bit words\n", image.width));
    out.push_str(&format!("; {} words\n\n", image.len()));
    for (addr, word) in image.words.iter().enumerate() {
        out.push_str(&format!("{} ; {:03}\n", format_word(*word, image.width), addr));
    }
    out
}

/// Save an image file to disk.
pub fn save_image<P: AsRef<Path>>(path: P, image: &RamImage) -> Result<(), ImageError> {
    let mut file = std::fs::File::create(path.as_ref())
        .map_err(|e| ImageError::Io(e.to_string()))?;
    file.write_all(render_image(image).as_bytes())
        .map_err(|e| ImageError::Io(e.to_string()))
}

/// Errors that can occur while reading or writing an image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("unsupported word width {0}")]
    UnsupportedWidth(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_image() {
        let text = "\
; a program
0000_1001   ; LD
0000 0000
00000001

00000110 ; data
";
        let image = parse_image(text, 8).unwrap();
        assert_eq!(image.width, 8);
        assert_eq!(image.words, vec![0x09, 0x00, 0x01, 0x06]);
    }

    #[test]
    fn test_parse_wrong_bit_count() {
        let err = parse_image("0101\n010\n", 4).unwrap_err();
        assert_eq!(
            err,
            ImageError::Parse { line: 2, message: "expected 4 bits, found 3".to_string() }
        );
    }

    #[test]
    fn test_parse_bad_character() {
        assert!(matches!(
            parse_image("01x1\n", 4),
            Err(ImageError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_parse_empty() {
        let image = parse_image("; nothing here\n\n", 4).unwrap();
        assert!(image.is_empty());
    }

    #[test]
    fn test_unsupported_width() {
        assert_eq!(parse_image("", 0), Err(ImageError::UnsupportedWidth(0)));
        assert_eq!(parse_image("", 65), Err(ImageError::UnsupportedWidth(65)));
    }

    #[test]
    fn test_format_word() {
        assert_eq!(format_word(0b1001, 4), "1001");
        assert_eq!(format_word(0x96, 8), "1001_0110");
        assert_eq!(format_word(1, 6), "00_0001");
    }

    #[test]
    fn test_render_parses_back() {
        let image = RamImage::new(8, vec![0x04, 0x00, 0x01, 0x01]);
        assert_eq!(parse_image(&render_image(&image), 8).unwrap(), image);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("minicomp-image-{}.txt", std::process::id()));
        let image = RamImage::new(4, vec![0xF, 0x0, 0x3]);

        save_image(&path, &image).unwrap();
        let loaded = load_image(&path, 4).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, image);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load_image("/nonexistent/minicomp/image.txt", 8),
            Err(ImageError::Io(_))
        ));
    }
}
