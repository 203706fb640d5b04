//! Memory-image text loader.
//!
//! ```text
//! // comment
//! 0x0000: B8 01 00 00 00   // mov eax, 1
//!         05 02 00 00 00   // continues at 0x0005
//! 0x0100: F4
//! ```
//!
//! A line holding `ADDR: bytes` starts a new run; a line of bare byte pairs
//! continues the previous run right after its last byte. Overlapping runs
//! resolve in file order (last write wins).

use std::path::Path;

use thiserror::Error;

use crate::MemoryImage;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("line {line}: invalid address `{text}`")]
    InvalidAddress { line: usize, text: String },

    #[error("line {line}: invalid byte `{text}`")]
    InvalidByte { line: usize, text: String },

    #[error("line {line}: byte continuation line without a preceding address line")]
    OrphanContinuation { line: usize },

    #[error("failed to read memory image {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Parse memory-image text into a [`MemoryImage`].
pub fn parse_memory_image(text: &str) -> Result<MemoryImage, LoadError> {
    let mut mem = MemoryImage::new();
    // Address of the byte following the last one written by the current run.
    let mut cursor: Option<u32> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        let (mut addr, bytes_text) = match line.split_once(':') {
            Some((addr_text, rest)) => (parse_address(addr_text.trim(), line_no)?, rest),
            None => (
                cursor.ok_or(LoadError::OrphanContinuation { line: line_no })?,
                line,
            ),
        };

        for token in bytes_text.split_whitespace() {
            let byte = parse_byte(token).ok_or_else(|| LoadError::InvalidByte {
                line: line_no,
                text: token.to_string(),
            })?;
            mem.write_u8(addr, byte);
            addr = addr.wrapping_add(1);
        }
        cursor = Some(addr);
    }

    tracing::debug!(bytes = mem.len(), "parsed memory image");
    Ok(mem)
}

/// Read and parse a memory-image file.
pub fn load_memory_file(path: impl AsRef<Path>) -> Result<MemoryImage, LoadError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_memory_image(&text)
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn parse_address(text: &str, line: usize) -> Result<u32, LoadError> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u32::from_str_radix(digits, 16).map_err(|_| LoadError::InvalidAddress {
        line,
        text: text.to_string(),
    })
}

fn parse_byte(token: &str) -> Option<u8> {
    if token.is_empty() || token.len() > 2 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(token, 16).ok()
}
