use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HexError {
    #[error("hex string has an odd number of digits")]
    OddLength,
    #[error("invalid hex byte at offset {offset}")]
    InvalidDigit { offset: usize },
}

/// Parse machine code given as hex text.
///
/// Text containing a space is read as whitespace-separated byte pairs
/// (`"b8 01 00 00 00"`); otherwise as one continuous digit string
/// (`"b801000000"`). `offset` in errors is the byte index.
pub fn parse_hex_bytes(text: &str) -> Result<Vec<u8>, HexError> {
    if text.contains(' ') {
        text.split_whitespace()
            .enumerate()
            .map(|(offset, token)| parse_pair(token).ok_or(HexError::InvalidDigit { offset }))
            .collect()
    } else {
        let text = text.trim();
        if text.len() % 2 != 0 {
            return Err(HexError::OddLength);
        }
        (0..text.len() / 2)
            .map(|offset| {
                text.get(offset * 2..offset * 2 + 2)
                    .and_then(parse_pair)
                    .ok_or(HexError::InvalidDigit { offset })
            })
            .collect()
    }
}

fn parse_pair(token: &str) -> Option<u8> {
    // `from_str_radix` accepts a leading `+`.
    if token.len() != 2 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(token, 16).ok()
}
