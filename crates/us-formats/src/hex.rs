//! Whitespace- or comma-separated hex byte streams, as typed on a command line.

use crate::FormatError;

/// Parse `"91 3c 64"` style input into bytes.
///
/// Tokens may carry a `0x` prefix. Empty input yields no bytes.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, FormatError> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(|token| {
            let digits = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")).unwrap_or(token);
            if digits.is_empty() || digits.len() > 2 {
                return Err(FormatError::Hex(token.to_string()));
            }
            u8::from_str_radix(digits, 16).map_err(|_| FormatError::Hex(token.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_note_on() {
        assert_eq!(parse_hex("91 3c 64").unwrap(), vec![0x91, 0x3c, 0x64]);
    }

    #[test]
    fn accepts_prefixes_commas_and_newlines() {
        assert_eq!(parse_hex("0x90,0X40\n7f  ,").unwrap(), vec![0x90, 0x40, 0x7f]);
    }

    #[test]
    fn empty_input_is_no_bytes() {
        assert!(parse_hex("  ").unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_tokens() {
        assert!(matches!(parse_hex("90 zz"), Err(FormatError::Hex(t)) if t == "zz"));
        assert!(matches!(parse_hex("123"), Err(FormatError::Hex(_))));
        assert!(matches!(parse_hex("0x"), Err(FormatError::Hex(_))));
    }
}
