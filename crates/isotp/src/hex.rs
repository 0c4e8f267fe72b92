use crate::exit::{CliError, CliResult};

/// Parse hex bytes written as `22 F1 90`, `22F190` or `0x22,0xF1,0x90`.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let mut bytes = Vec::new();
    let tokens = input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty());

    for token in tokens {
        let digits = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        if digits.is_empty()
            || digits.len() % 2 != 0
            || !digits.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(CliError::usage(format!("invalid hex token: {token}")));
        }
        for i in (0..digits.len()).step_by(2) {
            let pair = &digits[i..i + 2];
            let byte = u8::from_str_radix(pair, 16)
                .map_err(|_| CliError::usage(format!("invalid hex byte: {pair}")))?;
            bytes.push(byte);
        }
    }
    Ok(bytes)
}

/// Parse a single byte such as `AA`, `0x55` or `0`.
pub fn parse_byte(input: &str) -> Result<u8, String> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(format!("invalid byte: {input}"));
    }
    u8::from_str_radix(digits, 16).map_err(|_| format!("invalid byte: {input}"))
}

/// Format bytes as space-separated upper-case hex.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spaced_packed_and_prefixed_forms() {
        let expected = vec![0x22, 0xF1, 0x90];
        assert_eq!(parse_hex("22 F1 90").unwrap(), expected);
        assert_eq!(parse_hex("22f190").unwrap(), expected);
        assert_eq!(parse_hex("0x22,0xF1, 0x90").unwrap(), expected);
        assert!(parse_hex("").unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!(parse_hex("2").is_err());
        assert!(parse_hex("zz").is_err());
        assert!(parse_hex("0x").is_err());
        assert!(parse_hex("é1").is_err());
    }

    #[test]
    fn parses_single_bytes() {
        assert_eq!(parse_byte("AA").unwrap(), 0xAA);
        assert_eq!(parse_byte("0x55").unwrap(), 0x55);
        assert_eq!(parse_byte("0").unwrap(), 0);
        assert!(parse_byte("100").is_err());
    }

    #[test]
    fn formats_upper_case() {
        assert_eq!(to_hex(&[0x03, 0x22, 0xf1]), "03 22 F1");
        assert_eq!(to_hex(&[]), "");
    }
}
