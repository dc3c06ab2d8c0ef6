//! Human-friendly byte sizes for command-line flags.

/// Parse a byte count such as `1048576`, `512KB`, `16MB`, `16MiB` or `1GB`.
///
/// Units are binary (1KB = 1024 bytes) and case-insensitive.
pub fn parse_size(input: &str) -> Result<u64, String> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);

    if digits.is_empty() {
        return Err(format!("invalid size: {input:?}"));
    }
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid size: {input:?}"))?;

    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => 1 << 10,
        "m" | "mb" | "mib" => 1 << 20,
        "g" | "gb" | "gib" => 1 << 30,
        other => return Err(format!("unknown size unit {other:?} in {input:?}")),
    };

    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("size too large: {input:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_bytes() {
        assert_eq!(parse_size("1048576"), Ok(1_048_576));
        assert_eq!(parse_size("0"), Ok(0));
    }

    #[test]
    fn binary_units() {
        assert_eq!(parse_size("512KB"), Ok(512 * 1024));
        assert_eq!(parse_size("16MB"), Ok(16 * 1024 * 1024));
        assert_eq!(parse_size("16mib"), Ok(16 * 1024 * 1024));
        assert_eq!(parse_size("1 GB"), Ok(1024 * 1024 * 1024));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_size("").is_err());
        assert!(parse_size("MB").is_err());
        assert!(parse_size("12XB").is_err());
        assert!(parse_size("99999999999999GB").is_err());
    }
}
