//! Size parsing into byte counts.
//!
//! Units are binary multiples: `1 KB == 1024 B`, matching what Windows shows
//! for `EstimatedSize` (a KiB count).

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;
const TIB: u64 = GIB * 1024;

fn unit_multiplier(unit: &str) -> Option<u64> {
    match unit.to_ascii_lowercase().as_str() {
        "" | "b" | "byte" | "bytes" => Some(1),
        "k" | "kb" | "kib" => Some(KIB),
        "m" | "mb" | "mib" => Some(MIB),
        "g" | "gb" | "gib" => Some(GIB),
        "t" | "tb" | "tib" => Some(TIB),
        _ => None,
    }
}

/// Parse a human-readable size (`"12 MB"`, `"1.5gb"`, `"4096"`) into bytes.
///
/// Negative, malformed and overflowing values are `None`.
pub fn parse_size(raw: &str) -> Option<u64> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    let split = text
        .char_indices()
        .find(|(idx, c)| !(c.is_ascii_digit() || *c == '.' || (*idx == 0 && *c == '+')))
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let number = number.strip_prefix('+').unwrap_or(number);
    if number.is_empty() {
        return None;
    }
    let multiplier = unit_multiplier(unit.trim())?;
    scale(number, multiplier)
}

/// Convert a registry `EstimatedSize` value (KiB) into bytes.
pub fn from_kibibytes(raw: &str) -> Option<u64> {
    let text = raw.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    scale(text, KIB)
}

/// Convert a legacy megabyte column (`SizeMB`) into bytes.
pub fn from_mebibytes(raw: &str) -> Option<u64> {
    let text = raw.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return None;
    }
    scale(text, MIB)
}

fn scale(number: &str, multiplier: u64) -> Option<u64> {
    if number.contains('.') {
        let value: f64 = number.parse().ok()?;
        let bytes = (value * multiplier as f64).round();
        if !bytes.is_finite() || bytes < 0.0 || bytes >= u64::MAX as f64 {
            return None;
        }
        Some(bytes as u64)
    } else {
        number.parse::<u64>().ok()?.checked_mul(multiplier)
    }
}
