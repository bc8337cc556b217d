//! Quantity and duration parsing shared by the resolver and the synthesizer.
//!
//! Compose and Kubernetes spell resources differently (`cpus: 0.5` vs
//! `500m`, `512m` vs `512Mi`). Everything is normalized here to millicores,
//! bytes and whole seconds.

/// Kubernetes memory suffixes, binary first.
const MEMORY_SUFFIXES: &[(&str, f64)] = &[
    ("Ki", 1024.0),
    ("Mi", 1_048_576.0),
    ("Gi", 1_073_741_824.0),
    ("Ti", 1_099_511_627_776.0),
    ("Pi", 1_125_899_906_842_624.0),
    ("Ei", 1_152_921_504_606_846_976.0),
    ("k", 1e3),
    ("M", 1e6),
    ("G", 1e9),
    ("T", 1e12),
    ("P", 1e15),
    ("E", 1e18),
];

/// Compose (docker) memory units; binary, matched case-insensitively.
const COMPOSE_MEMORY_UNITS: &[(char, f64)] = &[
    ('k', 1024.0),
    ('m', 1_048_576.0),
    ('g', 1_073_741_824.0),
    ('t', 1_099_511_627_776.0),
    ('p', 1_125_899_906_842_624.0),
];

/// Parses a CPU quantity into millicores.
///
/// Accepts `"500m"`, `"0.5"`, `"2"`.
///
/// # Errors
///
/// Returns an error if the quantity is not a non-negative number.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_cpu_millis(quantity: &str) -> Result<u64, String> {
    let quantity = quantity.trim();
    if let Some(millis) = quantity.strip_suffix('m') {
        return millis
            .parse::<u64>()
            .map_err(|_| format!("invalid cpu quantity: {quantity}"));
    }

    let cores = quantity
        .parse::<f64>()
        .map_err(|_| format!("invalid cpu quantity: {quantity}"))?;
    if !cores.is_finite() || cores < 0.0 {
        return Err(format!("invalid cpu quantity: {quantity}"));
    }
    Ok((cores * 1000.0).round() as u64)
}

/// Parses a Kubernetes memory quantity into bytes.
///
/// Accepts `"128Mi"`, `"1G"`, `"1.5Gi"`. A bare number is bytes.
///
/// # Errors
///
/// Returns an error if the quantity cannot be parsed.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_memory_bytes(quantity: &str) -> Result<u64, String> {
    let quantity = quantity.trim();
    let (number, multiplier) = MEMORY_SUFFIXES
        .iter()
        .find(|(suffix, _)| quantity.ends_with(suffix))
        .map_or((quantity, 1.0), |(suffix, factor)| {
            (&quantity[..quantity.len() - suffix.len()], *factor)
        });

    let value = number
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid memory quantity: {quantity}"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("invalid memory quantity: {quantity}"));
    }
    Ok((value * multiplier).round() as u64)
}

/// Parses a Compose memory value into bytes.
///
/// Units are binary and case-insensitive with an optional trailing `b`:
/// `"512m"`, `"512MB"`, `"1Gb"`, `"1.5g"`, `"1024b"`.
///
/// # Errors
///
/// Returns an error if the value is not a Compose memory size.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_compose_memory_bytes(value: &str) -> Result<u64, String> {
    let lower = value.trim().to_ascii_lowercase();
    let body = lower.strip_suffix('b').unwrap_or(&lower);
    let (number, multiplier) = body
        .chars()
        .last()
        .and_then(|unit| COMPOSE_MEMORY_UNITS.iter().find(|(u, _)| *u == unit))
        .map_or((body, 1.0), |(_, factor)| (&body[..body.len() - 1], *factor));

    let amount = number
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid memory size: {value}"))?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(format!("invalid memory size: {value}"));
    }
    Ok((amount * multiplier).round() as u64)
}

/// Parses a duration into whole seconds, rounding partial seconds up.
///
/// Accepts Compose durations (`"1m30s"`, `"500ms"`, `"2h"`) and bare
/// numbers of seconds.
///
/// # Errors
///
/// Returns an error if the duration is malformed.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_duration_secs(duration: &str) -> Result<u64, String> {
    let duration = duration.trim();
    if duration.is_empty() {
        return Err(String::from("empty duration"));
    }
    if let Ok(secs) = duration.parse::<u64>() {
        return Ok(secs);
    }

    let mut total = 0.0_f64;
    let mut rest = duration;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(format!("invalid duration: {duration}"));
        }
        let value = rest[..number_len]
            .parse::<f64>()
            .map_err(|_| format!("invalid duration: {duration}"))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let factor = match &rest[..unit_len] {
            "h" => 3600.0,
            "m" => 60.0,
            "s" => 1.0,
            "ms" => 1e-3,
            "us" | "µs" => 1e-6,
            "ns" => 1e-9,
            other => return Err(format!("invalid duration unit '{other}' in {duration}")),
        };
        total += value * factor;
        rest = &rest[unit_len..];
    }

    Ok(total.ceil() as u64)
}

/// Formats millicores as a Kubernetes CPU quantity.
#[must_use]
pub fn format_cpu(millis: u64) -> String {
    format!("{millis}m")
}

/// Formats bytes as a Kubernetes memory quantity.
#[must_use]
pub fn format_memory(bytes: u64) -> String {
    bytes.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cpu() {
        assert_eq!(parse_cpu_millis("500m").unwrap(), 500);
        assert_eq!(parse_cpu_millis("0.5").unwrap(), 500);
        assert_eq!(parse_cpu_millis("2").unwrap(), 2000);
        assert!(parse_cpu_millis("lots").is_err());
        assert!(parse_cpu_millis("-1").is_err());
    }

    #[test]
    fn test_parse_memory() {
        assert_eq!(parse_memory_bytes("128Mi").unwrap(), 134_217_728);
        assert_eq!(parse_memory_bytes("1G").unwrap(), 1_000_000_000);
        assert_eq!(parse_memory_bytes("1024").unwrap(), 1024);
        assert_eq!(parse_memory_bytes("1.5Gi").unwrap(), 1_610_612_736);
        assert!(parse_memory_bytes("Mi").is_err());
        assert!(parse_memory_bytes("1GB").is_err());
    }

    #[test]
    fn test_parse_compose_memory() {
        assert_eq!(parse_compose_memory_bytes("512M").unwrap(), 536_870_912);
        assert_eq!(parse_compose_memory_bytes("512mb").unwrap(), 536_870_912);
        assert_eq!(parse_compose_memory_bytes("1GB").unwrap(), 1_073_741_824);
        assert_eq!(parse_compose_memory_bytes("1Gb").unwrap(), 1_073_741_824);
        assert_eq!(parse_compose_memory_bytes("1.5g").unwrap(), 1_610_612_736);
        assert_eq!(parse_compose_memory_bytes("2048b").unwrap(), 2048);
        assert_eq!(parse_compose_memory_bytes("4096").unwrap(), 4096);
        assert!(parse_compose_memory_bytes("128Mi").is_err());
        assert!(parse_compose_memory_bytes("lots").is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration_secs("30").unwrap(), 30);
        assert_eq!(parse_duration_secs("10s").unwrap(), 10);
        assert_eq!(parse_duration_secs("1m30s").unwrap(), 90);
        assert_eq!(parse_duration_secs("1h").unwrap(), 3600);
        assert_eq!(parse_duration_secs("500ms").unwrap(), 1);
        assert!(parse_duration_secs("ten seconds").is_err());
        assert!(parse_duration_secs("5d").is_err());
    }

    #[test]
    fn test_format_quantities() {
        assert_eq!(format_cpu(250), "250m");
        assert_eq!(format_memory(1024), "1024");
    }
}
