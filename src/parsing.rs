/// Divisor turning a byte count into the table's memory unit.
///
/// The collector reports memory as `bytes / 10^9` under the "MiB" label. This is
/// not 2^20; downstream consumers depend on the value as recorded.
pub const MEMORY_UNIT_DIVISOR: i64 = 1_000_000_000;

const BINARY_SUFFIXES: &[(&str, u32)] = &[
    ("Ki", 1),
    ("Mi", 2),
    ("Gi", 3),
    ("Ti", 4),
    ("Pi", 5),
    ("Ei", 6),
];

const DECIMAL_SUFFIXES: &[(char, i32)] = &[
    ('n', -9),
    ('u', -6),
    ('m', -3),
    ('k', 3),
    ('K', 3),
    ('M', 6),
    ('G', 9),
    ('T', 12),
    ('P', 15),
    ('E', 18),
];

/// A Kubernetes quantity decomposed as `mantissa * 10^exp10 * 1024^binary_power`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Quantity {
    mantissa: i128,
    exp10: i32,
    binary_power: u32,
}

fn parse_quantity(q: &str) -> Option<Quantity> {
    let q = q.trim();
    if q.is_empty() {
        return None;
    }

    for (suf, power) in BINARY_SUFFIXES {
        if let Some(number) = q.strip_suffix(suf) {
            let (mantissa, exp10) = parse_decimal(number)?;
            return Some(Quantity { mantissa, exp10, binary_power: *power });
        }
    }

    let last = q.chars().last()?;
    for (suf, exp) in DECIMAL_SUFFIXES {
        if last == *suf {
            let number = &q[..q.len() - suf.len_utf8()];
            // "1E" is exa; "1E3" never reaches here because it ends in a digit
            let (mantissa, exp10) = parse_decimal(number)?;
            return Some(Quantity { mantissa, exp10: exp10.checked_add(*exp)?, binary_power: 0 });
        }
    }

    let (mantissa, exp10) = parse_decimal(q)?;
    Some(Quantity { mantissa, exp10, binary_power: 0 })
}

/// Parses `[+-]digits[.digits][(e|E)[+-]digits]` exactly into `(mantissa, exp10)`.
fn parse_decimal(s: &str) -> Option<(i128, i32)> {
    let (number, exponent) = match s.find(|c: char| c == 'e' || c == 'E') {
        Some(idx) => (&s[..idx], s[idx + 1..].parse::<i32>().ok()?),
        None => (s, 0),
    };

    let (negative, digits) = match number.as_bytes().first()? {
        b'-' => (true, &number[1..]),
        b'+' => (false, &number[1..]),
        _ => (false, number),
    };

    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, f),
        None => (digits, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut mantissa: i128 = 0;
    for b in int_part.bytes().chain(frac_part.bytes()) {
        mantissa = mantissa.checked_mul(10)?.checked_add(i128::from(b - b'0'))?;
    }
    if negative {
        mantissa = -mantissa;
    }

    let frac_len = i32::try_from(frac_part.len()).ok()?;
    Some((mantissa, exponent.checked_sub(frac_len)?))
}

/// Value of `q` expressed in units of `10^target_exp10`, rounded toward positive infinity.
fn scaled_value(q: Quantity, target_exp10: i32) -> Option<i64> {
    let mut value = q.mantissa.checked_mul(1024_i128.checked_pow(q.binary_power)?)?;
    let shift = q.exp10.checked_sub(target_exp10)?;
    if shift >= 0 {
        value = value.checked_mul(10_i128.checked_pow(u32::try_from(shift).ok()?)?)?;
    } else {
        let divisor = 10_i128.checked_pow(u32::try_from(-shift).ok()?)?;
        let quotient = value / divisor;
        value = if value % divisor > 0 { quotient + 1 } else { quotient };
    }
    i64::try_from(value).ok()
}

/// CPU quantity to millicores with `MilliValue` semantics (fractions round up).
pub fn parse_cpu_to_millicores(q: &str) -> Option<i64> {
    scaled_value(parse_quantity(q)?, -3)
}

/// Memory quantity to bytes (fractions round up).
pub fn parse_memory_to_bytes(q: &str) -> Option<i64> {
    scaled_value(parse_quantity(q)?, 0)
}

pub fn bytes_to_mib(bytes: i64) -> i64 {
    bytes / MEMORY_UNIT_DIVISOR
}

/// Memory quantity converted to the table unit; absent or unparseable reads as zero.
pub fn memory_quantity_to_mib(q: Option<&str>) -> i64 {
    q.and_then(parse_memory_to_bytes).map(bytes_to_mib).unwrap_or(0)
}

/// CPU quantity converted to millicores; absent or unparseable reads as zero.
pub fn cpu_quantity_to_millicores(q: Option<&str>) -> i64 {
    q.and_then(parse_cpu_to_millicores).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cpu_to_millicores() {
        // Test nanocores
        assert_eq!(parse_cpu_to_millicores("1000000000n"), Some(1000));
        assert_eq!(parse_cpu_to_millicores("500000000n"), Some(500));

        // Test microcores
        assert_eq!(parse_cpu_to_millicores("1000000u"), Some(1000));
        assert_eq!(parse_cpu_to_millicores("500000u"), Some(500));

        // Test millicores
        assert_eq!(parse_cpu_to_millicores("100m"), Some(100));
        assert_eq!(parse_cpu_to_millicores("1500m"), Some(1500));

        // Test cores
        assert_eq!(parse_cpu_to_millicores("1"), Some(1000));
        assert_eq!(parse_cpu_to_millicores("0.5"), Some(500));
        assert_eq!(parse_cpu_to_millicores("2.5"), Some(2500));
        assert_eq!(parse_cpu_to_millicores("0.1"), Some(100));
        assert_eq!(parse_cpu_to_millicores("1e3"), Some(1_000_000));

        // Test invalid inputs
        assert_eq!(parse_cpu_to_millicores(""), None);
        assert_eq!(parse_cpu_to_millicores("invalid"), None);
        assert_eq!(parse_cpu_to_millicores("100x"), None);
        assert_eq!(parse_cpu_to_millicores("."), None);
    }

    #[test]
    fn test_cpu_fractions_round_up() {
        assert_eq!(parse_cpu_to_millicores("250000n"), Some(1));
        assert_eq!(parse_cpu_to_millicores("999999999n"), Some(1000));
        assert_eq!(parse_cpu_to_millicores("1500001n"), Some(2));
        assert_eq!(parse_cpu_to_millicores("0.0001"), Some(1));
        assert_eq!(parse_cpu_to_millicores("0n"), Some(0));
    }

    #[test]
    fn test_parse_memory_to_bytes() {
        // Test binary units
        assert_eq!(parse_memory_to_bytes("1Ki"), Some(1024));
        assert_eq!(parse_memory_to_bytes("1Mi"), Some(1024 * 1024));
        assert_eq!(parse_memory_to_bytes("1Gi"), Some(1024 * 1024 * 1024));
        assert_eq!(parse_memory_to_bytes("2.5Mi"), Some(2_621_440));

        // Test decimal units
        assert_eq!(parse_memory_to_bytes("1K"), Some(1000));
        assert_eq!(parse_memory_to_bytes("1M"), Some(1000 * 1000));
        assert_eq!(parse_memory_to_bytes("1G"), Some(1000 * 1000 * 1000));
        assert_eq!(parse_memory_to_bytes("1k"), Some(1000));
        assert_eq!(parse_memory_to_bytes("1E"), Some(1_000_000_000_000_000_000));

        // Test plain bytes and exponents
        assert_eq!(parse_memory_to_bytes("1024"), Some(1024));
        assert_eq!(parse_memory_to_bytes("129e6"), Some(129_000_000));
        assert_eq!(parse_memory_to_bytes("  104857600 "), Some(104_857_600));

        // Test invalid inputs
        assert_eq!(parse_memory_to_bytes(""), None);
        assert_eq!(parse_memory_to_bytes("invalid"), None);
        assert_eq!(parse_memory_to_bytes("100X"), None);
        assert_eq!(parse_memory_to_bytes("16Ei"), None); // overflows i64
    }

    #[test]
    fn test_memory_unit_is_decimal_gigabyte() {
        assert_eq!(bytes_to_mib(104_857_600), 0);
        assert_eq!(bytes_to_mib(999_999_999), 0);
        assert_eq!(bytes_to_mib(1_000_000_000), 1);
        assert_eq!(bytes_to_mib(2_147_483_648), 2);

        assert_eq!(memory_quantity_to_mib(Some("4Gi")), 4);
        assert_eq!(memory_quantity_to_mib(Some("128Mi")), 0);
        assert_eq!(memory_quantity_to_mib(None), 0);
        assert_eq!(memory_quantity_to_mib(Some("garbage")), 0);
    }

    #[test]
    fn test_missing_cpu_reads_as_zero() {
        assert_eq!(cpu_quantity_to_millicores(None), 0);
        assert_eq!(cpu_quantity_to_millicores(Some("bogus")), 0);
        assert_eq!(cpu_quantity_to_millicores(Some("200m")), 200);
    }
}
