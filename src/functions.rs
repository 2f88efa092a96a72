// std imports
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

// 3rd party imports
use anyhow::{Context, Result};

/// Counts the lines of the given file, including the header.
/// A missing trailing newline still counts the last line.
///
/// # Arguments
/// * `path` - Path to file
///
pub fn count_lines(path: &Path) -> Result<usize> {
    let mut reader = BufReader::new(
        File::open(path).with_context(|| format!("Error when opening `{}`", path.display()))?,
    );
    let mut count = 0;
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        let read = reader
            .read_until(b'\n', &mut buffer)
            .with_context(|| format!("Error when reading `{}`", path.display()))?;
        if read == 0 {
            break;
        }
        count += 1;
    }
    Ok(count)
}

/// Formats a number in scientific notation with 6 significant digits,
/// exponent with sign and at least two digits, e.g. `1.23457E-10`.
///
/// # Arguments
/// * `value` - Value to format
///
pub fn format_scientific(value: f64) -> String {
    let formatted = format!("{:.5E}", value);
    let (mantissa, exponent) = match formatted.split_once('E') {
        Some(parts) => parts,
        None => return formatted, // NaN and infinity
    };
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };
    format!("{}E{}{:0>2}", mantissa, sign, digits)
}

/// Parses a trimmed string as finite number
///
pub fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

/// Sanitizes a file name component by replacing all characters which are
/// not alphanumeric, `-`, `_` or `.` with `_`.
///
/// # Arguments
/// * `name` - Name to sanitize
///
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs::write;

    use super::*;

    #[test]
    fn test_format_scientific() {
        assert_eq!(format_scientific(1.234567e-10), "1.23457E-10");
        assert_eq!(format_scientific(0.5), "5.00000E-01");
        assert_eq!(format_scientific(1.0), "1.00000E+00");
        assert_eq!(format_scientific(1.5e120), "1.50000E+120");
        assert_eq!(format_scientific(0.0), "0.00000E+00");
    }

    #[test]
    fn test_count_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lines.txt");
        write(&path, "a\nb\nc").unwrap();
        assert_eq!(count_lines(&path).unwrap(), 3);
        write(&path, "a\nb\nc\n").unwrap();
        assert_eq!(count_lines(&path).unwrap(), 3);
        write(&path, "").unwrap();
        assert_eq!(count_lines(&path).unwrap(), 0);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 1e-5 "), Some(1e-5));
        assert_eq!(parse_number("N/A: precursor mass != peptide mass"), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("QC Shew/08"), "QC_Shew_08");
    }
}
