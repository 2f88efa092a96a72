// std imports
use std::fs::File;
use std::io::prelude::*;
use std::io::BufReader;
use std::path::Path;

// 3rd party imports
use anyhow::{bail, Context, Result};
use fancy_regex::Regex;
use lazy_static::lazy_static;

// internal imports
use super::index::{MgfIndexEntry, MgfIndexMap};

/// Start of a spectrum
const BEGIN_IONS: &str = "BEGIN IONS";

/// End of a spectrum
const END_IONS: &str = "END IONS";

lazy_static! {
    /// Title written by DeconMSn/ExtractMSn: `<dataset>.<start scan>.<end scan>.<charge>[.dta]`
    ///
    static ref DTA_TITLE_REGEX: Regex = Regex::new(r"\.(\d+)\.(\d+)\.(\d+)(?:\.dta)?\s*$").unwrap();

    /// Scan written as key/value pair in the title, e.g. `scan=1234`
    ///
    static ref SCAN_KEY_TITLE_REGEX: Regex = Regex::new(r"(?i)scan[s]?[=:\s]+(\d+)").unwrap();

    /// Single charge in a `CHARGE=` line, e.g. `2+` in `2+ and 3+`
    ///
    static ref CHARGE_REGEX: Regex = Regex::new(r"(\d+)\s*[+-]?").unwrap();
}

/// Spectrum header values collected between `BEGIN IONS` and `END IONS`
///
#[derive(Default)]
struct SpectrumHeader {
    scans: Option<u32>,
    title_scan: Option<u32>,
    charges: Vec<u8>,
}

/// Creates an [MgfIndexMap] by reading the MGF file sequentially.
/// The spectrum index increments with each `BEGIN IONS`, starting at 1.
///
pub struct Indexer;

impl Indexer {
    /// Creates the index for the given MGF file
    ///
    /// # Arguments
    /// * `file_path` - Path to the MGF file
    ///
    pub fn create_index(file_path: &Path) -> Result<MgfIndexMap> {
        let reader = BufReader::new(
            File::open(file_path)
                .with_context(|| format!("Error when opening `{}`", file_path.display()))?,
        );

        let mut entries: Vec<MgfIndexEntry> = Vec::new();
        let mut spectrum_index: usize = 0;
        let mut header: Option<SpectrumHeader> = None;

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.eq_ignore_ascii_case(BEGIN_IONS) {
                spectrum_index += 1;
                header = Some(SpectrumHeader::default());
                continue;
            }
            if line.eq_ignore_ascii_case(END_IONS) {
                match header.take() {
                    Some(header) => Self::push_entries(&mut entries, spectrum_index, header),
                    None => bail!("`{}` without `{}`", END_IONS, BEGIN_IONS),
                }
                continue;
            }
            let header = match header.as_mut() {
                Some(header) => header,
                None => continue,
            };
            let (key, value) = match line.split_once('=') {
                Some(key_value) => key_value,
                None => continue, // peak line
            };
            match key.trim().to_ascii_uppercase().as_str() {
                "SCANS" => header.scans = Self::parse_scans(value),
                "TITLE" => header.title_scan = Self::parse_title(value)?,
                "CHARGE" => header.charges = Self::parse_charges(value)?,
                _ => (),
            }
        }
        Ok(MgfIndexMap::new(entries))
    }

    /// Adds one entry per charge, charge 0 if the spectrum declares none.
    /// Without scan information the spectrum index is used as scan number.
    ///
    fn push_entries(entries: &mut Vec<MgfIndexEntry>, index: usize, header: SpectrumHeader) {
        let scan = header
            .scans
            .or(header.title_scan)
            .unwrap_or(index as u32);
        if header.charges.is_empty() {
            entries.push(MgfIndexEntry {
                index,
                scan,
                charge: 0,
            });
            return;
        }
        for charge in header.charges {
            entries.push(MgfIndexEntry {
                index,
                scan,
                charge,
            });
        }
    }

    /// Parses `SCANS=1234` or `SCANS=1234-1236`, using the first scan
    ///
    fn parse_scans(value: &str) -> Option<u32> {
        value
            .trim()
            .split(|c: char| c == '-' || c == ',')
            .next()
            .and_then(|scan| scan.trim().parse().ok())
    }

    fn parse_title(value: &str) -> Result<Option<u32>> {
        if let Some(captures) = DTA_TITLE_REGEX.captures(value)? {
            return Ok(captures.get(1).and_then(|scan| scan.as_str().parse().ok()));
        }
        if let Some(captures) = SCAN_KEY_TITLE_REGEX.captures(value)? {
            return Ok(captures.get(1).and_then(|scan| scan.as_str().parse().ok()));
        }
        Ok(None)
    }

    fn parse_charges(value: &str) -> Result<Vec<u8>> {
        let mut charges = Vec::new();
        for captures in CHARGE_REGEX.captures_iter(value) {
            let captures = captures?;
            if let Some(charge) = captures.get(1).and_then(|charge| charge.as_str().parse().ok()) {
                if charge > 0 && !charges.contains(&charge) {
                    charges.push(charge);
                }
            }
        }
        Ok(charges)
    }
}
