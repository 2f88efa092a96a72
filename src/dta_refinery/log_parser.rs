// std imports
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

// 3rd party imports
use anyhow::{Context, Result};
use fancy_regex::Regex;
use lazy_static::lazy_static;

// internal imports
use crate::functions::parse_number;

lazy_static! {
    /// Line with the number of processed spectra, e.g. `Number of spectra: 1234`
    static ref SPECTRA_COUNT_REGEX: Regex =
        Regex::new(r"(?i)^number\s+of\s+spectra\s*[:=]\s*(\d+)").unwrap();

    /// Statistic line within a mass error section, e.g. `median: -1.25`
    static ref STATISTIC_REGEX: Regex =
        Regex::new(r"(?i)^(mean|median|stdev|std\.?\s*dev\.?)\s*[:=]\s*(\S+)").unwrap();
}

/// Mass error statistics of one section of the log in PPM
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MassErrorStatistics {
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std_dev: Option<f64>,
}

impl MassErrorStatistics {
    fn is_empty(&self) -> bool {
        self.mean.is_none() && self.median.is_none() && self.std_dev.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    None,
    Original,
    Refined,
}

/// Findings of a `_DtaRefineryLog.txt` file
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DtaRefineryLog {
    /// Lines reporting an error, in order of appearance
    pub errors: Vec<String>,
    /// Number of spectra DTA-Refinery processed
    pub spectra_count: Option<usize>,
    /// Mass errors before refinement
    pub original: MassErrorStatistics,
    /// Mass errors after refinement
    pub refined: MassErrorStatistics,
}

impl DtaRefineryLog {
    /// Parses a DTA-Refinery log file
    ///
    /// # Arguments
    /// * `path` - Path to the log file
    ///
    pub fn from_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(
            File::open(path).with_context(|| format!("Error when opening `{}`", path.display()))?,
        );
        let mut lines = Vec::new();
        for line in reader.split(b'\n') {
            let line = line.with_context(|| format!("Error when reading `{}`", path.display()))?;
            lines.push(String::from_utf8_lossy(&line).trim().to_string());
        }
        Ok(Self::parse(lines.iter().map(|line| line.as_str())))
    }

    /// Parses the lines of a DTA-Refinery log
    ///
    pub fn parse<'a>(lines: impl Iterator<Item = &'a str>) -> Self {
        let mut log = Self::default();
        let mut section = Section::None;
        for line in lines.map(str::trim).filter(|line| !line.is_empty()) {
            if Self::is_error_line(line) {
                log.errors.push(line.to_string());
                continue;
            }
            if let Ok(Some(captures)) = SPECTRA_COUNT_REGEX.captures(line) {
                log.spectra_count = captures.get(1).and_then(|m| m.as_str().parse().ok());
                continue;
            }
            let upper = line.to_ascii_uppercase();
            if upper.starts_with("ORIGINAL") {
                section = Section::Original;
                continue;
            }
            if upper.starts_with("REFINED") {
                section = Section::Refined;
                continue;
            }
            let statistics = match section {
                Section::Original => &mut log.original,
                Section::Refined => &mut log.refined,
                Section::None => continue,
            };
            if let Ok(Some(captures)) = STATISTIC_REGEX.captures(line) {
                let value = captures.get(2).and_then(|m| parse_number(m.as_str()));
                let name = captures
                    .get(1)
                    .map(|m| m.as_str().to_ascii_lowercase())
                    .unwrap_or_default();
                match name.as_str() {
                    "mean" => statistics.mean = value,
                    "median" => statistics.median = value,
                    _ => statistics.std_dev = value,
                }
            }
        }
        log
    }

    /// `mass error` is a regular heading, only leading markers or `error:` count
    ///
    fn is_error_line(line: &str) -> bool {
        let lower = line.to_ascii_lowercase();
        lower.starts_with("error") || lower.starts_with("exception") || lower.contains("error:")
    }

    /// True if both sections reported at least one statistic
    ///
    pub fn has_mass_errors(&self) -> bool {
        !self.original.is_empty() && !self.refined.is_empty()
    }

    /// Named values submitted to the database. Missing statistics are omitted.
    ///
    pub fn measurements(&self) -> Vec<(&'static str, String)> {
        let mut measurements = Vec::new();
        if let Some(spectra_count) = self.spectra_count {
            measurements.push(("PSMCount", spectra_count.to_string()));
        }
        let values = [
            ("MassErrorPPM", self.original.median),
            ("MassErrorPPM_Refined", self.refined.median),
            ("MassErrorPPM_StDev", self.original.std_dev),
            ("MassErrorPPM_Refined_StDev", self.refined.std_dev),
        ];
        for (name, value) in values {
            if let Some(value) = value {
                measurements.push((name, format!("{:.3}", value)));
            }
        }
        measurements
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "DTA_Refinery v1.5\n\
        Number of spectra: 5123\n\
        Mass error histogram\n\
        ORIGINAL parent ion mass error (ppm)\n\
        mean: 4.51\n\
        median: 4.2\n\
        stdev: 3.75\n\
        REFINED parent ion mass error (ppm)\n\
        mean: 0.12\n\
        median: -0.08\n\
        stdev: 2.01\n";

    #[test]
    fn test_parse_statistics() {
        let log = DtaRefineryLog::parse(LOG.lines());
        assert!(log.errors.is_empty());
        assert_eq!(log.spectra_count, Some(5123));
        assert_eq!(log.original.median, Some(4.2));
        assert_eq!(log.refined.mean, Some(0.12));
        assert_eq!(log.refined.std_dev, Some(2.01));
        assert!(log.has_mass_errors());

        let measurements = log.measurements();
        assert_eq!(measurements[0], ("PSMCount", "5123".to_string()));
        assert_eq!(measurements[1], ("MassErrorPPM", "4.200".to_string()));
        assert_eq!(measurements[2], ("MassErrorPPM_Refined", "-0.080".to_string()));
        assert_eq!(measurements.len(), 5);
    }

    #[test]
    fn test_error_lines() {
        let lines = [
            "Mass error histogram",
            "Error: no spectra passed the filter",
            "Exception in thread main",
            "X!Tandem error: bad input",
        ];
        let log = DtaRefineryLog::parse(lines.into_iter());
        assert_eq!(log.errors.len(), 3);
        assert_eq!(log.errors[0], "Error: no spectra passed the filter");
        assert!(!log.has_mass_errors());
        assert!(log.measurements().is_empty());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("QC_dta_DtaRefineryLog.txt");
        std::fs::write(&path, LOG.replace('\n', "\r\n")).unwrap();
        let log = DtaRefineryLog::from_file(&path).unwrap();
        assert_eq!(log.original.std_dev, Some(3.75));
    }
}
