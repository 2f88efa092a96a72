use std::collections::HashMap;

use crate::constants::{FIRST_HITS_SOURCE_TAG, SYNOPSIS_SOURCE_TAG};

/// Result tier a PSM was read from
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSource {
    /// Filter-passing hits
    Synopsis,
    /// Best hit per spectrum regardless of filters
    FirstHits,
}

impl DataSource {
    /// Tag written into the `Data_Source` column
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Synopsis => SYNOPSIS_SOURCE_TAG,
            Self::FirstHits => FIRST_HITS_SOURCE_TAG,
        }
    }

    /// Parses a `Data_Source` tag, case-insensitive
    ///
    /// # Arguments
    /// * `tag` - Tag
    ///
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        if tag.eq_ignore_ascii_case(SYNOPSIS_SOURCE_TAG) {
            Some(Self::Synopsis)
        } else if tag.eq_ignore_ascii_case(FIRST_HITS_SOURCE_TAG) {
            Some(Self::FirstHits)
        } else {
            None
        }
    }
}

/// Key joining synthesized input rows and tool output rows
///
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultCode {
    pub scan: u32,
    pub charge: u8,
    pub peptide: String,
}

impl ResultCode {
    pub fn new(scan: u32, charge: u8, peptide: &str) -> Self {
        Self {
            scan,
            charge,
            peptide: peptide.to_string(),
        }
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}_{}", self.scan, self.charge, self.peptide)
    }
}

/// Peptide-spectrum match (PSM) read from a synopsis or first-hits file
///
#[derive(Debug, Clone)]
pub struct PsmRecord {
    /// Scan number
    pub scan: u32,
    /// Precursor charge
    pub charge: u8,
    /// Peptide as written by the upstream search, including prefix/suffix residues and mod symbols
    pub peptide: String,
    /// Peptide with dynamic modifications written as mass offsets, e.g. `K.PEPT+79.966IDE.R`
    pub annotated_peptide: String,
    /// First protein the peptide matched
    pub protein: String,
    /// Result ID, unique within the source file
    pub result_id: u64,
    /// Fragmentation mode of the spectrum if known
    pub collision_mode: Option<String>,
    /// All remaining columns by name
    pub scores: HashMap<String, String>,
    /// Source tier
    pub source: DataSource,
}

impl PsmRecord {
    /// Returns the result code of the PSM
    ///
    pub fn result_code(&self) -> ResultCode {
        ResultCode::new(self.scan, self.charge, &self.peptide)
    }

    /// Returns the raw value of a score column
    ///
    /// # Arguments
    /// * `name` - Column name, case-insensitive
    ///
    pub fn score_str(&self, name: &str) -> Option<&str> {
        match self.scores.get(name) {
            Some(value) => Some(value.as_str()),
            None => self
                .scores
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str()),
        }
    }

    /// Returns a score column as number, `None` if missing or not numeric
    ///
    /// # Arguments
    /// * `name` - Column name, case-insensitive
    ///
    pub fn score(&self, name: &str) -> Option<f64> {
        self.score_str(name)
            .and_then(|value| value.trim().parse::<f64>().ok())
    }

    /// True if the peptide is located at the N- or C-terminus of the protein,
    /// indicated by `-` as prefix or suffix residue (`-.PEPTIDE.R`).
    ///
    pub fn is_protein_terminal(&self) -> bool {
        let peptide = self.peptide.as_str();
        peptide.starts_with("-.") || peptide.ends_with(".-")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Creates a PSM for tests
    pub(crate) fn psm(
        result_id: u64,
        scan: u32,
        charge: u8,
        peptide: &str,
        protein: &str,
        scores: &[(&str, &str)],
    ) -> PsmRecord {
        PsmRecord {
            scan,
            charge,
            peptide: peptide.to_string(),
            annotated_peptide: peptide.to_string(),
            protein: protein.to_string(),
            result_id,
            collision_mode: None,
            scores: scores
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            source: DataSource::Synopsis,
        }
    }

    #[test]
    fn test_score_lookup_is_case_insensitive() {
        let record = psm(1, 10, 2, "K.PEPTIDE.R", "Prot1", &[("XCorr", "2.5"), ("Note", "n/a")]);
        assert_eq!(record.score("xcorr"), Some(2.5));
        assert_eq!(record.score("Note"), None);
        assert_eq!(record.score_str("NOTE"), Some("n/a"));
        assert_eq!(record.score("DelCn"), None);
    }

    #[test]
    fn test_protein_terminal() {
        assert!(psm(1, 1, 1, "-.MPEPTIDE.R", "P", &[]).is_protein_terminal());
        assert!(psm(1, 1, 1, "K.PEPTIDE.-", "P", &[]).is_protein_terminal());
        assert!(!psm(1, 1, 1, "K.PEPTIDE.R", "P", &[]).is_protein_terminal());
    }

    #[test]
    fn test_data_source_tags() {
        assert_eq!(DataSource::from_tag("syn"), Some(DataSource::Synopsis));
        assert_eq!(DataSource::from_tag(" FHT"), Some(DataSource::FirstHits));
        assert_eq!(DataSource::from_tag("xyz"), None);
        assert_eq!(DataSource::FirstHits.tag(), "FHT");
    }
}
