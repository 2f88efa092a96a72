// std imports
use std::collections::HashSet;

// internal imports
use crate::functions::parse_number;
use crate::io::msgf::result_file::NormalizedResultRow;

/// Pass-rate statistics of a normalized MSGF result file
///
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SummaryStatistics {
    pub total_psms: usize,
    /// PSMs with a spectral probability at or below the threshold
    pub passing_psms: usize,
    /// Distinct peptides (without prefix and suffix residues) of the passing PSMs
    pub unique_peptides: usize,
    /// Distinct proteins of the passing PSMs
    pub unique_proteins: usize,
    pub percent_passing: f64,
}

impl SummaryStatistics {
    /// Computes the statistics
    ///
    /// # Arguments
    /// * `rows` - Normalized results
    /// * `spec_prob_threshold` - Maximum spectral probability of a passing PSM
    ///
    pub fn compute(rows: &[NormalizedResultRow], spec_prob_threshold: f64) -> Self {
        let mut peptides: HashSet<&str> = HashSet::new();
        let mut proteins: HashSet<&str> = HashSet::new();
        let mut passing_psms = 0;
        for row in rows {
            // sentinel rows carry a note and never pass
            let passes = row.notes.is_empty()
                && parse_number(&row.spec_prob)
                    .map(|spec_prob| spec_prob <= spec_prob_threshold)
                    .unwrap_or(false);
            if !passes {
                continue;
            }
            passing_psms += 1;
            peptides.insert(clean_sequence(&row.peptide));
            proteins.insert(row.protein.as_str());
        }
        let percent_passing = if rows.is_empty() {
            0.0
        } else {
            passing_psms as f64 * 100.0 / rows.len() as f64
        };
        Self {
            total_psms: rows.len(),
            passing_psms,
            unique_peptides: peptides.len(),
            unique_proteins: proteins.len(),
            percent_passing,
        }
    }

    /// Named measurements as written into the XML payload
    ///
    pub fn measurements(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Total_PSMs", self.total_psms.to_string()),
            ("Passing_PSMs", self.passing_psms.to_string()),
            ("Unique_Peptides", self.unique_peptides.to_string()),
            ("Unique_Proteins", self.unique_proteins.to_string()),
            ("Percent_PSMs_Passing", format!("{:.2}", self.percent_passing)),
        ]
    }
}

/// Removes prefix and suffix residues, e.g. `K.PEPTIDE.R` becomes `PEPTIDE`
///
fn clean_sequence(peptide: &str) -> &str {
    let bytes = peptide.as_bytes();
    if bytes.len() >= 4 && bytes[1] == b'.' && bytes[bytes.len() - 2] == b'.' {
        &peptide[2..peptide.len() - 2]
    } else {
        peptide
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(
        result_id: u64,
        peptide: &str,
        protein: &str,
        spec_prob: &str,
        notes: &str,
    ) -> NormalizedResultRow {
        NormalizedResultRow {
            result_id,
            scan: result_id as u32,
            charge: 2,
            protein: protein.to_string(),
            peptide: peptide.to_string(),
            spec_prob: spec_prob.to_string(),
            notes: notes.to_string(),
        }
    }

    #[test]
    fn test_compute() {
        let rows = vec![
            row(1, "K.PEPTIDE.R", "Prot1", "1.00000E-12", ""),
            row(2, "R.PEPTIDE.A", "Prot2", "5.00000E-11", ""),
            row(3, "K.OTHER.R", "Prot1", "1.00000E-10", ""),
            row(4, "K.WEAK.R", "Prot3", "1.00000E-05", ""),
            row(5, "K.BROKEN.R", "Prot4", "1", "N/A: precursor mass != peptide mass"),
        ];
        let statistics = SummaryStatistics::compute(&rows, 1e-10);
        assert_eq!(statistics.total_psms, 5);
        assert_eq!(statistics.passing_psms, 3);
        assert_eq!(statistics.unique_peptides, 2);
        assert_eq!(statistics.unique_proteins, 2);
        assert_eq!(statistics.percent_passing, 60.0);
        assert_eq!(statistics.measurements()[4], ("Percent_PSMs_Passing", "60.00".to_string()));
    }

    #[test]
    fn test_empty() {
        let statistics = SummaryStatistics::compute(&[], 1e-10);
        assert_eq!(statistics.total_psms, 0);
        assert_eq!(statistics.percent_passing, 0.0);
    }

    #[test]
    fn test_clean_sequence() {
        assert_eq!(clean_sequence("K.PEPTIDE.R"), "PEPTIDE");
        assert_eq!(clean_sequence("-.PEPTIDE.-"), "PEPTIDE");
        assert_eq!(clean_sequence("PEPTIDE"), "PEPTIDE");
    }
}
