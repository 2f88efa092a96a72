// std imports
use std::fmt::Display;
use std::path::{Path, PathBuf};

// internal imports
use crate::io::psm::psm_record::PsmRecord;
use crate::io::psm::reader::PsmColumnMap;

/// Upstream search engine result formats MSGF can rescore
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultFormat {
    Sequest,
    XTandem,
    Inspect,
    Moda,
    ModPlus,
    MsgfPlus,
}

/// Per-format file naming, columns and filter predicate
///
pub struct FormatStrategy {
    /// Short tag, also used as tool name in the run summary
    pub tag: &'static str,
    /// Suffix appended to the dataset name for the synopsis file
    synopsis_suffix: &'static str,
    /// Suffix appended to the dataset name for the first-hits file, if the format has one
    first_hits_suffix: Option<&'static str>,
    /// Identity columns
    pub columns: PsmColumnMap,
    /// Acceptance rule for synopsis records
    filter: fn(&PsmRecord) -> bool,
    /// Column with a precomputed spectral probability
    pub cached_score_columns: &'static [&'static str],
    /// True if a protein modifications file accompanies the synopsis file
    pub has_protein_mods: bool,
}

impl FormatStrategy {
    /// Synopsis file name for a dataset
    ///
    pub fn synopsis_file_name(&self, dataset: &str) -> String {
        format!("{}{}", dataset, self.synopsis_suffix)
    }

    /// First-hits file name for a dataset, `None` if the format has no first-hits tier
    ///
    pub fn first_hits_file_name(&self, dataset: &str) -> Option<String> {
        self.first_hits_suffix
            .map(|suffix| format!("{}{}", dataset, suffix))
    }

    /// Modification summary written next to the synopsis file, e.g. `Dataset_syn_ModSummary.txt`
    ///
    pub fn mod_summary_file_path(&self, work_dir: &Path, dataset: &str) -> PathBuf {
        work_dir.join(Self::with_stem_suffix(&self.synopsis_file_name(dataset), "_ModSummary.txt"))
    }

    /// Protein modifications file written next to the synopsis file
    ///
    pub fn protein_mods_file_path(&self, work_dir: &Path, dataset: &str) -> Option<PathBuf> {
        if !self.has_protein_mods {
            return None;
        }
        Some(work_dir.join(Self::with_stem_suffix(
            &self.synopsis_file_name(dataset),
            "_ProteinMods.txt",
        )))
    }

    /// Returns true if the record passes the format's acceptance rule
    ///
    pub fn passes_filter(&self, record: &PsmRecord) -> bool {
        (self.filter)(record)
    }

    fn with_stem_suffix(file_name: &str, suffix: &str) -> String {
        let stem = file_name.strip_suffix(".txt").unwrap_or(file_name);
        format!("{}{}", stem, suffix)
    }
}

impl ResultFormat {
    /// Resolves the job's `ResultType` parameter
    ///
    /// # Arguments
    /// * `result_type` - Value of the `ResultType` job parameter
    ///
    pub fn from_result_type(result_type: &str) -> Option<Self> {
        match result_type.trim().to_ascii_lowercase().as_str() {
            "peptide_hit" | "sequest" => Some(Self::Sequest),
            "xt_peptide_hit" | "xtandem" => Some(Self::XTandem),
            "in_peptide_hit" | "inspect" => Some(Self::Inspect),
            "moda_peptide_hit" | "moda" => Some(Self::Moda),
            "modplus_peptide_hit" | "modplus" => Some(Self::ModPlus),
            "msg_peptide_hit" | "msgfplus" | "msgfdb" => Some(Self::MsgfPlus),
            _ => None,
        }
    }

    /// Returns the strategy of the format
    ///
    pub fn strategy(&self) -> &'static FormatStrategy {
        match self {
            Self::Sequest => &SEQUEST,
            Self::XTandem => &XTANDEM,
            Self::Inspect => &INSPECT,
            Self::Moda => &MODA,
            Self::ModPlus => &MODPLUS,
            Self::MsgfPlus => &MSGFPLUS,
        }
    }
}

impl Display for ResultFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.strategy().tag)
    }
}

const SEQUEST: FormatStrategy = FormatStrategy {
    tag: "Sequest",
    synopsis_suffix: "_syn.txt",
    first_hits_suffix: Some("_fht.txt"),
    columns: PsmColumnMap {
        result_id: "HitNum",
        scan: "ScanNum",
        charge: "ChargeState",
        peptide: "Peptide",
        protein: "Reference",
        collision_mode: None,
    },
    filter: sequest_filter,
    cached_score_columns: &[],
    has_protein_mods: true,
};

const XTANDEM: FormatStrategy = FormatStrategy {
    tag: "XTandem",
    synopsis_suffix: "_xt.txt",
    first_hits_suffix: None,
    columns: PsmColumnMap {
        result_id: "Result_ID",
        scan: "Scan",
        charge: "Charge",
        peptide: "Peptide_Sequence",
        protein: "Protein_Name",
        collision_mode: None,
    },
    filter: xtandem_filter,
    cached_score_columns: &[],
    has_protein_mods: false,
};

const INSPECT: FormatStrategy = FormatStrategy {
    tag: "Inspect",
    synopsis_suffix: "_inspect_syn.txt",
    first_hits_suffix: Some("_inspect_fht.txt"),
    columns: PsmColumnMap {
        result_id: "ResultID",
        scan: "Scan",
        charge: "Charge",
        peptide: "Peptide",
        protein: "Protein",
        collision_mode: None,
    },
    filter: inspect_filter,
    cached_score_columns: &[],
    has_protein_mods: true,
};

const MODA: FormatStrategy = FormatStrategy {
    tag: "MODa",
    synopsis_suffix: "_moda_syn.txt",
    first_hits_suffix: Some("_moda_fht.txt"),
    columns: PsmColumnMap {
        result_id: "ResultID",
        scan: "Scan",
        charge: "Charge",
        peptide: "Peptide",
        protein: "Protein",
        collision_mode: None,
    },
    filter: moda_filter,
    cached_score_columns: &[],
    has_protein_mods: true,
};

const MODPLUS: FormatStrategy = FormatStrategy {
    tag: "MODPlus",
    synopsis_suffix: "_modp_syn.txt",
    first_hits_suffix: Some("_modp_fht.txt"),
    columns: PsmColumnMap {
        result_id: "ResultID",
        scan: "Scan",
        charge: "Charge",
        peptide: "Peptide",
        protein: "Protein",
        collision_mode: None,
    },
    filter: modplus_filter,
    cached_score_columns: &[],
    has_protein_mods: true,
};

const MSGFPLUS: FormatStrategy = FormatStrategy {
    tag: "MSGFPlus",
    synopsis_suffix: "_msgfplus_syn.txt",
    first_hits_suffix: Some("_msgfplus_fht.txt"),
    columns: PsmColumnMap {
        result_id: "ResultID",
        scan: "Scan",
        charge: "Charge",
        peptide: "Peptide",
        protein: "Protein",
        collision_mode: Some("FragMethod"),
    },
    filter: msgfplus_filter,
    cached_score_columns: &["MSGFDB_SpecEValue", "MSGFDB_SpecProb", "SpecProb"],
    has_protein_mods: true,
};

/// Fully tryptic (both ends) or located at a protein terminus
///
fn is_tryptic_or_terminal(record: &PsmRecord) -> bool {
    record.is_protein_terminal()
        || record
            .score("NumTrypticEnds")
            .map(|ends| ends >= 2.0)
            .unwrap_or(false)
}

fn sequest_filter(record: &PsmRecord) -> bool {
    let (xcorr, del_cn) = match (record.score("XCorr"), record.score("DelCn")) {
        (Some(xcorr), Some(del_cn)) => (xcorr, del_cn),
        _ => return false,
    };
    if del_cn > 0.25 {
        return false;
    }
    if is_tryptic_or_terminal(record) {
        match record.charge {
            0..=2 => xcorr >= 1.5,
            _ => xcorr >= 2.2,
        }
    } else {
        match record.charge {
            0..=1 => xcorr >= 1.5,
            2 => xcorr >= 2.0,
            _ => xcorr >= 2.5,
        }
    }
}

/// Expectation value column already holds log10(E-value)
///
fn xtandem_filter(record: &PsmRecord) -> bool {
    record
        .score("Peptide_Expectation_Value_Log(e)")
        .map(|log_e_value| log_e_value <= -0.3)
        .unwrap_or(false)
}

fn inspect_filter(record: &PsmRecord) -> bool {
    record.score("PValue").map(|p| p <= 0.2).unwrap_or(false)
        || record
            .score("TotalPRMScore")
            .map(|score| score >= 50.0)
            .unwrap_or(false)
        || record.score("FScore").map(|f| f >= 0.0).unwrap_or(false)
}

fn moda_filter(record: &PsmRecord) -> bool {
    record
        .score("Probability")
        .map(|probability| probability >= 0.2)
        .unwrap_or(false)
}

fn modplus_filter(record: &PsmRecord) -> bool {
    record
        .score("Probability")
        .map(|probability| probability >= 0.05)
        .unwrap_or(false)
}

fn msgfplus_filter(_record: &PsmRecord) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::psm::psm_record::tests::psm;

    fn sequest(result_id: u64, charge: u8, peptide: &str, scores: [&str; 3]) -> PsmRecord {
        psm(
            result_id,
            100,
            charge,
            peptide,
            "Prot1",
            &[
                ("XCorr", scores[0]),
                ("DelCn", scores[1]),
                ("NumTrypticEnds", scores[2]),
            ],
        )
    }

    fn scored(scores: &[(&str, &str)]) -> PsmRecord {
        psm(1, 1, 2, "P", "X", scores)
    }

    #[test]
    fn test_sequest_non_tryptic_thresholds() {
        let strategy = ResultFormat::Sequest.strategy();
        let records = [
            sequest(1, 1, "K.PEPTIDE.A", ["1.2", "0.1", "0"]),
            sequest(2, 2, "K.PEPTIDE.A", ["1.6", "0.1", "0"]),
            sequest(3, 3, "K.PEPTIDE.A", ["2.0", "0.1", "0"]),
        ];
        let kept: Vec<u64> = records
            .iter()
            .filter(|record| strategy.passes_filter(record))
            .map(|record| record.result_id)
            .collect();
        assert!(kept.is_empty());
    }

    #[test]
    fn test_sequest_tryptic_and_terminal() {
        let strategy = ResultFormat::Sequest.strategy();
        let tryptic = sequest(1, 2, "K.PEPTIDEK.A", ["1.6", "0.1", "2"]);
        assert!(strategy.passes_filter(&tryptic));
        let terminal = sequest(2, 3, "-.PEPTIDE.A", ["2.2", "0.25", "1"]);
        assert!(strategy.passes_filter(&terminal));
        let high_del_cn = sequest(3, 2, "K.PEPTIDEK.A", ["5.0", "0.26", "2"]);
        assert!(!strategy.passes_filter(&high_del_cn));
    }

    #[test]
    fn test_other_filters() {
        let xtandem = ResultFormat::XTandem.strategy();
        let expectation = "Peptide_Expectation_Value_Log(e)";
        assert!(xtandem.passes_filter(&scored(&[(expectation, "-0.3")])));
        assert!(!xtandem.passes_filter(&scored(&[(expectation, "-0.29")])));

        let inspect = ResultFormat::Inspect.strategy();
        let inspect_scores = |prm_score| {
            scored(&[
                ("PValue", "0.5"),
                ("TotalPRMScore", prm_score),
                ("FScore", "-1"),
            ])
        };
        assert!(inspect.passes_filter(&inspect_scores("50")));
        assert!(!inspect.passes_filter(&inspect_scores("49")));

        let moda = ResultFormat::Moda.strategy();
        assert!(moda.passes_filter(&scored(&[("Probability", "0.2")])));
        assert!(!moda.passes_filter(&scored(&[("Probability", "0.19")])));
        let mod_plus = ResultFormat::ModPlus.strategy();
        assert!(mod_plus.passes_filter(&scored(&[("Probability", "0.05")])));
        assert!(ResultFormat::MsgfPlus.strategy().passes_filter(&scored(&[])));
    }

    #[test]
    fn test_file_names() {
        let sequest = ResultFormat::Sequest.strategy();
        assert_eq!(sequest.synopsis_file_name("QC"), "QC_syn.txt");
        assert_eq!(sequest.first_hits_file_name("QC").as_deref(), Some("QC_fht.txt"));
        assert_eq!(
            sequest.mod_summary_file_path(Path::new("/tmp"), "QC"),
            PathBuf::from("/tmp/QC_syn_ModSummary.txt")
        );
        assert!(ResultFormat::XTandem.strategy().first_hits_file_name("QC").is_none());
        assert_eq!(
            ResultFormat::from_result_type("MSG_Peptide_Hit"),
            Some(ResultFormat::MsgfPlus)
        );
    }
}
