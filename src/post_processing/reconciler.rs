// std imports
use std::collections::HashMap;
use std::fs::{remove_file, rename};
use std::path::{Path, PathBuf};

// 3rd party imports
use csv::StringRecord;
use metrics::counter;
use tracing::{debug, info, warn};

// internal imports
use crate::constants::{
    MAX_LOGGED_WARNINGS, MAX_MGF_LOOKUP_FAILURE_FRACTION, MAX_PRECURSOR_MASS_ERROR_FRACTION,
    MSGF_FIRST_HITS_RESULT_FILE_SUFFIX, SENTINEL_SPEC_PROB, SPEC_PROB_COLUMN, TSV_SEPARATOR,
};
use crate::functions::{format_scientific, parse_number};
use crate::io::msgf::protein_mods::rewrite_protein_mods;
use crate::io::msgf::result_file::{NormalizedResultRow, NormalizedResultWriter};
use crate::io::msgf::synthesized_input::{read_rows, SynthesizedInputRow};
use crate::io::psm::psm_record::{DataSource, ResultCode};
use crate::job::context::JobContext;
use crate::job::errors::post_processing_error::PostProcessingError;
use crate::synthesis::synthesizer::SynthesisSession;

/// Raw output column holding the peptide
const TITLE_COLUMN: &str = "Title";
/// Raw output column holding the scan or MGF index
const SCAN_COLUMN: &str = "Scan#";
/// Raw output column holding the charge
const CHARGE_COLUMN: &str = "Charge";

/// Marker of a precursor mass diagnostic in the score column
const PRECURSOR_MASS_DIAGNOSTIC: &str = "precursor mass";

/// Result of the reconciliation
///
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// Normalized synopsis results, replacing the raw tool output
    pub synopsis_path: PathBuf,
    /// Normalized first-hits results
    pub first_hits_path: PathBuf,
    /// True if first-hits rows were written
    pub first_hits_present: bool,
    /// Data rows of the normalized synopsis file
    pub synopsis_rows: usize,
}

/// Positions of the required raw output columns
///
struct RawColumns {
    title: usize,
    scan: usize,
    charge: usize,
    spec_prob: usize,
}

impl RawColumns {
    fn new(headers: &StringRecord, path: &Path) -> Result<Self, PostProcessingError> {
        let find = |name: &'static str| -> Result<usize, PostProcessingError> {
            headers
                .iter()
                .position(|header| header.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| PostProcessingError::MissingColumn(name, path.to_path_buf()))
        };
        Ok(Self {
            title: find(TITLE_COLUMN)?,
            scan: find(SCAN_COLUMN)?,
            charge: find(CHARGE_COLUMN)?,
            spec_prob: find(SPEC_PROB_COLUMN)?,
        })
    }
}

/// Counters of one reconciliation
///
#[derive(Debug, Default)]
struct Tally {
    rows: usize,
    precursor_mass_errors: usize,
    other_diagnostics: usize,
    mgf_lookup_failures: usize,
    unmatched_rows: usize,
    re_emitted_rows: usize,
}

/// Joins the raw MSGF output with the synthesized input, normalizes the scores and
/// replaces the raw output with the normalized synopsis results.
///
pub struct ResultPostProcessor<'a> {
    context: &'a JobContext,
    session: &'a SynthesisSession,
    protein_mods_path: Option<PathBuf>,
}

impl<'a> ResultPostProcessor<'a> {
    /// Creates a new post-processor
    ///
    /// # Arguments
    /// * `context` - Job context
    /// * `session` - Session of the synthesis which created the MSGF input
    /// * `protein_mods_path` - Protein modifications file to update, if the result type has one
    ///
    pub fn new(
        context: &'a JobContext,
        session: &'a SynthesisSession,
        protein_mods_path: Option<PathBuf>,
    ) -> Self {
        Self {
            context,
            session,
            protein_mods_path,
        }
    }

    /// Reconciles the raw tool output with the synthesized input
    ///
    /// # Arguments
    /// * `synthesized_input` - MSGF input file
    /// * `raw_output` - MSGF output file, replaced by the normalized synopsis results
    ///
    pub fn reconcile(
        &self,
        synthesized_input: &Path,
        raw_output: &Path,
    ) -> Result<ReconcileOutcome, PostProcessingError> {
        let input_rows: HashMap<ResultCode, SynthesizedInputRow> = read_rows(synthesized_input)
            .map_err(|err| PostProcessingError::ReadError(synthesized_input.to_path_buf(), err))?
            .into_iter()
            .map(|row| (row.result_code(), row))
            .collect();

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(TSV_SEPARATOR)
            .flexible(true)
            .quoting(false)
            .from_path(raw_output)
            .map_err(|err| PostProcessingError::ReadError(raw_output.to_path_buf(), err.into()))?;
        let headers = reader
            .headers()
            .map_err(|err| PostProcessingError::ReadError(raw_output.to_path_buf(), err.into()))?
            .clone();
        let columns = RawColumns::new(&headers, raw_output)?;

        let mut tally = Tally::default();
        let mut synopsis_rows: Vec<NormalizedResultRow> = Vec::new();
        let mut first_hits_rows: Vec<NormalizedResultRow> = Vec::new();

        for record in reader.records() {
            let record = record.map_err(|err| {
                PostProcessingError::ReadError(raw_output.to_path_buf(), err.into())
            })?;
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            tally.rows += 1;
            let field = |idx: usize| record.get(idx).unwrap_or_default().trim();

            let raw_scan: u32 = field(columns.scan).parse().unwrap_or(0);
            let charge: u8 = field(columns.charge).parse().unwrap_or(0);
            let code = ResultCode::new(raw_scan, charge, field(columns.title));
            let input_row = match input_rows.get(&code) {
                Some(input_row) => input_row,
                None => {
                    tally.unmatched_rows += 1;
                    if tally.unmatched_rows <= MAX_LOGGED_WARNINGS {
                        warn!(
                            "{} MSGF result {} has no counterpart in the MSGF input",
                            self.context.log_prefix(),
                            code
                        );
                    }
                    continue;
                }
            };

            let (spec_prob, notes) = self.normalize_score(field(columns.spec_prob), &mut tally);
            let scan = self.resolve_scan(raw_scan, &mut tally);

            let row = NormalizedResultRow {
                result_id: input_row.result_id,
                scan,
                charge,
                protein: input_row.protein.clone(),
                peptide: input_row.title.clone(),
                spec_prob,
                notes,
            };
            match input_row.source {
                DataSource::FirstHits => first_hits_rows.push(row),
                DataSource::Synopsis => {
                    let skip_rows: Vec<NormalizedResultRow> = self
                        .session
                        .skip_records(row.result_id)
                        .iter()
                        .map(|skip_record| NormalizedResultRow {
                            result_id: skip_record.result_id,
                            protein: skip_record.protein.clone(),
                            ..row.clone()
                        })
                        .collect();
                    tally.re_emitted_rows += skip_rows.len();
                    synopsis_rows.push(row);
                    synopsis_rows.extend(skip_rows);
                }
            }
        }

        self.check_quality(&tally)?;

        // normalized synopsis results replace the raw output
        let synopsis_tmp_path = raw_output.with_extension("txt.tmp");
        let synopsis_count = Self::write_rows(&synopsis_tmp_path, &synopsis_rows)?;
        Self::swap(&synopsis_tmp_path, raw_output)?;

        let first_hits_path = self.context.dataset_file(MSGF_FIRST_HITS_RESULT_FILE_SUFFIX);
        let first_hits_present = !first_hits_rows.is_empty();
        if first_hits_present {
            Self::write_rows(&first_hits_path, &first_hits_rows)?;
        }

        if let Some(protein_mods_path) = self
            .protein_mods_path
            .as_ref()
            .filter(|path| path.is_file())
        {
            let spec_probs: HashMap<u64, String> = synopsis_rows
                .iter()
                .map(|row| (row.result_id, row.spec_prob.clone()))
                .collect();
            let rewritten = rewrite_protein_mods(protein_mods_path, &spec_probs)
                .map_err(|err| PostProcessingError::WriteError(protein_mods_path.clone(), err))?;
            debug!(
                "{} Updated {} rows of `{}`",
                self.context.log_prefix(),
                rewritten,
                protein_mods_path.display()
            );
        }

        counter!("msgf_runner_reconciled_rows").increment(tally.rows as u64);
        counter!("msgf_runner_precursor_mass_errors")
            .increment(tally.precursor_mass_errors as u64);
        info!(
            "{} Reconciled {} MSGF results: {} synopsis rows ({} re-emitted duplicates), {} first-hits rows, {} diagnostics",
            self.context.log_prefix(),
            tally.rows,
            synopsis_count,
            tally.re_emitted_rows,
            first_hits_rows.len(),
            tally.precursor_mass_errors + tally.other_diagnostics
        );

        Ok(ReconcileOutcome {
            synopsis_path: raw_output.to_path_buf(),
            first_hits_path,
            first_hits_present,
            synopsis_rows: synopsis_count,
        })
    }

    /// Returns the score in scientific notation, or the sentinel with the diagnostic as note
    ///
    fn normalize_score(&self, value: &str, tally: &mut Tally) -> (String, String) {
        if let Some(spec_prob) = parse_number(value) {
            return (format_scientific(spec_prob), String::new());
        }
        if value.to_ascii_lowercase().contains(PRECURSOR_MASS_DIAGNOSTIC) {
            tally.precursor_mass_errors += 1;
        } else {
            tally.other_diagnostics += 1;
        }
        (SENTINEL_SPEC_PROB.to_string(), value.to_string())
    }

    /// Resolves the true scan number if the scan column holds an MGF index
    ///
    fn resolve_scan(&self, raw_scan: u32, tally: &mut Tally) -> u32 {
        let mgf_index = match self.session.mgf_index() {
            Some(mgf_index) => mgf_index,
            None => return raw_scan,
        };
        match mgf_index.get_scan(raw_scan as usize) {
            Some(scan) => scan,
            None => {
                tally.mgf_lookup_failures += 1;
                if tally.mgf_lookup_failures <= MAX_LOGGED_WARNINGS {
                    warn!(
                        "{} MGF index {} not found, scan number unknown",
                        self.context.log_prefix(),
                        raw_scan
                    );
                }
                0
            }
        }
    }

    fn check_quality(&self, tally: &Tally) -> Result<(), PostProcessingError> {
        let total = tally.rows as f64;
        if tally.precursor_mass_errors as f64 > total * MAX_PRECURSOR_MASS_ERROR_FRACTION {
            return Err(PostProcessingError::ExcessivePrecursorMassErrors {
                count: tally.precursor_mass_errors,
                total: tally.rows,
            });
        }
        if tally.mgf_lookup_failures as f64 > total * MAX_MGF_LOOKUP_FAILURE_FRACTION {
            return Err(PostProcessingError::ExcessiveMgfLookupFailures {
                count: tally.mgf_lookup_failures,
                total: tally.rows,
            });
        }
        if tally.precursor_mass_errors > 0 {
            warn!(
                "{} {} of {} rows report a precursor mass mismatch",
                self.context.log_prefix(),
                tally.precursor_mass_errors,
                tally.rows
            );
        }
        Ok(())
    }

    fn write_rows(path: &Path, rows: &[NormalizedResultRow]) -> Result<usize, PostProcessingError> {
        let write = || -> anyhow::Result<usize> {
            let mut writer = NormalizedResultWriter::create(path)?;
            for row in rows {
                writer.write_row(row)?;
            }
            writer.finish()
        };
        write().map_err(|err| PostProcessingError::WriteError(path.to_path_buf(), err))
    }

    /// Deletes the original and renames the replacement
    ///
    fn swap(replacement: &Path, original: &Path) -> Result<(), PostProcessingError> {
        if original.exists() {
            remove_file(original).map_err(|err| {
                PostProcessingError::ResultFileSwapFailed(original.to_path_buf(), err)
            })?;
        }
        rename(replacement, original)
            .map_err(|err| PostProcessingError::ResultFileSwapFailed(original.to_path_buf(), err))
    }
}

#[cfg(test)]
mod tests {
    use std::fs::{read_to_string, write};

    use super::*;
    use crate::io::msgf::result_file::read_normalized_results;
    use crate::io::psm::mod_summary::ModificationSymbols;
    use crate::io::psm::reader::PhrpTsvReader;
    use crate::post_processing::cached_scores::render_cached_scores;
    use crate::synthesis::result_format::ResultFormat;
    use crate::synthesis::synthesizer::{InputFileSynthesizer, SynthesisOptions};

    const SEQUEST_HEADER: &str =
        "HitNum\tScanNum\tChargeState\tPeptide\tReference\tXCorr\tDelCn\tNumTrypticEnds\n";

    /// Synthesizes the MSGF input for the given synopsis and first-hits rows
    ///
    fn synthesize(
        context: &JobContext,
        format: ResultFormat,
        synopsis: &str,
        first_hits: Option<&str>,
        mgf: Option<&str>,
        options: SynthesisOptions,
    ) -> (SynthesisSession, PathBuf) {
        let strategy = format.strategy();
        let synopsis_path = context
            .work_dir
            .join(strategy.synopsis_file_name(&context.dataset_name));
        write(&synopsis_path, synopsis).unwrap();
        let first_hits_path = first_hits.map(|content| {
            let path = context.work_dir.join(
                strategy
                    .first_hits_file_name(&context.dataset_name)
                    .unwrap(),
            );
            write(&path, content).unwrap();
            path
        });
        let mgf_path = mgf.map(|content| {
            let path = context.work_dir.join("QC.mgf");
            write(&path, content).unwrap();
            path
        });

        let reader = PhrpTsvReader::new(strategy.columns, ModificationSymbols::new());
        let synthesizer = InputFileSynthesizer::new(context, reader, options);
        let mut session = SynthesisSession::new(format);
        let (input_path, _) = synthesizer
            .synthesize(
                &mut session,
                &synopsis_path,
                first_hits_path.as_deref(),
                mgf_path.as_deref(),
            )
            .unwrap();
        (session, input_path)
    }

    /// Writes an MSGF-like output echoing the input with the given scores
    ///
    fn write_raw_output(context: &JobContext, input_path: &Path, scores: &[&str]) -> PathBuf {
        let input = read_to_string(input_path).unwrap();
        let mut output = String::new();
        for (idx, line) in input.lines().enumerate() {
            if idx == 0 {
                output.push_str(&format!("{}\tSpecProb\n", line));
            } else {
                output.push_str(&format!("{}\t{}\n", line, scores[idx - 1]));
            }
        }
        let path = context.dataset_file("_MSGF.txt");
        write(&path, output).unwrap();
        path
    }

    fn sequest_rows(count: usize) -> String {
        let mut content = SEQUEST_HEADER.to_string();
        for idx in 0..count {
            content.push_str(&format!(
                "{}\t{}\t2\tK.PEPTIDE{}K.A\tProt{}\t3.0\t0.1\t2\n",
                idx + 1,
                1000 + idx,
                idx,
                idx
            ));
        }
        content
    }

    #[test]
    fn test_reconcile_normalizes_and_re_emits_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let context = JobContext::new("QC", dir.path(), 1, 2);
        let synopsis = format!(
            "{}1\t100\t2\tK.PEPTIDEK.A\tProt1\t3.0\t0.1\t2\n\
             2\t100\t2\tK.PEPTIDEK.A\tProt2\t3.0\t0.1\t2\n\
             4\t102\t3\tK.OTHERPEP.A\tProt4\t3.0\t0.0\t2\n",
            SEQUEST_HEADER
        );
        let first_hits = format!("{}5\t103\t2\tK.FIRSTHIT.A\tProt5\t0.1\t0.1\t2\n", SEQUEST_HEADER);
        let (session, input_path) = synthesize(
            &context,
            ResultFormat::Sequest,
            &synopsis,
            Some(&first_hits),
            None,
            SynthesisOptions::default(),
        );
        let raw_output = write_raw_output(&context, &input_path, &["1.234567e-10", "0.5", "3e-3"]);

        let processor = ResultPostProcessor::new(&context, &session, None);
        let outcome = processor.reconcile(&input_path, &raw_output).unwrap();

        assert_eq!(outcome.synopsis_path, raw_output);
        assert!(outcome.first_hits_present);
        assert_eq!(outcome.synopsis_rows, 3);
        assert!(!raw_output.with_extension("txt.tmp").exists());

        let rows = read_normalized_results(&outcome.synopsis_path).unwrap();
        let summary: Vec<(u64, &str, &str)> = rows
            .iter()
            .map(|row| (row.result_id, row.protein.as_str(), row.spec_prob.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, "Prot1", "1.23457E-10"),
                (2, "Prot2", "1.23457E-10"),
                (4, "Prot4", "5.00000E-01"),
            ]
        );

        let first_hits_rows = read_normalized_results(&outcome.first_hits_path).unwrap();
        assert_eq!(first_hits_rows.len(), 1);
        assert_eq!(first_hits_rows[0].result_id, 5);
        assert_eq!(first_hits_rows[0].spec_prob, "3.00000E-03");
    }

    #[test]
    fn test_numeric_scores_keep_row_count() {
        let dir = tempfile::tempdir().unwrap();
        let context = JobContext::new("QC", dir.path(), 1, 2);
        let (session, input_path) = synthesize(
            &context,
            ResultFormat::Sequest,
            &sequest_rows(5),
            None,
            None,
            SynthesisOptions::default(),
        );
        let scores = ["1", "0.1", "1e-20", "2.5E-05", "0.000123456789"];
        let raw_output = write_raw_output(&context, &input_path, &scores);

        let processor = ResultPostProcessor::new(&context, &session, None);
        let outcome = processor.reconcile(&input_path, &raw_output).unwrap();
        assert!(!outcome.first_hits_present);

        let spec_probs: Vec<String> = read_normalized_results(&outcome.synopsis_path)
            .unwrap()
            .into_iter()
            .map(|row| row.spec_prob)
            .collect();
        assert_eq!(
            spec_probs,
            vec!["1.00000E+00", "1.00000E-01", "1.00000E-20", "2.50000E-05", "1.23457E-04"]
        );
    }

    #[test]
    fn test_precursor_mass_diagnostic_is_replaced_by_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let context = JobContext::new("QC", dir.path(), 1, 2);
        let (session, input_path) = synthesize(
            &context,
            ResultFormat::Sequest,
            &sequest_rows(10),
            None,
            None,
            SynthesisOptions::default(),
        );
        let diagnostic = "N/A: precursor mass != peptide mass (10.1 vs 12.3)";
        let mut scores = vec!["1e-5"; 10];
        scores[3] = diagnostic;
        let raw_output = write_raw_output(&context, &input_path, &scores);

        let processor = ResultPostProcessor::new(&context, &session, None);
        let outcome = processor.reconcile(&input_path, &raw_output).unwrap();

        let rows = read_normalized_results(&outcome.synopsis_path).unwrap();
        assert_eq!(rows[3].spec_prob, "1");
        assert_eq!(rows[3].notes, diagnostic);
        assert_eq!(rows[4].notes, "");
    }

    #[test]
    fn test_excessive_precursor_mass_errors() {
        let dir = tempfile::tempdir().unwrap();
        let context = JobContext::new("QC", dir.path(), 1, 2);
        let (session, input_path) = synthesize(
            &context,
            ResultFormat::Sequest,
            &sequest_rows(10),
            None,
            None,
            SynthesisOptions::default(),
        );
        let diagnostic = "N/A: precursor mass != peptide mass (10.1 vs 12.3)";
        let mut scores = vec!["1e-5"; 10];
        scores[0] = diagnostic;
        scores[1] = diagnostic;
        let raw_output = write_raw_output(&context, &input_path, &scores);

        let processor = ResultPostProcessor::new(&context, &session, None);
        let result = processor.reconcile(&input_path, &raw_output);
        assert!(matches!(
            result,
            Err(PostProcessingError::ExcessivePrecursorMassErrors { count: 2, total: 10 })
        ));
    }

    #[test]
    fn test_mgf_indices_are_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let context = JobContext::new("QC", dir.path(), 1, 2);
        let mgf = "BEGIN IONS\nSCANS=1000\nCHARGE=2+\n100 1\nEND IONS\n\
                   BEGIN IONS\nSCANS=1001\nCHARGE=2+\n100 1\nEND IONS\n";
        let (session, input_path) = synthesize(
            &context,
            ResultFormat::Sequest,
            &sequest_rows(2),
            None,
            Some(mgf),
            SynthesisOptions::default(),
        );
        let raw_output = write_raw_output(&context, &input_path, &["1e-5", "1e-6"]);

        let processor = ResultPostProcessor::new(&context, &session, None);
        let outcome = processor.reconcile(&input_path, &raw_output).unwrap();
        let scans: Vec<u32> = read_normalized_results(&outcome.synopsis_path)
            .unwrap()
            .iter()
            .map(|row| row.scan)
            .collect();
        assert_eq!(scans, vec![1000, 1001]);
    }

    #[test]
    fn test_excessive_mgf_lookup_failures() {
        let dir = tempfile::tempdir().unwrap();
        let context = JobContext::new("QC", dir.path(), 1, 2);
        // scan 1001 is missing from the MGF file
        let mgf = "BEGIN IONS\nSCANS=1000\nCHARGE=2+\n100 1\nEND IONS\n";
        let (session, input_path) = synthesize(
            &context,
            ResultFormat::Sequest,
            &sequest_rows(2),
            None,
            Some(mgf),
            SynthesisOptions::default(),
        );
        let raw_output = write_raw_output(&context, &input_path, &["1e-5", "1e-6"]);

        let processor = ResultPostProcessor::new(&context, &session, None);
        let result = processor.reconcile(&input_path, &raw_output);
        assert!(matches!(
            result,
            Err(PostProcessingError::ExcessiveMgfLookupFailures { count: 1, total: 2 })
        ));
    }

    #[test]
    fn test_missing_spec_prob_column() {
        let dir = tempfile::tempdir().unwrap();
        let context = JobContext::new("QC", dir.path(), 1, 2);
        let (session, input_path) = synthesize(
            &context,
            ResultFormat::Sequest,
            &sequest_rows(1),
            None,
            None,
            SynthesisOptions::default(),
        );
        let raw_output = context.dataset_file("_MSGF.txt");
        write(&raw_output, read_to_string(&input_path).unwrap()).unwrap();

        let processor = ResultPostProcessor::new(&context, &session, None);
        let result = processor.reconcile(&input_path, &raw_output);
        assert!(matches!(
            result,
            Err(PostProcessingError::MissingColumn(SPEC_PROB_COLUMN, _))
        ));
    }

    #[test]
    fn test_cached_scores_and_protein_mods() {
        let dir = tempfile::tempdir().unwrap();
        let context = JobContext::new("QC", dir.path(), 1, 2);
        let synopsis = "ResultID\tScan\tFragMethod\tCharge\tPeptide\tProtein\tMSGFDB_SpecEValue\n\
                        1\t100\tCID\t2\tK.PEPTIDE.R\tProt1\t1.5E-12\n\
                        2\t101\tETD\t3\tK.SAMPLER.R\tProt2\t2.5E-08\n";
        let options = SynthesisOptions {
            ignore_filters: false,
            use_cached_scores: true,
        };
        let (session, input_path) =
            synthesize(&context, ResultFormat::MsgfPlus, synopsis, None, None, options);
        let protein_mods_path = ResultFormat::MsgfPlus
            .strategy()
            .protein_mods_file_path(dir.path(), "QC")
            .unwrap();
        write(
            &protein_mods_path,
            "ResultID\tPeptide\tProtein\tMSGF_SpecProb\n1\tK.PEPTIDE.R\tProt1\t0\n",
        )
        .unwrap();

        let raw_output = context.dataset_file("_MSGF.txt");
        assert_eq!(render_cached_scores(&session, &input_path, &raw_output).unwrap(), 2);

        let processor =
            ResultPostProcessor::new(&context, &session, Some(protein_mods_path.clone()));
        let outcome = processor.reconcile(&input_path, &raw_output).unwrap();

        let spec_probs: Vec<String> = read_normalized_results(&outcome.synopsis_path)
            .unwrap()
            .into_iter()
            .map(|row| row.spec_prob)
            .collect();
        assert_eq!(spec_probs, vec!["1.50000E-12", "2.50000E-08"]);
        assert!(read_to_string(&protein_mods_path)
            .unwrap()
            .contains("Prot1\t1.50000E-12"));
    }
}
