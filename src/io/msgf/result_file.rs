// std imports
use std::fs::File;
use std::path::{Path, PathBuf};

// 3rd party imports
use anyhow::{bail, Context, Result};
use csv::{QuoteStyle, StringRecord, WriterBuilder};

// internal imports
use crate::constants::{NORMALIZED_RESULT_HEADER, TSV_SEPARATOR};

/// One row of the normalized MSGF result file
///
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResultRow {
    pub result_id: u64,
    pub scan: u32,
    pub charge: u8,
    pub protein: String,
    pub peptide: String,
    /// Spectral probability in scientific notation or the sentinel value
    pub spec_prob: String,
    /// Diagnostic of the tool if it reported no spectral probability
    pub notes: String,
}

/// Writer for normalized MSGF result files
///
pub struct NormalizedResultWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
    row_count: usize,
}

impl NormalizedResultWriter {
    /// Creates the file and writes the header
    ///
    /// # Arguments
    /// * `path` - Path to the result file
    ///
    pub fn create(path: &Path) -> Result<Self> {
        let mut writer = WriterBuilder::new()
            .delimiter(TSV_SEPARATOR)
            .quote_style(QuoteStyle::Never)
            .from_path(path)
            .with_context(|| format!("Error when creating `{}`", path.display()))?;
        writer.write_record(NORMALIZED_RESULT_HEADER)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            row_count: 0,
        })
    }

    pub fn write_row(&mut self, row: &NormalizedResultRow) -> Result<()> {
        self.writer
            .write_record([
                &row.result_id.to_string(),
                &row.scan.to_string(),
                &row.charge.to_string(),
                row.protein.as_str(),
                row.peptide.as_str(),
                row.spec_prob.as_str(),
                row.notes.as_str(),
            ])
            .with_context(|| format!("Error when writing to `{}`", self.path.display()))?;
        self.row_count += 1;
        Ok(())
    }

    /// Flushes the file and returns the number of data rows
    ///
    pub fn finish(mut self) -> Result<usize> {
        self.writer
            .flush()
            .with_context(|| format!("Error when flushing `{}`", self.path.display()))?;
        Ok(self.row_count)
    }
}

/// Reads a normalized result file
///
/// # Arguments
/// * `path` - Path to the result file
///
pub fn read_normalized_results(path: &Path) -> Result<Vec<NormalizedResultRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(TSV_SEPARATOR)
        .flexible(true)
        .quoting(false)
        .from_path(path)
        .with_context(|| format!("Error when opening `{}`", path.display()))?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        rows.push(parse_row(&record).with_context(|| {
            format!(
                "Invalid row `{}` in `{}`",
                record.iter().collect::<Vec<_>>().join("\t"),
                path.display()
            )
        })?);
    }
    Ok(rows)
}

fn parse_row(record: &StringRecord) -> Result<NormalizedResultRow> {
    if record.len() < NORMALIZED_RESULT_HEADER.len() - 1 {
        bail!("Too few columns");
    }
    let field = |idx: usize| record.get(idx).unwrap_or_default().trim();
    Ok(NormalizedResultRow {
        result_id: field(0).parse()?,
        scan: field(1).parse()?,
        charge: field(2).parse()?,
        protein: field(3).to_string(),
        peptide: field(4).to_string(),
        spec_prob: field(5).to_string(),
        notes: field(6).to_string(),
    })
}
