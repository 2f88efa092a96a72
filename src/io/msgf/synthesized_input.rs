// std imports
use std::fs::File;
use std::path::{Path, PathBuf};

// 3rd party imports
use anyhow::{bail, Context, Result};
use csv::{QuoteStyle, StringRecord, WriterBuilder};

// internal imports
use crate::constants::{SYNTHESIZED_INPUT_HEADER, TSV_SEPARATOR};
use crate::io::psm::psm_record::{DataSource, ResultCode};

/// Name of the column holding the fragmentation mode
///
pub const COLLISION_MODE_COLUMN: &str = "Collision_Mode";

/// One row of the synthesized MSGF input file
///
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedInputRow {
    /// Spectrum file the scan belongs to
    pub spectrum_file: String,
    /// Peptide as written by the upstream search
    pub title: String,
    /// Scan number, or 1-based spectrum index for MGF instrument data
    pub scan: u32,
    /// Peptide with modification masses
    pub annotation: String,
    pub charge: u8,
    pub protein: String,
    pub result_id: u64,
    pub source: DataSource,
    pub collision_mode: String,
}

impl SynthesizedInputRow {
    /// Result code of the row. For MGF instrument data the scan is the spectrum index.
    ///
    pub fn result_code(&self) -> ResultCode {
        ResultCode::new(self.scan, self.charge, &self.title)
    }

    fn from_record(record: &StringRecord) -> Result<Self> {
        if record.len() < SYNTHESIZED_INPUT_HEADER.len() {
            bail!(
                "Expected {} columns, found {}",
                SYNTHESIZED_INPUT_HEADER.len(),
                record.len()
            );
        }
        let field = |idx: usize| record.get(idx).unwrap_or_default().trim();
        Ok(Self {
            spectrum_file: field(0).to_string(),
            title: field(1).to_string(),
            scan: field(2)
                .parse()
                .with_context(|| format!("Invalid scan `{}`", field(2)))?,
            annotation: field(3).to_string(),
            charge: field(4)
                .parse()
                .with_context(|| format!("Invalid charge `{}`", field(4)))?,
            protein: field(5).to_string(),
            result_id: field(6)
                .parse()
                .with_context(|| format!("Invalid result ID `{}`", field(6)))?,
            source: DataSource::from_tag(field(7))
                .with_context(|| format!("Invalid data source `{}`", field(7)))?,
            collision_mode: field(8).to_string(),
        })
    }
}

/// Writes the synthesized MSGF input file, header first
///
pub struct SynthesizedInputWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
    line_count: usize,
}

impl SynthesizedInputWriter {
    /// Creates the file and writes the header
    ///
    /// # Arguments
    /// * `path` - Path to the synthesized input file
    ///
    pub fn create(path: &Path) -> Result<Self> {
        let mut writer = WriterBuilder::new()
            .delimiter(TSV_SEPARATOR)
            .quote_style(QuoteStyle::Never)
            .from_path(path)
            .with_context(|| format!("Error when creating `{}`", path.display()))?;
        writer.write_record(SYNTHESIZED_INPUT_HEADER)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            line_count: 1,
        })
    }

    /// Appends a row
    ///
    pub fn write_row(&mut self, row: &SynthesizedInputRow) -> Result<()> {
        self.writer
            .write_record([
                row.spectrum_file.as_str(),
                row.title.as_str(),
                &row.scan.to_string(),
                row.annotation.as_str(),
                &row.charge.to_string(),
                row.protein.as_str(),
                &row.result_id.to_string(),
                row.source.tag(),
                row.collision_mode.as_str(),
            ])
            .with_context(|| format!("Error when writing to `{}`", self.path.display()))?;
        self.line_count += 1;
        Ok(())
    }

    /// Lines written so far, including the header
    ///
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Flushes the file and returns the number of lines, including the header
    ///
    pub fn finish(mut self) -> Result<usize> {
        self.writer
            .flush()
            .with_context(|| format!("Error when flushing `{}`", self.path.display()))?;
        Ok(self.line_count)
    }
}

/// Reads all rows of a synthesized input file
///
/// # Arguments
/// * `path` - Path to the synthesized input file
///
pub fn read_rows(path: &Path) -> Result<Vec<SynthesizedInputRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(TSV_SEPARATOR)
        .flexible(true)
        .quoting(false)
        .from_path(path)
        .with_context(|| format!("Error when opening `{}`", path.display()))?;
    let mut rows = Vec::new();
    for (line_idx, record) in reader.records().enumerate() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        rows.push(
            SynthesizedInputRow::from_record(&record)
                .with_context(|| format!("Line {} of `{}`", line_idx + 2, path.display()))?,
        );
    }
    Ok(rows)
}

/// Returns the position of a column in a tab separated header line, case-insensitive
///
/// # Arguments
/// * `header` - Header line
/// * `name` - Column name
///
pub fn column_index(header: &str, name: &str) -> Option<usize> {
    header
        .trim_end_matches(['\r', '\n'])
        .split(TSV_SEPARATOR as char)
        .position(|column| column.trim().eq_ignore_ascii_case(name))
}
