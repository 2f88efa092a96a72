// std imports
use std::collections::HashMap;
use std::path::Path;

// 3rd party imports
use anyhow::{bail, Context, Result};

// internal imports
use crate::constants::TSV_SEPARATOR;

/// Column with the modification symbol
const SYMBOL_COLUMN: &str = "Modification_Symbol";

/// Column with the modification mass
const MASS_COLUMN: &str = "Modification_Mass";

/// Symbol used for static modifications, which are not written into the peptide
const STATIC_MOD_SYMBOL: char = '-';

/// Dynamic modification symbols and their masses, used to write modifications
/// as mass offsets into the MSGF input
///
#[derive(Debug, Clone, Default)]
pub struct ModificationSymbols {
    masses: HashMap<char, f64>,
}

impl ModificationSymbols {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a symbol
    ///
    /// # Arguments
    /// * `symbol` - Modification symbol
    /// * `mass` - Mass offset
    ///
    pub fn insert(&mut self, symbol: char, mass: f64) {
        self.masses.insert(symbol, mass);
    }

    /// Reads the dynamic modifications from a PHRP `_ModSummary.txt` file.
    ///
    /// # Arguments
    /// * `path` - Path to the mod summary file
    ///
    pub fn from_mod_summary(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(TSV_SEPARATOR)
            .flexible(true)
            .quoting(false)
            .from_path(path)
            .context("Error when opening mod summary file")?;

        let headers = reader.headers()?.clone();
        let symbol_idx = headers
            .iter()
            .position(|column| column.eq_ignore_ascii_case(SYMBOL_COLUMN));
        let mass_idx = headers
            .iter()
            .position(|column| column.eq_ignore_ascii_case(MASS_COLUMN));
        let (symbol_idx, mass_idx) = match (symbol_idx, mass_idx) {
            (Some(symbol_idx), Some(mass_idx)) => (symbol_idx, mass_idx),
            _ => bail!(
                "Mod summary file `{}` lacks `{}` or `{}`",
                path.display(),
                SYMBOL_COLUMN,
                MASS_COLUMN
            ),
        };

        let mut symbols = Self::new();
        for record in reader.records() {
            let record = record?;
            let symbol = match record
                .get(symbol_idx)
                .and_then(|value| value.trim().chars().next())
            {
                Some(symbol) if symbol != STATIC_MOD_SYMBOL => symbol,
                _ => continue,
            };
            let mass: f64 = record
                .get(mass_idx)
                .unwrap_or_default()
                .trim()
                .parse()
                .with_context(|| format!("Invalid modification mass for symbol `{}`", symbol))?;
            symbols.insert(symbol, mass);
        }
        Ok(symbols)
    }

    /// Replaces each modification symbol in the peptide with its mass offset,
    /// e.g. `K.PEPT*IDE.R` becomes `K.PEPT+79.966IDE.R`.
    ///
    /// # Arguments
    /// * `peptide` - Peptide with modification symbols
    ///
    pub fn annotate(&self, peptide: &str) -> String {
        if self.masses.is_empty() {
            return peptide.to_string();
        }
        let mut annotated = String::with_capacity(peptide.len() + 8);
        for character in peptide.chars() {
            match self.masses.get(&character) {
                Some(mass) => annotated.push_str(&format!("{:+.3}", mass)),
                None => annotated.push(character),
            }
        }
        annotated
    }
}
