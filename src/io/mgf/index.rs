// std imports
use std::collections::HashMap;
use std::fs::{read_to_string, write as write_file};
use std::path::Path;

// 3rd party crates
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One spectrum of an MGF file
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MgfIndexEntry {
    /// 1-based position of the spectrum in the MGF file
    pub index: usize,
    /// Scan number
    pub scan: u32,
    /// Charge, 0 if the spectrum does not declare a charge
    pub charge: u8,
}

/// Maps scan and charge to the 1-based spectrum index within an MGF file and back.
/// Read-only once created.
///
#[derive(Debug, Clone, Default)]
pub struct MgfIndexMap {
    entries: Vec<MgfIndexEntry>,
    by_scan_charge: HashMap<(u32, u8), usize>,
    by_index: HashMap<usize, u32>,
}

impl MgfIndexMap {
    /// Creates the map from the entries in file order.
    /// If a scan/charge pair occurs more than once, the first spectrum is kept.
    ///
    /// # Arguments
    /// * `entries` - Entries
    ///
    pub fn new(entries: Vec<MgfIndexEntry>) -> Self {
        let mut by_scan_charge = HashMap::with_capacity(entries.len());
        let mut by_index = HashMap::with_capacity(entries.len());
        for entry in entries.iter() {
            by_scan_charge
                .entry((entry.scan, entry.charge))
                .or_insert(entry.index);
            by_index.entry(entry.index).or_insert(entry.scan);
        }
        Self {
            entries,
            by_scan_charge,
            by_index,
        }
    }

    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the spectrum index for the given scan and charge,
    /// falling back to the entry stored under charge 0.
    ///
    /// # Arguments
    /// * `scan` - Scan number
    /// * `charge` - Charge
    ///
    pub fn get_index(&self, scan: u32, charge: u8) -> Option<usize> {
        self.by_scan_charge
            .get(&(scan, charge))
            .or_else(|| self.by_scan_charge.get(&(scan, 0)))
            .copied()
    }

    /// Returns the scan number of the spectrum at the given index
    ///
    /// # Arguments
    /// * `index` - 1-based spectrum index
    ///
    pub fn get_scan(&self, index: usize) -> Option<u32> {
        self.by_index.get(&index).copied()
    }

    /// Serializes the entries in file order
    ///
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.entries)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Writes the index as JSON so later stages can reuse it
    ///
    /// # Arguments
    /// * `path` - Path of the cache file
    ///
    pub fn to_file(&self, path: &Path) -> Result<()> {
        write_file(path, self.to_json()?)
            .with_context(|| format!("Error when writing MGF index to `{}`", path.display()))
    }

    /// Reads an index previously written with [MgfIndexMap::to_file]
    ///
    /// # Arguments
    /// * `path` - Path of the cache file
    ///
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_json(
            &read_to_string(path)
                .with_context(|| format!("Error when reading MGF index `{}`", path.display()))?,
        )
    }
}
