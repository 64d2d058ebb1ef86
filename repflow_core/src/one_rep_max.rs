//! Personal one-rep-max lookup.
//!
//! The engine only ever asks "what is the 1RM for this exercise?". The table
//! is loaded from an external JSON file mapping exercise ids to kilograms:
//!
//! ```json
//! { "back_squat": 140.0, "bench_press": 100.0 }
//! ```

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Source of one-rep-max values, keyed by exercise id
pub trait OneRepMaxLookup {
    fn one_rep_max(&self, exercise_id: &str) -> Option<f64>;
}

/// Lookup with no maxes on file
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOneRepMax;

impl OneRepMaxLookup for NoOneRepMax {
    fn one_rep_max(&self, _exercise_id: &str) -> Option<f64> {
        None
    }
}

impl OneRepMaxLookup for HashMap<String, f64> {
    fn one_rep_max(&self, exercise_id: &str) -> Option<f64> {
        self.get(exercise_id).copied().filter(|max| *max > 0.0)
    }
}

/// One-rep-max table loaded from disk
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OneRepMaxTable {
    maxes: HashMap<String, f64>,
}

impl OneRepMaxTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, exercise_id: impl Into<String>, kg: f64) {
        self.maxes.insert(exercise_id.into(), kg);
    }

    pub fn len(&self) -> usize {
        self.maxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maxes.is_empty()
    }
}

impl OneRepMaxLookup for OneRepMaxTable {
    fn one_rep_max(&self, exercise_id: &str) -> Option<f64> {
        self.maxes.one_rep_max(exercise_id)
    }
}

/// Load the one-rep-max table from a JSON file
///
/// Returns an empty table if the file doesn't exist or can't be parsed;
/// percentages are shown instead of weights in that case.
pub fn load_one_rep_maxes(path: &Path) -> Result<OneRepMaxTable> {
    if !path.exists() {
        tracing::debug!("No one-rep-max file found at {:?}", path);
        return Ok(OneRepMaxTable::new());
    }

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::warn!(
                "Failed to read one-rep-max file at {:?}: {}. Ignoring maxes.",
                path,
                e
            );
            return Ok(OneRepMaxTable::new());
        }
    };

    let table: OneRepMaxTable = match serde_json::from_str(&contents) {
        Ok(table) => table,
        Err(e) => {
            tracing::warn!(
                "Failed to parse one-rep-max file at {:?}: {}. Ignoring maxes.",
                path,
                e
            );
            return Ok(OneRepMaxTable::new());
        }
    };

    tracing::info!("Loaded {} one-rep-max entries", table.len());
    Ok(table)
}
