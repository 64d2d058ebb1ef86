//! Program files and range/order validation.
//!
//! Programs are authored as JSON or TOML. The file extension picks the
//! format; anything that is not `.toml` is read as JSON.

use crate::progression::number_of_clusters;
use crate::{Block, BlockKind, Error, LoadTarget, MethodType, Program, Result, WorkoutSet};
use std::path::Path;

/// Highest percentage of 1RM accepted in a program
pub const MAX_PERCENTAGE: f64 = 100.0;

/// Upper bound on Tabata rounds and exercises per round
pub const MAX_ROUNDS: u32 = 100;

/// Upper bound on EMOM minutes (one day)
pub const MAX_INTERVAL_MINUTES: u32 = 24 * 60;

/// Upper bound on clusters in one set
pub const MAX_CLUSTERS: u32 = 100;

impl Program {
    pub fn from_json_str(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Read a program file without validating it
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        let program = if is_toml {
            Self::from_toml_str(&contents)?
        } else {
            Self::from_json_str(&contents)?
        };
        tracing::info!(
            "Loaded program '{}' ({} blocks) from {:?}",
            program.name,
            program.blocks.len(),
            path
        );
        Ok(program)
    }

    /// Read a program file and reject it if validation finds problems
    pub fn load_validated(path: &Path) -> Result<Self> {
        let program = Self::load_from(path)?;
        let errors = program.validate();
        if errors.is_empty() {
            Ok(program)
        } else {
            Err(Error::ProgramValidation(errors.join("; ")))
        }
    }

    /// Check the program for range and ordering problems
    ///
    /// Returns one message per problem; an empty list means the program is
    /// safe to run. Exercise-science judgement is left to the author.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("Program has empty name".to_string());
        }

        for (b, block) in self.blocks.iter().enumerate() {
            let label = block_label(b, block);
            validate_block(&label, block, &mut errors);
        }

        errors
    }
}

fn block_label(index: usize, block: &Block) -> String {
    match &block.name {
        Some(name) => format!("Block {} ('{}')", index + 1, name),
        None => format!("Block {}", index + 1),
    }
}

fn validate_block(label: &str, block: &Block, errors: &mut Vec<String>) {
    let method = match &block.kind {
        BlockKind::Rest { .. } => return,
        BlockKind::Simple { .. } => None,
        BlockKind::Method { method, params, .. } => {
            if method.is_interval() {
                let timings = [
                    ("work_seconds", params.work_seconds),
                    ("rounds", params.rounds),
                    ("exercises_per_round", params.exercises_per_round),
                    ("total_minutes", params.total_minutes),
                    ("minute_seconds", params.minute_seconds),
                    ("total_seconds", params.total_seconds),
                ];
                for (field, value) in timings {
                    if value == Some(0) {
                        errors.push(format!("{}: {} must be greater than zero", label, field));
                    }
                }
                let limits = [
                    ("rounds", params.rounds, MAX_ROUNDS),
                    ("exercises_per_round", params.exercises_per_round, MAX_ROUNDS),
                    ("total_minutes", params.total_minutes, MAX_INTERVAL_MINUTES),
                ];
                for (field, value, max) in limits {
                    if let Some(value) = value.filter(|v| *v > max) {
                        errors.push(format!("{}: {} {} exceeds {}", label, field, value, max));
                    }
                }
            }
            Some(*method)
        }
    };

    for (i, item) in block.items().iter().enumerate() {
        let name = item
            .exercise
            .as_ref()
            .map(|e| e.name.as_str())
            .unwrap_or("unknown exercise");
        for (s, set) in item.sets.iter().enumerate() {
            let at = format!("{}, item {} ({}), set {}", label, i + 1, name, s + 1);
            validate_set(&at, method, set, errors);
        }
    }
}

fn validate_set(at: &str, method: Option<MethodType>, set: &WorkoutSet, errors: &mut Vec<String>) {
    let is_cluster = method.map(|m| m.requires_cluster()).unwrap_or(false);
    let is_rest_pause = method.map(|m| m.requires_rest_pause()).unwrap_or(false);

    match set.load {
        Some(LoadTarget::Weight(kg)) if !kg.is_finite() || kg < 0.0 => {
            errors.push(format!("{}: weight must be a non-negative number", at));
        }
        Some(LoadTarget::PercentageOfMax(pct)) if !in_percentage_range(pct) => {
            errors.push(format!("{}: percentage {} is outside (0, {}]", at, pct, MAX_PERCENTAGE));
        }
        _ => {}
    }

    if set.cluster.is_some() && set.rest_pause.is_some() {
        errors.push(format!("{}: cluster and rest-pause fields are mutually exclusive", at));
    }

    if let Some(cluster) = &set.cluster {
        if !is_cluster {
            errors.push(format!("{}: cluster fields outside a cluster block", at));
        }
        if cluster.cluster_size == Some(0) {
            errors.push(format!("{}: cluster_size must be greater than zero", at));
        }
        if let Some(clusters) = number_of_clusters(set.target_reps(), cluster.cluster_size) {
            if clusters > MAX_CLUSTERS {
                errors.push(format!("{}: {} clusters exceeds {}", at, clusters, MAX_CLUSTERS));
            }
        }
        for pct in [cluster.min_percentage, cluster.max_percentage].into_iter().flatten() {
            if !in_percentage_range(pct) {
                errors.push(format!("{}: percentage {} is outside (0, {}]", at, pct, MAX_PERCENTAGE));
            }
        }
        if let (Some(min), Some(max)) = (cluster.min_percentage, cluster.max_percentage) {
            if min > max {
                errors.push(format!(
                    "{}: min_percentage {} is greater than max_percentage {}",
                    at, min, max
                ));
            }
        }
    } else if is_cluster && set.target_reps().is_some() {
        errors.push(format!("{}: cluster block set has no cluster fields", at));
    }

    if set.rest_pause.is_some() {
        if !is_rest_pause {
            errors.push(format!("{}: rest-pause fields outside a rest-pause block", at));
        }
    } else if is_rest_pause && set.target_reps().is_some() {
        errors.push(format!("{}: rest-pause block set has no rest-pause fields", at));
    }
}

fn in_percentage_range(pct: f64) -> bool {
    pct.is_finite() && pct > 0.0 && pct <= MAX_PERCENTAGE
}
