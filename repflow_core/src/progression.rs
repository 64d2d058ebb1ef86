//! Load progression calculator.
//!
//! Pure functions that turn a set specification into concrete loads:
//! - Cluster count from total reps and cluster size
//! - Per-cluster load percentages following a progression shape
//! - Absolute weights from percentages and a one-rep-max
//!
//! Insufficient input yields `None` (or an empty list), never a panic.

use crate::{ClusterProgression, LoadTarget, WorkoutSet};
use serde::{Deserialize, Serialize};

/// Concrete breakdown of a cluster set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClusterPlan {
    pub clusters: u32,
    /// Reps in each cluster; the last cluster carries the remainder
    pub reps_per_cluster: Vec<u32>,
    /// Load percentage for each cluster (empty when no range is known)
    pub percentages: Vec<f64>,
    /// Absolute weights, only when a one-rep-max is on file
    pub weights: Option<Vec<f64>>,
    /// Intra-set rest between clusters
    pub rest_seconds: u32,
}

impl ClusterPlan {
    /// Total intra-set rest for one set
    pub fn total_rest_seconds(&self) -> u32 {
        self.clusters.saturating_sub(1).saturating_mul(self.rest_seconds)
    }
}

/// Concrete breakdown of a rest-pause set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RestPausePlan {
    /// Initial effort plus one mini-set per pause
    pub mini_sets: u32,
    pub pause_seconds: u32,
    pub weight: Option<f64>,
    pub percentage: Option<f64>,
}

impl RestPausePlan {
    pub fn total_rest_seconds(&self) -> u32 {
        self.mini_sets.saturating_sub(1).saturating_mul(self.pause_seconds)
    }
}

/// Number of clusters needed to cover `total_reps` in groups of `cluster_size`
///
/// Returns `None` when either input is missing or the cluster size is zero.
pub fn number_of_clusters(total_reps: Option<u32>, cluster_size: Option<u32>) -> Option<u32> {
    let total_reps = total_reps?;
    let cluster_size = cluster_size?;
    if cluster_size == 0 {
        return None;
    }
    Some(total_reps.div_ceil(cluster_size))
}

/// Per-cluster load percentages
///
/// Shapes:
/// - Constant: every entry is the midpoint of the range
/// - Ascending: linear from `min` at the first cluster to `max` at the last
/// - Descending: ascending reversed
/// - Wave: rises `min → max` up to `clusters / 2`, then falls back to `min`
///
/// A single cluster always gets the midpoint, whatever the shape.
pub fn cluster_percentages(
    clusters: u32,
    progression: ClusterProgression,
    min_pct: f64,
    max_pct: f64,
) -> Vec<f64> {
    let n = clusters as usize;
    let midpoint = (min_pct + max_pct) / 2.0;

    match n {
        0 => return Vec::new(),
        1 => return vec![midpoint],
        _ => {}
    }

    let last = n - 1;
    match progression {
        ClusterProgression::Constant => vec![midpoint; n],
        ClusterProgression::Ascending => (0..n)
            .map(|i| interpolate(min_pct, max_pct, i, last))
            .collect(),
        ClusterProgression::Descending => (0..n)
            .rev()
            .map(|i| interpolate(min_pct, max_pct, i, last))
            .collect(),
        ClusterProgression::Wave => {
            let peak = n / 2;
            (0..n)
                .map(|i| {
                    if i <= peak {
                        interpolate(min_pct, max_pct, i, peak)
                    } else {
                        interpolate(min_pct, max_pct, last - i, last - peak)
                    }
                })
                .collect()
        }
    }
}

/// Linear position `position / span` between `min` and `max`.
///
/// `span == 0` yields the midpoint; `position >= span` yields exactly `max`.
fn interpolate(min: f64, max: f64, position: usize, span: usize) -> f64 {
    if span == 0 {
        return (min + max) / 2.0;
    }
    if position >= span {
        return max;
    }
    min + (max - min) * position as f64 / span as f64
}

/// Absolute weights for each percentage, or `None` without a one-rep-max
pub fn weights_from_percentages(percentages: &[f64], one_rep_max: Option<f64>) -> Option<Vec<f64>> {
    let max = one_rep_max?;
    Some(percentages.iter().map(|pct| pct * max / 100.0).collect())
}

/// Resolve a load target to kilograms
pub fn resolve_weight(load: &LoadTarget, one_rep_max: Option<f64>) -> Option<f64> {
    match load {
        LoadTarget::Weight(kg) => Some(*kg),
        LoadTarget::PercentageOfMax(pct) => one_rep_max.map(|max| pct * max / 100.0),
    }
}

/// Percentage of max for a load target, when it can be derived
pub fn resolve_percentage(load: &LoadTarget, one_rep_max: Option<f64>) -> Option<f64> {
    match load {
        LoadTarget::PercentageOfMax(pct) => Some(*pct),
        LoadTarget::Weight(kg) => one_rep_max
            .filter(|max| *max > 0.0)
            .map(|max| kg * 100.0 / max),
    }
}

/// Build the cluster breakdown for a set
///
/// The percentage range comes from the cluster fields; a set without a range
/// but with a percentage load uses that percentage for every cluster.
pub fn plan_cluster(set: &WorkoutSet, one_rep_max: Option<f64>) -> Option<ClusterPlan> {
    let cluster = set.cluster.as_ref()?;
    let total_reps = set.target_reps();
    let clusters = number_of_clusters(total_reps, cluster.cluster_size)?;
    let (total_reps, cluster_size) = (total_reps?, cluster.cluster_size?);

    let reps_per_cluster = (0..clusters)
        .map(|i| {
            let done = i * cluster_size;
            cluster_size.min(total_reps - done)
        })
        .collect();

    let range = match (cluster.min_percentage, cluster.max_percentage, set.load) {
        (Some(min), Some(max), _) => Some((min, max)),
        (Some(only), None, _) | (None, Some(only), _) => Some((only, only)),
        (None, None, Some(LoadTarget::PercentageOfMax(pct))) => Some((pct, pct)),
        _ => None,
    };

    let percentages = range
        .map(|(min, max)| cluster_percentages(clusters, cluster.progression, min, max))
        .unwrap_or_default();

    let weights = if percentages.is_empty() {
        match set.load {
            Some(LoadTarget::Weight(kg)) => Some(vec![kg; clusters as usize]),
            _ => None,
        }
    } else {
        weights_from_percentages(&percentages, one_rep_max)
    };

    tracing::debug!(
        "Cluster plan: {} clusters of {:?}, {:?} progression",
        clusters,
        cluster.cluster_size,
        cluster.progression
    );

    Some(ClusterPlan {
        clusters,
        reps_per_cluster,
        percentages,
        weights,
        rest_seconds: cluster.rest_seconds.unwrap_or(0),
    })
}

/// Build the rest-pause breakdown for a set
pub fn plan_rest_pause(set: &WorkoutSet, one_rep_max: Option<f64>) -> Option<RestPausePlan> {
    let rest_pause = set.rest_pause.as_ref()?;

    Some(RestPausePlan {
        mini_sets: rest_pause.count.saturating_add(1),
        pause_seconds: rest_pause.pause_seconds,
        weight: set.load.as_ref().and_then(|l| resolve_weight(l, one_rep_max)),
        percentage: set
            .load
            .as_ref()
            .and_then(|l| resolve_percentage(l, one_rep_max)),
    })
}
