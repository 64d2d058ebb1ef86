//! Core domain types for the Repflow system.
//!
//! This module defines the fundamental types used throughout the engine:
//! - Programs, blocks, exercise items and sets (authored, read-only)
//! - Training methods and their parameters
//! - Steps (flattened, engine-internal units of execution)

use crate::progression::{ClusterPlan, RestPausePlan};
use crate::protocol::CycleDescription;
use crate::zones::HeartRateZone;
use serde::{Deserialize, Serialize};

// ============================================================================
// Program Types
// ============================================================================

/// A finalized workout program
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Program {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Program {
    pub fn new(name: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self {
            name: name.into(),
            description: None,
            blocks,
        }
    }
}

/// One program segment
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Block {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Target heart rate zone for the steps produced by this block
    #[serde(default)]
    pub zone: Option<HeartRateZone>,
    pub kind: BlockKind,
}

impl Block {
    pub fn simple(items: Vec<ExerciseItem>) -> Self {
        Self::from_kind(BlockKind::Simple { items })
    }

    pub fn method(method: MethodType, params: MethodParams, items: Vec<ExerciseItem>) -> Self {
        Self::from_kind(BlockKind::Method {
            method,
            params,
            items,
        })
    }

    pub fn rest(rest_seconds: Option<u32>) -> Self {
        Self::from_kind(BlockKind::Rest { rest_seconds })
    }

    fn from_kind(kind: BlockKind) -> Self {
        Self {
            name: None,
            notes: None,
            zone: None,
            kind,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_zone(mut self, zone: HeartRateZone) -> Self {
        self.zone = Some(zone);
        self
    }

    /// Exercise items owned by this block (empty for rest blocks)
    pub fn items(&self) -> &[ExerciseItem] {
        match &self.kind {
            BlockKind::Simple { items } | BlockKind::Method { items, .. } => items,
            BlockKind::Rest { .. } => &[],
        }
    }

    /// Training method, if this is a method block
    pub fn method_type(&self) -> Option<MethodType> {
        match &self.kind {
            BlockKind::Method { method, .. } => Some(*method),
            _ => None,
        }
    }
}

/// Block variants
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    Simple {
        #[serde(default)]
        items: Vec<ExerciseItem>,
    },
    Method {
        method: MethodType,
        #[serde(default)]
        params: MethodParams,
        #[serde(default)]
        items: Vec<ExerciseItem>,
    },
    Rest {
        #[serde(default)]
        rest_seconds: Option<u32>,
    },
}

// ============================================================================
// Methods
// ============================================================================

/// Named training technique governing how a block's sets are structured
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MethodType {
    Superset,
    Triset,
    GiantSet,
    Dropset,
    PyramidAscending,
    PyramidDescending,
    Contrast,
    Complex,
    RestPause,
    Cluster,
    Emom,
    Amrap,
    Circuit,
    Tabata,
}

impl MethodType {
    /// Interval protocols are driven by a phase engine instead of rep steps
    pub fn is_interval(&self) -> bool {
        matches!(self, MethodType::Tabata | MethodType::Emom | MethodType::Amrap)
    }

    pub fn requires_cluster(&self) -> bool {
        matches!(self, MethodType::Cluster)
    }

    pub fn requires_rest_pause(&self) -> bool {
        matches!(self, MethodType::RestPause)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MethodType::Superset => "Superset",
            MethodType::Triset => "Triset",
            MethodType::GiantSet => "Giant set",
            MethodType::Dropset => "Drop set",
            MethodType::PyramidAscending => "Ascending pyramid",
            MethodType::PyramidDescending => "Descending pyramid",
            MethodType::Contrast => "Contrast",
            MethodType::Complex => "Complex",
            MethodType::RestPause => "Rest-pause",
            MethodType::Cluster => "Cluster",
            MethodType::Emom => "EMOM",
            MethodType::Amrap => "AMRAP",
            MethodType::Circuit => "Circuit",
            MethodType::Tabata => "Tabata",
        }
    }
}

/// Global and method-specific block parameters
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct MethodParams {
    /// Set count override for every item of the block
    #[serde(default)]
    pub sets: Option<u32>,
    /// Global rest between sets (or between Tabata work phases)
    #[serde(default)]
    pub rest_seconds: Option<u32>,
    #[serde(default)]
    pub work_seconds: Option<u32>,
    #[serde(default)]
    pub rounds: Option<u32>,
    /// Recovery between Tabata rounds
    #[serde(default)]
    pub recovery_seconds: Option<u32>,
    #[serde(default)]
    pub exercises_per_round: Option<u32>,
    #[serde(default)]
    pub total_minutes: Option<u32>,
    #[serde(default)]
    pub minute_seconds: Option<u32>,
    /// AMRAP time cap
    #[serde(default)]
    pub total_seconds: Option<u32>,
}

// ============================================================================
// Exercise Items and Sets
// ============================================================================

/// Reference to an exercise in the external library
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: String,
    pub name: String,
}

/// An exercise within a block, with its ordered sets
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseItem {
    /// `None` when the referenced exercise was deleted
    #[serde(default)]
    pub exercise: Option<Exercise>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub sets: Vec<WorkoutSet>,
}

impl ExerciseItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, sets: Vec<WorkoutSet>) -> Self {
        Self {
            exercise: Some(Exercise {
                id: id.into(),
                name: name.into(),
            }),
            notes: None,
            sets,
        }
    }

    pub fn exercise_id(&self) -> Option<&str> {
        self.exercise.as_ref().map(|e| e.id.as_str())
    }
}

/// Whether a set is counted in reps or in seconds
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SetKind {
    Reps { target_reps: u32 },
    Duration { seconds: u32 },
}

/// Authoritative load of a set: an absolute weight OR a percentage of 1RM
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LoadTarget {
    /// Kilograms
    Weight(f64),
    PercentageOfMax(f64),
}

/// Load progression shape across the clusters of one set
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClusterProgression {
    #[default]
    Constant,
    Ascending,
    Descending,
    Wave,
}

/// Cluster fields of a set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct ClusterSpec {
    #[serde(default)]
    pub cluster_size: Option<u32>,
    #[serde(default)]
    pub rest_seconds: Option<u32>,
    #[serde(default)]
    pub progression: ClusterProgression,
    #[serde(default)]
    pub min_percentage: Option<f64>,
    #[serde(default)]
    pub max_percentage: Option<f64>,
}

/// Rest-pause fields of a set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RestPauseSpec {
    /// Number of pauses after the initial effort
    pub count: u32,
    pub pause_seconds: u32,
}

/// A single prescribed set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutSet {
    pub kind: SetKind,
    #[serde(default)]
    pub load: Option<LoadTarget>,
    /// Rest after this set
    #[serde(default)]
    pub rest_seconds: Option<u32>,
    #[serde(default)]
    pub cluster: Option<ClusterSpec>,
    #[serde(default)]
    pub rest_pause: Option<RestPauseSpec>,
}

impl WorkoutSet {
    pub fn reps(target_reps: u32) -> Self {
        Self::from_kind(SetKind::Reps { target_reps })
    }

    pub fn duration(seconds: u32) -> Self {
        Self::from_kind(SetKind::Duration { seconds })
    }

    fn from_kind(kind: SetKind) -> Self {
        Self {
            kind,
            load: None,
            rest_seconds: None,
            cluster: None,
            rest_pause: None,
        }
    }

    pub fn with_load(mut self, load: LoadTarget) -> Self {
        self.load = Some(load);
        self
    }

    pub fn with_rest(mut self, seconds: u32) -> Self {
        self.rest_seconds = Some(seconds);
        self
    }

    pub fn with_cluster(mut self, cluster: ClusterSpec) -> Self {
        self.cluster = Some(cluster);
        self
    }

    pub fn with_rest_pause(mut self, rest_pause: RestPauseSpec) -> Self {
        self.rest_pause = Some(rest_pause);
        self
    }

    /// Target reps, for reps-type sets
    pub fn target_reps(&self) -> Option<u32> {
        match self.kind {
            SetKind::Reps { target_reps } => Some(target_reps),
            SetKind::Duration { .. } => None,
        }
    }
}

// ============================================================================
// Steps
// ============================================================================

/// Load prescription attached to a reps step
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoadPrescription {
    /// One load for every set. At least one of the fields is present.
    Fixed {
        weight: Option<f64>,
        percentage: Option<f64>,
    },
    Cluster(ClusterPlan),
    RestPause(RestPausePlan),
}

impl LoadPrescription {
    /// Weight to prefill for a set, when one can be resolved
    pub fn first_weight(&self) -> Option<f64> {
        match self {
            LoadPrescription::Fixed { weight, .. } => *weight,
            LoadPrescription::Cluster(plan) => {
                plan.weights.as_ref().and_then(|w| w.first().copied())
            }
            LoadPrescription::RestPause(plan) => plan.weight,
        }
    }
}

/// Shape of a step
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    Timed { duration: u32, is_rest: bool },
    Reps { total_sets: u32, reps_per_set: u32 },
    /// Delegated to a protocol phase engine
    Interval { protocol: CycleDescription },
}

/// One flattened unit of execution. Immutable once created.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Step {
    pub title: String,
    pub subtitle: String,
    pub zone: Option<HeartRateZone>,
    /// Seconds
    pub estimated_duration: u32,
    pub exercise_id: Option<String>,
    pub prescription: Option<LoadPrescription>,
    pub kind: StepKind,
}

impl Step {
    pub fn is_rest(&self) -> bool {
        matches!(self.kind, StepKind::Timed { is_rest: true, .. })
    }

    pub fn is_reps(&self) -> bool {
        matches!(self.kind, StepKind::Reps { .. })
    }

    /// Duration of a timed step
    pub fn timed_duration(&self) -> Option<u32> {
        match self.kind {
            StepKind::Timed { duration, .. } => Some(duration),
            _ => None,
        }
    }

    /// Set count of a reps step
    pub fn total_sets(&self) -> Option<u32> {
        match self.kind {
            StepKind::Reps { total_sets, .. } => Some(total_sets),
            _ => None,
        }
    }
}
