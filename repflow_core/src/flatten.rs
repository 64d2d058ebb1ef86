//! Step flattener.
//!
//! Converts the block → exercise item → set tree of a program into one
//! ordered list of steps:
//! - Rest blocks become a single timed rest step
//! - Each exercise item becomes one step, shaped by its first set
//! - Interval blocks (Tabata, EMOM, AMRAP) become one interval step that the
//!   session hands to a phase engine
//!
//! Items without sets are skipped; deleted exercises get a placeholder name.

use crate::progression::{plan_cluster, plan_rest_pause, resolve_percentage, resolve_weight};
use crate::protocol::CycleDescription;
use crate::{
    Block, BlockKind, ExerciseItem, HeartRateZone, LoadPrescription, LoadTarget, MethodParams,
    MethodType, OneRepMaxLookup, Program, SetKind, Step, StepKind, WorkoutSet,
};
use serde::{Deserialize, Serialize};

/// Shortest timed step produced from a duration set
pub const MIN_TIMED_SECONDS: u32 = 10;

/// Time budget per repetition for duration estimates
pub const SECONDS_PER_REP: u32 = 3;

pub const UNKNOWN_EXERCISE: &str = "Unknown exercise";

/// Result of flattening a program
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FlattenedProgram {
    pub steps: Vec<Step>,
    /// Sum of every step's estimated duration, in seconds
    pub total_estimated_duration: u32,
}

impl FlattenedProgram {
    pub fn from_steps(steps: Vec<Step>) -> Self {
        let total_estimated_duration = steps
            .iter()
            .fold(0u32, |total, s| total.saturating_add(s.estimated_duration));
        Self {
            steps,
            total_estimated_duration,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Flatten a program into its ordered step sequence
///
/// Traversal follows block order, then item order. The program is never
/// modified; flattening the same program twice yields identical steps.
pub fn flatten<L>(program: &Program, maxes: &L) -> FlattenedProgram
where
    L: OneRepMaxLookup + ?Sized,
{
    let mut steps = Vec::new();

    for block in &program.blocks {
        match &block.kind {
            BlockKind::Rest { rest_seconds } => {
                steps.push(rest_step(block, *rest_seconds));
            }
            BlockKind::Simple { items } => {
                let params = MethodParams::default();
                steps.extend(
                    items
                        .iter()
                        .filter_map(|item| item_step(block, None, &params, item, maxes)),
                );
            }
            BlockKind::Method {
                method,
                params,
                items,
            } if method.is_interval() => {
                if let Some(step) = interval_step(block, *method, params, items) {
                    steps.push(step);
                }
            }
            BlockKind::Method {
                method,
                params,
                items,
            } => {
                steps.extend(
                    items
                        .iter()
                        .filter_map(|item| item_step(block, Some(*method), params, item, maxes)),
                );
            }
        }
    }

    let flattened = FlattenedProgram::from_steps(steps);
    tracing::info!(
        "Flattened '{}' into {} steps (~{} s)",
        program.name,
        flattened.len(),
        flattened.total_estimated_duration
    );
    flattened
}

fn rest_step(block: &Block, rest_seconds: Option<u32>) -> Step {
    let duration = rest_seconds.unwrap_or(0);

    let subtitle = match (&block.notes, duration) {
        (Some(notes), _) if !notes.trim().is_empty() => notes.clone(),
        (_, d) if d > 0 => format_duration(d),
        _ => "Free recovery".to_string(),
    };

    Step {
        title: block.name.clone().unwrap_or_else(|| "Rest".to_string()),
        subtitle,
        zone: block.zone.or(Some(HeartRateZone::Zone1)),
        estimated_duration: duration,
        exercise_id: None,
        prescription: None,
        kind: StepKind::Timed {
            duration,
            is_rest: true,
        },
    }
}

fn exercise_name(item: &ExerciseItem) -> String {
    item.exercise
        .as_ref()
        .map(|e| e.name.clone())
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_EXERCISE.to_string())
}

fn item_step<L>(
    block: &Block,
    method: Option<MethodType>,
    params: &MethodParams,
    item: &ExerciseItem,
    maxes: &L,
) -> Option<Step>
where
    L: OneRepMaxLookup + ?Sized,
{
    let Some(first) = item.sets.first() else {
        tracing::debug!("Skipping '{}': no sets", exercise_name(item));
        return None;
    };

    let title = exercise_name(item);
    let exercise_id = item.exercise_id().map(str::to_string);
    let one_rep_max = exercise_id.as_deref().and_then(|id| maxes.one_rep_max(id));

    let step = match first.kind {
        SetKind::Duration { seconds } => {
            let duration = seconds.max(MIN_TIMED_SECONDS);
            Step {
                title,
                subtitle: describe_timed(method, duration),
                zone: block.zone,
                estimated_duration: duration,
                exercise_id,
                prescription: None,
                kind: StepKind::Timed {
                    duration,
                    is_rest: false,
                },
            }
        }
        SetKind::Reps { target_reps } => {
            let total_sets = item.sets.len() as u32;
            let reps_per_set = target_reps.max(1);
            let prescription = prescribe(method, first, one_rep_max);
            let rest = first.rest_seconds.or(params.rest_seconds).unwrap_or(0);
            let intra_rest = match &prescription {
                Some(LoadPrescription::Cluster(plan)) => plan.total_rest_seconds(),
                Some(LoadPrescription::RestPause(plan)) => plan.total_rest_seconds(),
                _ => 0,
            };
            let per_set = reps_per_set
                .saturating_mul(SECONDS_PER_REP)
                .saturating_add(intra_rest);
            let estimated_duration = total_sets
                .saturating_mul(per_set)
                .saturating_add(total_sets.saturating_sub(1).saturating_mul(rest));

            Step {
                title,
                subtitle: describe_reps(method, total_sets, reps_per_set, prescription.as_ref()),
                zone: block.zone,
                estimated_duration,
                exercise_id,
                prescription,
                kind: StepKind::Reps {
                    total_sets,
                    reps_per_set,
                },
            }
        }
    };

    Some(step)
}

/// Load prescription for the first set of an item
///
/// Cluster and rest-pause fields only count under their own method; anywhere
/// else they are ignored and the plain load (if any) is used.
fn prescribe(method: Option<MethodType>, set: &WorkoutSet, one_rep_max: Option<f64>) -> Option<LoadPrescription> {
    match method {
        Some(m) if m.requires_cluster() => {
            if let Some(plan) = plan_cluster(set, one_rep_max) {
                return Some(LoadPrescription::Cluster(plan));
            }
        }
        Some(m) if m.requires_rest_pause() => {
            if let Some(plan) = plan_rest_pause(set, one_rep_max) {
                return Some(LoadPrescription::RestPause(plan));
            }
        }
        _ => {}
    }

    let load = set.load.as_ref()?;
    Some(LoadPrescription::Fixed {
        weight: resolve_weight(load, one_rep_max),
        percentage: resolve_percentage(load, one_rep_max),
    })
}

fn interval_step(block: &Block, method: MethodType, params: &MethodParams, items: &[ExerciseItem]) -> Option<Step> {
    let exercises = items.iter().map(exercise_name).collect();
    let protocol = CycleDescription::from_block(method, params, exercises)?;

    let subtitle = match &protocol {
        CycleDescription::Tabata {
            work_seconds,
            rest_seconds,
            rounds,
            exercises_per_round,
            ..
        } => format!(
            "{} rounds × {} exercises · {}s work / {}s rest",
            rounds, exercises_per_round, work_seconds, rest_seconds
        ),
        CycleDescription::Emom {
            total_minutes,
            minute_seconds,
            ..
        } => format!("{} intervals · every {}", total_minutes, format_duration(*minute_seconds)),
        CycleDescription::Amrap { total_seconds, .. } => {
            format!("As many rounds as possible in {}", format_duration(*total_seconds))
        }
    };

    Some(Step {
        title: block
            .name
            .clone()
            .unwrap_or_else(|| method.display_name().to_string()),
        subtitle,
        zone: block.zone,
        estimated_duration: protocol.total_duration(),
        exercise_id: None,
        prescription: None,
        kind: StepKind::Interval { protocol },
    })
}

fn describe_timed(method: Option<MethodType>, duration: u32) -> String {
    with_method(format_duration(duration), method)
}

fn describe_reps(
    method: Option<MethodType>,
    total_sets: u32,
    reps_per_set: u32,
    prescription: Option<&LoadPrescription>,
) -> String {
    let mut text = format!("{} × {} reps", total_sets, reps_per_set);

    match prescription {
        Some(LoadPrescription::Fixed { weight, percentage }) => {
            if let Some(kg) = weight {
                text.push_str(&format!(" @ {}", format_weight(*kg)));
            } else if let Some(pct) = percentage {
                text.push_str(&format!(" @ {:.0}% 1RM", pct));
            }
        }
        Some(LoadPrescription::Cluster(plan)) => {
            text.push_str(&format!(" · {} clusters", plan.clusters));
            if let (Some(first), Some(last)) = (plan.percentages.first(), plan.percentages.last()) {
                text.push_str(&format!(" ({:.0}-{:.0}%)", first.min(*last), first.max(*last)));
            }
        }
        Some(LoadPrescription::RestPause(plan)) => {
            text.push_str(&format!(" · +{} rest-pause", plan.mini_sets.saturating_sub(1)));
        }
        None => {}
    }

    with_method(text, method)
}

fn with_method(text: String, method: Option<MethodType>) -> String {
    match method {
        Some(m) => format!("{} · {}", text, m.display_name()),
        None => text,
    }
}

/// Human-readable duration: `45s`, `1:30`, `10:00`
pub fn format_duration(seconds: u32) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else {
        format!("{}:{:02}", seconds / 60, seconds % 60)
    }
}

/// Weight in kilograms without trailing zeros: `80 kg`, `82.5 kg`
pub fn format_weight(kg: f64) -> String {
    let rounded = (kg * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{:.0} kg", rounded)
    } else {
        format!("{:.1} kg", rounded)
    }
}

/// Display a load target without resolving it
pub fn format_load(load: &LoadTarget) -> String {
    match load {
        LoadTarget::Weight(kg) => format_weight(*kg),
        LoadTarget::PercentageOfMax(pct) => format!("{:.0}% 1RM", pct),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClusterProgression, ClusterSpec, NoOneRepMax, OneRepMaxTable, RestPauseSpec};

    fn three_by_ten() -> Program {
        Program::new(
            "Squat day",
            vec![Block::simple(vec![ExerciseItem::new(
                "back_squat",
                "Back Squat",
                vec![WorkoutSet::reps(10), WorkoutSet::reps(10), WorkoutSet::reps(10)],
            )])],
        )
    }

    fn mixed_program() -> Program {
        Program::new(
            "Mixed",
            vec![
                Block::simple(vec![
                    ExerciseItem::new("plank", "Plank", vec![WorkoutSet::duration(45)]),
                    ExerciseItem::new("hollow", "Hollow hold", vec![WorkoutSet::duration(5)]),
                ]),
                Block::rest(Some(90)),
                Block::method(
                    MethodType::Cluster,
                    MethodParams::default(),
                    vec![ExerciseItem::new(
                        "deadlift",
                        "Deadlift",
                        vec![WorkoutSet::reps(10).with_cluster(ClusterSpec {
                            cluster_size: Some(3),
                            rest_seconds: Some(15),
                            progression: ClusterProgression::Ascending,
                            min_percentage: Some(70.0),
                            max_percentage: Some(85.0),
                        })],
                    )],
                ),
                Block::method(
                    MethodType::Tabata,
                    MethodParams {
                        rounds: Some(2),
                        ..Default::default()
                    },
                    vec![ExerciseItem::new("burpee", "Burpee", vec![])],
                ),
            ],
        )
    }

    #[test]
    fn test_three_by_ten_single_reps_step() {
        let flat = flatten(&three_by_ten(), &NoOneRepMax);
        assert_eq!(flat.len(), 1);
        assert_eq!(
            flat.steps[0].kind,
            StepKind::Reps {
                total_sets: 3,
                reps_per_set: 10
            }
        );
        assert_eq!(flat.steps[0].title, "Back Squat");
        assert_eq!(flat.steps[0].subtitle, "3 × 10 reps");
    }

    #[test]
    fn test_flatten_is_deterministic() {
        let program = mixed_program();
        let a = flatten(&program, &NoOneRepMax);
        let b = flatten(&program, &NoOneRepMax);
        assert_eq!(a, b);
    }

    #[test]
    fn test_total_duration_is_exact_sum() {
        let flat = flatten(&mixed_program(), &NoOneRepMax);
        let sum: u32 = flat.steps.iter().map(|s| s.estimated_duration).sum();
        assert_eq!(flat.total_estimated_duration, sum);
    }

    #[test]
    fn test_step_order_and_shapes() {
        let flat = flatten(&mixed_program(), &NoOneRepMax);
        assert_eq!(flat.len(), 5);

        assert_eq!(flat.steps[0].timed_duration(), Some(45));
        // Clamped to the minimum
        assert_eq!(flat.steps[1].timed_duration(), Some(MIN_TIMED_SECONDS));
        assert!(flat.steps[2].is_rest());
        assert_eq!(flat.steps[2].subtitle, "1:30");
        assert!(flat.steps[3].is_reps());
        assert!(matches!(flat.steps[4].kind, StepKind::Interval { .. }));
        assert_eq!(flat.steps[4].estimated_duration, 2 * 8 * 30);
    }

    #[test]
    fn test_rest_block_subtitles() {
        let with_notes = Program::new("p", vec![Block::rest(Some(60)).with_notes("Walk it off")]);
        let free = Program::new("p", vec![Block::rest(None)]);

        let flat = flatten(&with_notes, &NoOneRepMax);
        assert_eq!(flat.steps[0].subtitle, "Walk it off");

        let flat = flatten(&free, &NoOneRepMax);
        assert_eq!(flat.steps[0].subtitle, "Free recovery");
        assert_eq!(flat.steps[0].timed_duration(), Some(0));
    }

    #[test]
    fn test_empty_item_skipped_and_placeholder_name() {
        let mut orphan = ExerciseItem::new("gone", "Gone", vec![WorkoutSet::reps(5)]);
        orphan.exercise = None;

        let program = Program::new(
            "p",
            vec![Block::simple(vec![
                ExerciseItem::new("empty", "Empty", vec![]),
                orphan,
            ])],
        );

        let flat = flatten(&program, &NoOneRepMax);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat.steps[0].title, UNKNOWN_EXERCISE);
    }

    #[test]
    fn test_zero_target_reps_clamped() {
        let program = Program::new(
            "p",
            vec![Block::simple(vec![ExerciseItem::new("x", "X", vec![WorkoutSet::reps(0)])])],
        );
        let flat = flatten(&program, &NoOneRepMax);
        assert_eq!(
            flat.steps[0].kind,
            StepKind::Reps {
                total_sets: 1,
                reps_per_set: 1
            }
        );
    }

    #[test]
    fn test_reps_estimate_includes_rest() {
        let program = Program::new(
            "p",
            vec![Block::method(
                MethodType::Superset,
                MethodParams {
                    rest_seconds: Some(60),
                    ..Default::default()
                },
                vec![ExerciseItem::new(
                    "row",
                    "Row",
                    vec![WorkoutSet::reps(10), WorkoutSet::reps(10), WorkoutSet::reps(10)],
                )],
            )],
        );

        let flat = flatten(&program, &NoOneRepMax);
        // 3 sets x 30s of work + 2 rests of 60s
        assert_eq!(flat.steps[0].estimated_duration, 90 + 120);
        assert!(flat.steps[0].subtitle.ends_with("Superset"));
    }

    #[test]
    fn test_item_set_count_wins_over_block_sets() {
        let program = Program::new(
            "p",
            vec![Block::method(
                MethodType::Superset,
                MethodParams {
                    sets: Some(4),
                    ..Default::default()
                },
                vec![ExerciseItem::new("row", "Row", vec![WorkoutSet::reps(10); 3])],
            )],
        );
        assert!(program.validate().is_empty());

        let flat = flatten(&program, &NoOneRepMax);
        assert_eq!(flat.steps[0].total_sets(), Some(3));
    }

    #[test]
    fn test_huge_values_saturate() {
        let program = Program::new(
            "p",
            vec![
                Block::simple(vec![ExerciseItem::new(
                    "squat",
                    "Squat",
                    vec![WorkoutSet::reps(2_000_000_000)],
                )]),
                Block::method(
                    MethodType::Amrap,
                    MethodParams {
                        total_minutes: Some(100_000_000),
                        ..Default::default()
                    },
                    vec![],
                ),
                Block::rest(Some(u32::MAX)),
            ],
        );

        let flat = flatten(&program, &NoOneRepMax);
        assert_eq!(flat.steps[0].estimated_duration, u32::MAX);
        assert_eq!(flat.steps[1].estimated_duration, u32::MAX);
        assert_eq!(flat.total_estimated_duration, u32::MAX);
    }

    #[test]
    fn test_cluster_prescription_uses_one_rep_max() {
        let mut maxes = OneRepMaxTable::new();
        maxes.insert("deadlift", 200.0);

        let flat = flatten(&mixed_program(), &maxes);
        match &flat.steps[3].prescription {
            Some(LoadPrescription::Cluster(plan)) => {
                assert_eq!(plan.clusters, 4);
                assert_eq!(plan.weights, Some(vec![140.0, 150.0, 160.0, 170.0]));
            }
            other => panic!("Expected cluster prescription, got {:?}", other),
        }
        // 10 reps x 3s + 3 intra-set rests of 15s
        assert_eq!(flat.steps[3].estimated_duration, 30 + 45);
    }

    #[test]
    fn test_cluster_fields_ignored_outside_cluster_method() {
        let program = Program::new(
            "p",
            vec![Block::simple(vec![ExerciseItem::new(
                "press",
                "Press",
                vec![WorkoutSet::reps(6)
                    .with_load(LoadTarget::PercentageOfMax(80.0))
                    .with_cluster(ClusterSpec {
                        cluster_size: Some(2),
                        ..Default::default()
                    })],
            )])],
        );

        let flat = flatten(&program, &NoOneRepMax);
        assert_eq!(
            flat.steps[0].prescription,
            Some(LoadPrescription::Fixed {
                weight: None,
                percentage: Some(80.0)
            })
        );
        assert_eq!(flat.steps[0].subtitle, "1 × 6 reps @ 80% 1RM");
    }

    #[test]
    fn test_rest_pause_prescription() {
        let program = Program::new(
            "p",
            vec![Block::method(
                MethodType::RestPause,
                MethodParams::default(),
                vec![ExerciseItem::new(
                    "curl",
                    "Curl",
                    vec![WorkoutSet::reps(12)
                        .with_load(LoadTarget::Weight(20.0))
                        .with_rest_pause(RestPauseSpec {
                            count: 2,
                            pause_seconds: 15,
                        })],
                )],
            )],
        );

        let flat = flatten(&program, &NoOneRepMax);
        let step = &flat.steps[0];
        assert_eq!(step.prescription.as_ref().and_then(|p| p.first_weight()), Some(20.0));
        assert_eq!(step.estimated_duration, 36 + 30);
        assert!(step.subtitle.contains("+2 rest-pause"));
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(90), "1:30");
        assert_eq!(format_duration(600), "10:00");
        assert_eq!(format_weight(80.0), "80 kg");
        assert_eq!(format_weight(82.5), "82.5 kg");
        assert_eq!(format_load(&LoadTarget::PercentageOfMax(75.0)), "75% 1RM");
    }
}
