//! Built-in demo programs.
//!
//! One program per major method so every path of the engine can be run
//! without authoring a file first.

use crate::types::*;
use crate::zones::HeartRateZone;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Cached built-in catalog - built once and reused across all operations
static BUILTIN_CATALOG: Lazy<Catalog> = Lazy::new(build_builtin_catalog);

/// Built-in programs keyed by short name
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub programs: BTreeMap<String, Program>,
}

/// Get a reference to the cached built-in catalog
pub fn builtin_catalog() -> &'static Catalog {
    &BUILTIN_CATALOG
}

/// Look up a built-in program by short name
pub fn get_builtin(name: &str) -> Option<&'static Program> {
    BUILTIN_CATALOG.programs.get(name)
}

/// Short names of every built-in program, sorted
pub fn builtin_names() -> Vec<&'static str> {
    BUILTIN_CATALOG.programs.keys().map(String::as_str).collect()
}

/// Builds the catalog from scratch
///
/// Prefer `builtin_catalog()`; this is kept for tests.
pub fn build_builtin_catalog() -> Catalog {
    let mut programs = BTreeMap::new();

    // ========================================================================
    // Strength
    // ========================================================================

    programs.insert(
        "strength".to_string(),
        Program {
            name: "Lower Body Strength".into(),
            description: Some("Warm-up, squats at 75% 1RM, accessory superset".into()),
            blocks: vec![
                Block::simple(vec![ExerciseItem::new(
                    "bike",
                    "Assault Bike",
                    vec![WorkoutSet::duration(180)],
                )])
                .named("Warm-up")
                .with_zone(HeartRateZone::Zone2),
                Block::simple(vec![ExerciseItem::new(
                    "back_squat",
                    "Back Squat",
                    vec![
                        WorkoutSet::reps(5)
                            .with_load(LoadTarget::PercentageOfMax(75.0))
                            .with_rest(120);
                        3
                    ],
                )])
                .named("Main lift"),
                Block::rest(Some(90)).with_notes("Walk and sip water"),
                Block::method(
                    MethodType::Superset,
                    MethodParams {
                        rest_seconds: Some(60),
                        ..Default::default()
                    },
                    vec![
                        ExerciseItem::new("rdl", "Romanian Deadlift", vec![WorkoutSet::reps(10); 3]),
                        ExerciseItem::new("lunge", "Walking Lunge", vec![WorkoutSet::reps(12); 3]),
                    ],
                )
                .named("Accessories"),
            ],
        },
    );

    programs.insert(
        "cluster".to_string(),
        Program {
            name: "Deadlift Clusters".into(),
            description: Some("Ascending clusters from 70% to 85% 1RM".into()),
            blocks: vec![Block::method(
                MethodType::Cluster,
                MethodParams::default(),
                vec![ExerciseItem::new(
                    "deadlift",
                    "Deadlift",
                    vec![
                        WorkoutSet::reps(10).with_rest(180).with_cluster(ClusterSpec {
                            cluster_size: Some(3),
                            rest_seconds: Some(20),
                            progression: ClusterProgression::Ascending,
                            min_percentage: Some(70.0),
                            max_percentage: Some(85.0),
                        });
                        3
                    ],
                )],
            )
            .named("Clusters")],
        },
    );

    programs.insert(
        "rest_pause".to_string(),
        Program {
            name: "Bench Rest-Pause".into(),
            description: None,
            blocks: vec![Block::method(
                MethodType::RestPause,
                MethodParams::default(),
                vec![ExerciseItem::new(
                    "bench_press",
                    "Bench Press",
                    vec![
                        WorkoutSet::reps(8)
                            .with_load(LoadTarget::PercentageOfMax(80.0))
                            .with_rest(150)
                            .with_rest_pause(RestPauseSpec {
                                count: 2,
                                pause_seconds: 15,
                            });
                        2
                    ],
                )],
            )],
        },
    );

    // ========================================================================
    // Intervals
    // ========================================================================

    programs.insert(
        "tabata".to_string(),
        Program {
            name: "Classic Tabata".into(),
            description: Some("20s on / 10s off, 8 exercises, 2 rounds".into()),
            blocks: vec![Block::method(
                MethodType::Tabata,
                MethodParams {
                    work_seconds: Some(20),
                    rest_seconds: Some(10),
                    rounds: Some(2),
                    recovery_seconds: Some(60),
                    ..Default::default()
                },
                vec![
                    ExerciseItem::new("burpee", "Burpee", vec![]),
                    ExerciseItem::new("air_squat", "Air Squat", vec![]),
                    ExerciseItem::new("mountain_climber", "Mountain Climber", vec![]),
                    ExerciseItem::new("push_up", "Push-up", vec![]),
                ],
            )
            .with_zone(HeartRateZone::Zone5)],
        },
    );

    programs.insert(
        "emom".to_string(),
        Program {
            name: "10-Min EMOM".into(),
            description: Some("Alternate swings and goblet squats every minute".into()),
            blocks: vec![Block::method(
                MethodType::Emom,
                MethodParams {
                    total_minutes: Some(10),
                    ..Default::default()
                },
                vec![
                    ExerciseItem::new("kb_swing", "Kettlebell Swing", vec![]),
                    ExerciseItem::new("goblet_squat", "Goblet Squat", vec![]),
                ],
            )
            .with_zone(HeartRateZone::Zone4)],
        },
    );

    programs.insert(
        "amrap".to_string(),
        Program {
            name: "Cindy".into(),
            description: Some("5 pull-ups, 10 push-ups, 15 squats".into()),
            blocks: vec![Block::method(
                MethodType::Amrap,
                MethodParams {
                    total_minutes: Some(20),
                    ..Default::default()
                },
                vec![
                    ExerciseItem::new("pullup", "Pull-up", vec![]),
                    ExerciseItem::new("push_up", "Push-up", vec![]),
                    ExerciseItem::new("air_squat", "Air Squat", vec![]),
                ],
            )],
        },
    );

    Catalog { programs }
}

impl Catalog {
    /// Validate every program in the catalog
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (key, program) in &self.programs {
            if program.blocks.is_empty() {
                errors.push(format!("Program '{}' has no blocks", key));
            }
            errors.extend(
                program
                    .validate()
                    .into_iter()
                    .map(|e| format!("Program '{}': {}", key, e)),
            );
        }

        errors
    }
}
