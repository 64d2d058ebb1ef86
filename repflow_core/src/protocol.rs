//! Protocol phase engines for interval blocks.
//!
//! Tabata, EMOM and AMRAP are three cycle descriptions fed to one generic
//! phase runner:
//! - `CycleDescription` describes the protocol and generates its phases
//! - `PhaseEngine` steps through those phases on the 1-second tick
//!
//! Phases never have zero length, so one tick triggers at most one transition.

use crate::{MethodParams, MethodType};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TABATA_WORK_SECONDS: u32 = 20;
pub const DEFAULT_TABATA_REST_SECONDS: u32 = 10;
pub const DEFAULT_TABATA_ROUNDS: u32 = 8;
pub const DEFAULT_TABATA_EXERCISES: u32 = 8;
pub const DEFAULT_MINUTE_SECONDS: u32 = 60;
pub const DEFAULT_EMOM_MINUTES: u32 = 10;
pub const DEFAULT_AMRAP_SECONDS: u32 = 600;

/// Value describing the phases of an interval protocol
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CycleDescription {
    Tabata {
        work_seconds: u32,
        rest_seconds: u32,
        rounds: u32,
        /// Extra rest between rounds
        recovery_seconds: Option<u32>,
        exercises_per_round: u32,
        exercises: Vec<String>,
    },
    Emom {
        total_minutes: u32,
        minute_seconds: u32,
        exercises: Vec<String>,
    },
    Amrap {
        total_seconds: u32,
        exercises: Vec<String>,
    },
}

/// What the athlete does during a phase
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Work,
    Rest,
    Recovery,
}

impl PhaseKind {
    pub fn is_rest(&self) -> bool {
        !matches!(self, PhaseKind::Work)
    }
}

/// One timed segment of a protocol
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Phase {
    pub kind: PhaseKind,
    pub duration: u32,
    /// Round (Tabata) or minute (EMOM), 1-based
    pub round: u32,
    /// Exercise slot within the round, 1-based
    pub exercise: u32,
    pub label: String,
}

impl CycleDescription {
    /// Build the description for an interval block
    ///
    /// Returns `None` for methods that are not interval protocols.
    pub fn from_block(method: MethodType, params: &MethodParams, exercises: Vec<String>) -> Option<Self> {
        let description = match method {
            MethodType::Tabata => CycleDescription::Tabata {
                work_seconds: params.work_seconds.unwrap_or(DEFAULT_TABATA_WORK_SECONDS),
                rest_seconds: params.rest_seconds.unwrap_or(DEFAULT_TABATA_REST_SECONDS),
                rounds: params.rounds.unwrap_or(DEFAULT_TABATA_ROUNDS),
                recovery_seconds: params.recovery_seconds,
                exercises_per_round: params
                    .exercises_per_round
                    .unwrap_or(DEFAULT_TABATA_EXERCISES),
                exercises,
            },
            MethodType::Emom => CycleDescription::Emom {
                total_minutes: params.total_minutes.unwrap_or(DEFAULT_EMOM_MINUTES),
                minute_seconds: params.minute_seconds.unwrap_or(DEFAULT_MINUTE_SECONDS),
                exercises,
            },
            MethodType::Amrap => CycleDescription::Amrap {
                total_seconds: params
                    .total_seconds
                    .or_else(|| params.total_minutes.map(|m| m.saturating_mul(60)))
                    .unwrap_or(DEFAULT_AMRAP_SECONDS),
                exercises,
            },
            _ => return None,
        };
        Some(description)
    }

    pub fn name(&self) -> &'static str {
        match self {
            CycleDescription::Tabata { .. } => "Tabata",
            CycleDescription::Emom { .. } => "EMOM",
            CycleDescription::Amrap { .. } => "AMRAP",
        }
    }

    /// Generate the ordered phase list
    pub fn phases(&self) -> Vec<Phase> {
        let mut phases = Vec::new();

        match self {
            CycleDescription::Tabata {
                work_seconds,
                rest_seconds,
                rounds,
                recovery_seconds,
                exercises_per_round,
                exercises,
            } => {
                for round in 1..=*rounds {
                    for slot in 1..=*exercises_per_round {
                        let label = exercise_label(exercises, slot);
                        push_phase(&mut phases, PhaseKind::Work, *work_seconds, round, slot, &label);
                        push_phase(&mut phases, PhaseKind::Rest, *rest_seconds, round, slot, "Rest");
                    }
                    if round < *rounds {
                        let recovery = recovery_seconds.unwrap_or(0);
                        push_phase(
                            &mut phases,
                            PhaseKind::Recovery,
                            recovery,
                            round,
                            *exercises_per_round,
                            "Recovery",
                        );
                    }
                }
            }
            CycleDescription::Emom {
                total_minutes,
                minute_seconds,
                exercises,
            } => {
                let count = exercises.len().max(1) as u32;
                for minute in 1..=*total_minutes {
                    let slot = ((minute - 1) % count) + 1;
                    let label = exercise_label(exercises, slot);
                    push_phase(&mut phases, PhaseKind::Work, *minute_seconds, minute, slot, &label);
                }
            }
            CycleDescription::Amrap {
                total_seconds,
                exercises,
            } => {
                let label = if exercises.is_empty() {
                    "AMRAP".to_string()
                } else {
                    exercises.join(" + ")
                };
                push_phase(&mut phases, PhaseKind::Work, *total_seconds, 1, 1, &label);
            }
        }

        phases
    }

    /// Sum of all phase durations
    pub fn total_duration(&self) -> u32 {
        sum_durations(&self.phases())
    }
}

fn sum_durations(phases: &[Phase]) -> u32 {
    phases.iter().fold(0u32, |total, p| total.saturating_add(p.duration))
}

fn push_phase(phases: &mut Vec<Phase>, kind: PhaseKind, duration: u32, round: u32, exercise: u32, label: &str) {
    if duration == 0 {
        return;
    }
    phases.push(Phase {
        kind,
        duration,
        round,
        exercise,
        label: label.to_string(),
    });
}

/// Round-robin exercise name for a 1-based slot
fn exercise_label(exercises: &[String], slot: u32) -> String {
    if exercises.is_empty() {
        return format!("Exercise {}", slot);
    }
    let idx = (slot as usize - 1) % exercises.len();
    exercises[idx].clone()
}

/// Transition reported by a phase engine tick
#[derive(Clone, Debug, PartialEq)]
pub enum PhaseEvent {
    /// A new phase started
    Entered(Phase),
    /// The last phase expired
    Completed,
}

/// Runs a cycle description on the shared tick
#[derive(Clone, Debug)]
pub struct PhaseEngine {
    description: CycleDescription,
    phases: Vec<Phase>,
    index: usize,
    elapsed: u32,
    paused: bool,
    completed: bool,
    rounds_completed: u32,
}

impl PhaseEngine {
    pub fn new(description: CycleDescription) -> Self {
        let phases = description.phases();
        let completed = phases.is_empty();
        tracing::debug!(
            "{} engine created with {} phases",
            description.name(),
            phases.len()
        );

        Self {
            description,
            phases,
            index: 0,
            elapsed: 0,
            paused: false,
            completed,
            rounds_completed: 0,
        }
    }

    pub fn description(&self) -> &CycleDescription {
        &self.description
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn current_phase(&self) -> Option<&Phase> {
        if self.completed {
            None
        } else {
            self.phases.get(self.index)
        }
    }

    pub fn phase_index(&self) -> usize {
        self.index
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Seconds left in the current phase
    pub fn remaining_time(&self) -> u32 {
        self.current_phase()
            .map(|p| p.duration.saturating_sub(self.elapsed))
            .unwrap_or(0)
    }

    /// Seconds left across all remaining phases
    pub fn total_remaining_time(&self) -> u32 {
        if self.completed {
            return 0;
        }
        let later = sum_durations(&self.phases[self.index + 1..]);
        self.remaining_time().saturating_add(later)
    }

    /// Fraction of the current phase already elapsed, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        match self.current_phase() {
            Some(phase) => (self.elapsed as f64 / phase.duration as f64).min(1.0),
            None => 1.0,
        }
    }

    /// Advance one second. Ignored while paused or completed.
    pub fn tick(&mut self) -> Option<PhaseEvent> {
        if self.paused || self.completed {
            return None;
        }

        self.elapsed += 1;
        let duration = self.phases[self.index].duration;
        if self.elapsed >= duration {
            self.expire()
        } else {
            None
        }
    }

    /// Force the current phase to expire now
    pub fn skip_to_end(&mut self) -> Option<PhaseEvent> {
        if self.completed {
            return None;
        }
        self.expire()
    }

    /// End the whole protocol early
    pub fn finish(&mut self) -> Option<PhaseEvent> {
        if self.completed {
            return None;
        }
        self.index = self.phases.len();
        self.elapsed = 0;
        self.completed = true;
        tracing::info!("{} ended early", self.description.name());
        Some(PhaseEvent::Completed)
    }

    fn expire(&mut self) -> Option<PhaseEvent> {
        self.index += 1;
        self.elapsed = 0;

        match self.phases.get(self.index) {
            Some(phase) => {
                tracing::debug!(
                    "{} phase {:?} (round {}, exercise {})",
                    self.description.name(),
                    phase.kind,
                    phase.round,
                    phase.exercise
                );
                Some(PhaseEvent::Entered(phase.clone()))
            }
            None => {
                self.completed = true;
                tracing::info!("{} completed", self.description.name());
                Some(PhaseEvent::Completed)
            }
        }
    }

    /// Rounds counted by the athlete (AMRAP only)
    pub fn rounds_completed(&self) -> u32 {
        self.rounds_completed
    }

    pub fn increment_round(&mut self) {
        if matches!(self.description, CycleDescription::Amrap { .. }) && !self.completed {
            self.rounds_completed += 1;
        }
    }

    pub fn decrement_round(&mut self) {
        if matches!(self.description, CycleDescription::Amrap { .. }) {
            self.rounds_completed = self.rounds_completed.saturating_sub(1);
        }
    }
}
