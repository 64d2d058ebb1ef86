//! Session execution state machine.
//!
//! `WorkoutSession` is a single mutable record driven by two things:
//! - `tick()`, called once per second by the owner
//! - user actions (confirm/skip a set, skip/go back a step, pause)
//!
//! Both run on the owner's thread, one at a time. Every call returns the
//! events produced by the transition; the owner forwards them to sinks
//! afterwards. Calls that make no sense in the current state are no-ops.
//!
//! ```text
//! idle → countdown? → running ⇄ paused → completed
//! ```

use crate::flatten::{flatten, FlattenedProgram};
use crate::protocol::{CycleDescription, Phase, PhaseEngine, PhaseEvent, PhaseKind};
use crate::zones::{zone_percentages, HeartRateZone};
use crate::{
    Error, OneRepMaxLookup, Program, Result, SessionConfig, SessionEvent, Step, StepKind,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Coarse state of a session
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Countdown,
    Running,
    Paused,
    Completed,
}

/// Input fields for the set in progress
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SetEntry {
    pub reps: Option<u32>,
    /// Kilograms
    pub weight: Option<f64>,
    /// Rate of perceived exertion, 1-10
    pub rpe: Option<u8>,
    pub notes: Option<String>,
}

impl SetEntry {
    pub fn validate(&self) -> Result<()> {
        match self.reps {
            None => return Err(Error::InvalidEntry("reps are required".into())),
            Some(0) => return Err(Error::InvalidEntry("reps must be at least 1".into())),
            Some(_) => {}
        }
        if let Some(weight) = self.weight {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::InvalidEntry(format!("invalid weight {}", weight)));
            }
        }
        if let Some(rpe) = self.rpe {
            if !(1..=10).contains(&rpe) {
                return Err(Error::InvalidEntry(format!("RPE must be 1-10, got {}", rpe)));
            }
        }
        Ok(())
    }
}

/// Performance record for one set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SetRecord {
    pub step_index: usize,
    pub exercise_id: Option<String>,
    pub exercise_name: String,
    /// 1-based
    pub set_number: u32,
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    pub rpe: Option<u8>,
    pub notes: Option<String>,
    pub skipped: bool,
    /// Rounds counted during an AMRAP
    #[serde(default)]
    pub rounds_completed: Option<u32>,
    /// Session time at which the set was logged
    pub elapsed_seconds: u32,
}

/// Phase engine state for rendering
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IntervalSnapshot {
    pub protocol: String,
    pub phase: Option<Phase>,
    pub phase_index: usize,
    pub phase_count: usize,
    pub remaining_time: u32,
    pub total_remaining_time: u32,
    pub progress: f64,
    pub rounds_completed: u32,
}

/// Read-only view of the session for rendering
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub step_index: usize,
    pub step_count: usize,
    pub step: Option<Step>,
    pub general_elapsed_time: u32,
    pub step_elapsed_time: u32,
    pub step_remaining_time: Option<u32>,
    pub countdown_remaining_seconds: u32,
    pub completed_sets: u32,
    pub heart_rate: Option<u32>,
    pub current_zone: Option<HeartRateZone>,
    pub zone_percentages: BTreeMap<HeartRateZone, f64>,
    pub interval: Option<IntervalSnapshot>,
    pub total_estimated_duration: u32,
}

/// The live execution session
#[derive(Clone, Debug)]
pub struct WorkoutSession {
    max_heart_rate: u32,
    started: bool,
    steps: Vec<Step>,
    total_estimated_duration: u32,
    current_step_index: usize,
    general_elapsed_time: u32,
    step_elapsed_time: u32,
    is_paused: bool,
    is_countdown_active: bool,
    countdown_remaining_seconds: u32,
    is_workout_completed: bool,
    completed_sets_in_current_step: u32,
    zone_durations: BTreeMap<HeartRateZone, u32>,
    heart_rate: Option<u32>,
    draft: SetEntry,
    set_records: Vec<SetRecord>,
    interval: Option<PhaseEngine>,
}

impl WorkoutSession {
    /// Create an idle session
    pub fn new(max_heart_rate: u32) -> Self {
        Self {
            max_heart_rate,
            started: false,
            steps: Vec::new(),
            total_estimated_duration: 0,
            current_step_index: 0,
            general_elapsed_time: 0,
            step_elapsed_time: 0,
            is_paused: false,
            is_countdown_active: false,
            countdown_remaining_seconds: 0,
            is_workout_completed: false,
            completed_sets_in_current_step: 0,
            zone_durations: BTreeMap::new(),
            heart_rate: None,
            draft: SetEntry::default(),
            set_records: Vec::new(),
            interval: None,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.effective_max_heart_rate())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Flatten `program` and start executing it
    pub fn start<L>(&mut self, program: &Program, countdown_seconds: u32, maxes: &L) -> Vec<SessionEvent>
    where
        L: OneRepMaxLookup + ?Sized,
    {
        tracing::info!("Starting '{}' with {}s countdown", program.name, countdown_seconds);
        self.start_with_steps(flatten(program, maxes), countdown_seconds)
    }

    /// Start executing an already flattened program
    pub fn start_with_steps(&mut self, program: FlattenedProgram, countdown_seconds: u32) -> Vec<SessionEvent> {
        let max_heart_rate = self.max_heart_rate;
        *self = Self::new(max_heart_rate);

        self.started = true;
        self.total_estimated_duration = program.total_estimated_duration;
        self.steps = program.steps;

        if self.steps.is_empty() {
            tracing::warn!("Program has no steps, completing immediately");
            return self.complete();
        }

        if countdown_seconds > 0 {
            self.is_countdown_active = true;
            self.countdown_remaining_seconds = countdown_seconds;
            Vec::new()
        } else {
            self.enter_step(0)
        }
    }

    /// Return to idle, dropping all counters
    pub fn reset_session(&mut self) {
        tracing::info!("Session reset");
        *self = Self::new(self.max_heart_rate);
    }

    pub fn status(&self) -> SessionStatus {
        if !self.started {
            SessionStatus::Idle
        } else if self.is_workout_completed {
            SessionStatus::Completed
        } else if self.is_countdown_active {
            SessionStatus::Countdown
        } else if self.is_paused {
            SessionStatus::Paused
        } else {
            SessionStatus::Running
        }
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advance the session by one second
    pub fn tick(&mut self) -> Vec<SessionEvent> {
        match self.status() {
            SessionStatus::Idle | SessionStatus::Completed | SessionStatus::Paused => {
                return Vec::new();
            }
            SessionStatus::Countdown => {
                self.countdown_remaining_seconds = self.countdown_remaining_seconds.saturating_sub(1);
                tracing::debug!("Countdown: {}", self.countdown_remaining_seconds);
                if self.countdown_remaining_seconds == 0 {
                    self.is_countdown_active = false;
                    return self.enter_step(0);
                }
                return Vec::new();
            }
            SessionStatus::Running => {}
        }

        self.general_elapsed_time += 1;
        if let Some(zone) = self.current_zone() {
            *self.zone_durations.entry(zone).or_insert(0) += 1;
        }

        let step = &self.steps[self.current_step_index];
        let timed_duration = step.timed_duration();
        let is_interval = matches!(step.kind, StepKind::Interval { .. });

        if let Some(duration) = timed_duration {
            self.step_elapsed_time += 1;
            if self.step_elapsed_time >= duration {
                return self.advance();
            }
        } else if is_interval {
            self.step_elapsed_time += 1;
            let event = self.interval.as_mut().and_then(|engine| engine.tick());
            return self.handle_phase_event(event);
        }

        Vec::new()
    }

    // ------------------------------------------------------------------
    // User actions
    // ------------------------------------------------------------------

    /// Log the draft entry for the current set
    ///
    /// Fails without touching state when the draft is invalid. Outside a
    /// reps step this is a no-op.
    pub fn confirm_set(&mut self) -> Result<Vec<SessionEvent>> {
        if !self.accepts_set_actions() {
            return Ok(Vec::new());
        }
        self.draft.validate()?;
        Ok(self.finish_set(false))
    }

    /// Move past the current set without validating the draft
    pub fn skip_current_set(&mut self) -> Vec<SessionEvent> {
        if !self.accepts_set_actions() {
            return Vec::new();
        }
        self.finish_set(true)
    }

    /// Jump to the next step; on the last step this finishes the workout
    pub fn skip_to_next_step(&mut self) -> Vec<SessionEvent> {
        if !self.accepts_navigation() {
            return Vec::new();
        }
        tracing::info!("Skipping step {}", self.current_step_index);
        self.advance()
    }

    /// Jump back one step. No-op on the first step.
    pub fn go_to_previous_step(&mut self) -> Vec<SessionEvent> {
        if !self.accepts_navigation() || self.current_step_index == 0 {
            return Vec::new();
        }
        tracing::info!("Going back to step {}", self.current_step_index - 1);
        self.enter_step(self.current_step_index - 1)
    }

    /// Pause or resume. Only effective once running and outside the countdown.
    ///
    /// Returns whether the session is paused afterwards.
    pub fn toggle_pause(&mut self) -> bool {
        if matches!(self.status(), SessionStatus::Running | SessionStatus::Paused) {
            self.is_paused = !self.is_paused;
            if let Some(engine) = self.interval.as_mut() {
                if self.is_paused {
                    engine.pause();
                } else {
                    engine.resume();
                }
            }
            tracing::info!("Session {}", if self.is_paused { "paused" } else { "resumed" });
        }
        self.is_paused
    }

    /// Latest heart rate sample; 0 means unknown
    pub fn record_heart_rate(&mut self, bpm: u32) {
        self.heart_rate = (bpm > 0).then_some(bpm);
    }

    /// Draft for the set in progress
    pub fn draft(&self) -> &SetEntry {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut SetEntry {
        &mut self.draft
    }

    /// Count one AMRAP round
    pub fn increment_round(&mut self) {
        if self.accepts_navigation() {
            if let Some(engine) = self.interval.as_mut() {
                engine.increment_round();
            }
        }
    }

    pub fn decrement_round(&mut self) {
        if self.accepts_navigation() {
            if let Some(engine) = self.interval.as_mut() {
                engine.decrement_round();
            }
        }
    }

    /// Expire the current interval phase now
    pub fn skip_phase(&mut self) -> Vec<SessionEvent> {
        if !self.accepts_navigation() {
            return Vec::new();
        }
        let event = self.interval.as_mut().and_then(|engine| engine.skip_to_end());
        self.handle_phase_event(event)
    }

    /// End the current interval protocol early
    pub fn end_interval(&mut self) -> Vec<SessionEvent> {
        if !self.accepts_navigation() {
            return Vec::new();
        }
        let event = self.interval.as_mut().and_then(|engine| engine.finish());
        self.handle_phase_event(event)
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    fn accepts_navigation(&self) -> bool {
        matches!(self.status(), SessionStatus::Running | SessionStatus::Paused)
    }

    fn accepts_set_actions(&self) -> bool {
        self.accepts_navigation()
            && self
                .current_step()
                .map(|step| step.is_reps())
                .unwrap_or(false)
    }

    fn finish_set(&mut self, skipped: bool) -> Vec<SessionEvent> {
        let Some(step) = self.steps.get(self.current_step_index) else {
            return Vec::new();
        };
        let total_sets = step.total_sets().unwrap_or(1);

        self.completed_sets_in_current_step += 1;
        let set_number = self.completed_sets_in_current_step;

        let draft = std::mem::take(&mut self.draft);
        let record = SetRecord {
            step_index: self.current_step_index,
            exercise_id: step.exercise_id.clone(),
            exercise_name: step.title.clone(),
            set_number,
            reps: if skipped { None } else { draft.reps },
            weight: if skipped { None } else { draft.weight },
            rpe: if skipped { None } else { draft.rpe },
            notes: draft.notes,
            skipped,
            rounds_completed: None,
            elapsed_seconds: self.general_elapsed_time,
        };
        tracing::debug!(
            "Set {}/{} of '{}' {}",
            set_number,
            total_sets,
            record.exercise_name,
            if skipped { "skipped" } else { "confirmed" }
        );
        self.set_records.push(record);

        let mut events = vec![SessionEvent::ConfirmedSet {
            step_index: self.current_step_index,
            set_number,
            total_sets,
            skipped,
        }];

        if set_number >= total_sets {
            events.extend(self.advance());
        } else {
            self.draft = self.prefill_draft();
        }
        events
    }

    fn handle_phase_event(&mut self, event: Option<PhaseEvent>) -> Vec<SessionEvent> {
        match event {
            Some(PhaseEvent::Entered(phase)) => vec![self.phase_event(&phase)],
            Some(PhaseEvent::Completed) => {
                self.record_amrap_rounds();
                self.advance()
            }
            None => Vec::new(),
        }
    }

    fn phase_event(&self, phase: &Phase) -> SessionEvent {
        match phase.kind {
            PhaseKind::Work => SessionEvent::EnteredWork {
                step_index: self.current_step_index,
                title: phase.label.clone(),
            },
            PhaseKind::Rest | PhaseKind::Recovery => SessionEvent::EnteredRest {
                step_index: self.current_step_index,
                duration: phase.duration,
            },
        }
    }

    fn record_amrap_rounds(&mut self) {
        let Some(engine) = self.interval.as_ref() else {
            return;
        };
        if !matches!(engine.description(), CycleDescription::Amrap { .. }) {
            return;
        }
        let step = &self.steps[self.current_step_index];
        self.set_records.push(SetRecord {
            step_index: self.current_step_index,
            exercise_id: None,
            exercise_name: step.title.clone(),
            set_number: 1,
            reps: None,
            weight: None,
            rpe: None,
            notes: None,
            skipped: false,
            rounds_completed: Some(engine.rounds_completed()),
            elapsed_seconds: self.general_elapsed_time,
        });
    }

    /// Move to the next step, or complete after the last one
    fn advance(&mut self) -> Vec<SessionEvent> {
        let next = self.current_step_index + 1;
        if next < self.steps.len() {
            self.enter_step(next)
        } else {
            self.complete()
        }
    }

    fn enter_step(&mut self, index: usize) -> Vec<SessionEvent> {
        self.current_step_index = index;
        self.step_elapsed_time = 0;
        self.completed_sets_in_current_step = 0;
        self.interval = None;

        let step = &self.steps[index];
        tracing::debug!("Entering step {}: {}", index, step.title);

        let event = match &step.kind {
            StepKind::Timed { duration, is_rest: true } => SessionEvent::EnteredRest {
                step_index: index,
                duration: *duration,
            },
            StepKind::Timed { .. } | StepKind::Reps { .. } => SessionEvent::EnteredWork {
                step_index: index,
                title: step.title.clone(),
            },
            StepKind::Interval { protocol } => {
                let mut engine = PhaseEngine::new(protocol.clone());
                if self.is_paused {
                    engine.pause();
                }
                let first = engine.current_phase().cloned();
                self.interval = Some(engine);
                match first {
                    Some(phase) => self.phase_event(&phase),
                    // Nothing to run
                    None => return self.advance(),
                }
            }
        };

        self.draft = self.prefill_draft();
        vec![event]
    }

    fn prefill_draft(&self) -> SetEntry {
        match self.current_step() {
            Some(step) => match step.kind {
                StepKind::Reps { reps_per_set, .. } => SetEntry {
                    reps: Some(reps_per_set),
                    weight: step.prescription.as_ref().and_then(|p| p.first_weight()),
                    rpe: None,
                    notes: None,
                },
                _ => SetEntry::default(),
            },
            None => SetEntry::default(),
        }
    }

    fn complete(&mut self) -> Vec<SessionEvent> {
        self.is_workout_completed = true;
        self.is_paused = true;
        if let Some(engine) = self.interval.as_mut() {
            engine.pause();
        }
        tracing::info!(
            "Workout completed in {}s ({} sets logged)",
            self.general_elapsed_time,
            self.set_records.len()
        );
        vec![SessionEvent::WorkoutCompleted {
            elapsed_seconds: self.general_elapsed_time,
        }]
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn current_step(&self) -> Option<&Step> {
        if self.started {
            self.steps.get(self.current_step_index)
        } else {
            None
        }
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    pub fn general_elapsed_time(&self) -> u32 {
        self.general_elapsed_time
    }

    pub fn step_elapsed_time(&self) -> u32 {
        self.step_elapsed_time
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    pub fn is_countdown_active(&self) -> bool {
        self.is_countdown_active
    }

    pub fn countdown_remaining_seconds(&self) -> u32 {
        self.countdown_remaining_seconds
    }

    pub fn is_workout_completed(&self) -> bool {
        self.is_workout_completed
    }

    pub fn completed_sets_in_current_step(&self) -> u32 {
        self.completed_sets_in_current_step
    }

    pub fn zone_durations(&self) -> &BTreeMap<HeartRateZone, u32> {
        &self.zone_durations
    }

    pub fn set_records(&self) -> &[SetRecord] {
        &self.set_records
    }

    pub fn interval(&self) -> Option<&PhaseEngine> {
        self.interval.as_ref()
    }

    pub fn heart_rate(&self) -> Option<u32> {
        self.heart_rate
    }

    pub fn max_heart_rate(&self) -> u32 {
        self.max_heart_rate
    }

    pub fn total_estimated_duration(&self) -> u32 {
        self.total_estimated_duration
    }

    pub fn current_zone(&self) -> Option<HeartRateZone> {
        self.heart_rate
            .and_then(|bpm| HeartRateZone::from_bpm(bpm, self.max_heart_rate))
    }

    /// Seconds left in a timed or interval step
    pub fn step_remaining_time(&self) -> Option<u32> {
        let step = self.current_step()?;
        match step.kind {
            StepKind::Timed { duration, .. } => Some(duration.saturating_sub(self.step_elapsed_time)),
            StepKind::Interval { .. } => self.interval.as_ref().map(|e| e.remaining_time()),
            StepKind::Reps { .. } => None,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status(),
            step_index: self.current_step_index,
            step_count: self.steps.len(),
            step: self.current_step().cloned(),
            general_elapsed_time: self.general_elapsed_time,
            step_elapsed_time: self.step_elapsed_time,
            step_remaining_time: self.step_remaining_time(),
            countdown_remaining_seconds: self.countdown_remaining_seconds,
            completed_sets: self.completed_sets_in_current_step,
            heart_rate: self.heart_rate,
            current_zone: self.current_zone(),
            zone_percentages: zone_percentages(&self.zone_durations),
            interval: self.interval.as_ref().map(|engine| IntervalSnapshot {
                protocol: engine.description().name().to_string(),
                phase: engine.current_phase().cloned(),
                phase_index: engine.phase_index(),
                phase_count: engine.phases().len(),
                remaining_time: engine.remaining_time(),
                total_remaining_time: engine.total_remaining_time(),
                progress: engine.progress(),
                rounds_completed: engine.rounds_completed(),
            }),
            total_estimated_duration: self.total_estimated_duration,
        }
    }
}
