//! Terminal session summary.
//!
//! Built by the owner once a session completes; this is the record that gets
//! appended to the summary log.

use crate::session::{SetRecord, WorkoutSession};
use crate::zones::{zone_percentages, HeartRateZone};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Outcome of one completed session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub id: Uuid,
    pub program_name: String,
    pub completed_at: DateTime<Utc>,
    pub total_elapsed_seconds: u32,
    pub step_count: usize,
    /// Seconds spent in each zone with a known heart rate
    #[serde(default)]
    pub zone_durations: BTreeMap<HeartRateZone, u32>,
    #[serde(default)]
    pub set_records: Vec<SetRecord>,
}

impl SessionSummary {
    /// Summarize a completed session
    ///
    /// Returns `None` while the session is still in progress.
    pub fn from_session(
        session: &WorkoutSession,
        program_name: impl Into<String>,
        completed_at: DateTime<Utc>,
    ) -> Option<Self> {
        if !session.is_workout_completed() {
            return None;
        }

        Some(Self {
            id: Uuid::new_v4(),
            program_name: program_name.into(),
            completed_at,
            total_elapsed_seconds: session.general_elapsed_time(),
            step_count: session.steps().len(),
            zone_durations: session.zone_durations().clone(),
            set_records: session.set_records().to_vec(),
        })
    }

    pub fn zone_percentages(&self) -> BTreeMap<HeartRateZone, f64> {
        zone_percentages(&self.zone_durations)
    }

    /// Sets logged as performed (not skipped)
    pub fn completed_sets(&self) -> usize {
        self.set_records
            .iter()
            .filter(|r| !r.skipped && r.rounds_completed.is_none())
            .count()
    }

    pub fn skipped_sets(&self) -> usize {
        self.set_records.iter().filter(|r| r.skipped).count()
    }

    /// Sum of reps x weight over performed sets, in kilograms
    pub fn total_volume(&self) -> f64 {
        self.set_records
            .iter()
            .filter(|r| !r.skipped)
            .filter_map(|r| Some(r.reps? as f64 * r.weight?))
            .sum()
    }

    /// Mean RPE across sets that have one
    pub fn average_rpe(&self) -> Option<f64> {
        let rpes: Vec<f64> = self
            .set_records
            .iter()
            .filter_map(|r| r.rpe.map(f64::from))
            .collect();
        if rpes.is_empty() {
            None
        } else {
            Some(rpes.iter().sum::<f64>() / rpes.len() as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Block, ExerciseItem, LoadTarget, NoOneRepMax, Program, WorkoutSet};

    fn bench_program() -> Program {
        Program::new(
            "Bench",
            vec![Block::simple(vec![ExerciseItem::new(
                "bench",
                "Bench Press",
                vec![
                    WorkoutSet::reps(5).with_load(LoadTarget::Weight(80.0)),
                    WorkoutSet::reps(5),
                    WorkoutSet::reps(5),
                ],
            )])],
        )
    }

    #[test]
    fn test_no_summary_before_completion() {
        let mut session = WorkoutSession::new(190);
        session.start(&bench_program(), 0, &NoOneRepMax);
        assert!(SessionSummary::from_session(&session, "Bench", Utc::now()).is_none());
    }

    #[test]
    fn test_summary_totals() {
        let mut session = WorkoutSession::new(190);
        session.start(&bench_program(), 0, &NoOneRepMax);
        session.record_heart_rate(150);
        for _ in 0..30 {
            session.tick();
        }

        session.draft_mut().rpe = Some(7);
        session.confirm_set().unwrap();
        session.skip_current_set();
        session.draft_mut().rpe = Some(9);
        session.confirm_set().unwrap();

        let summary = SessionSummary::from_session(&session, "Bench", Utc::now()).unwrap();
        assert_eq!(summary.total_elapsed_seconds, 30);
        assert_eq!(summary.completed_sets(), 2);
        assert_eq!(summary.skipped_sets(), 1);
        assert_eq!(summary.total_volume(), 2.0 * 5.0 * 80.0);
        assert_eq!(summary.average_rpe(), Some(8.0));

        // 150 / 190 ~ 79%
        let pct = summary.zone_percentages();
        assert_eq!(pct.get(&HeartRateZone::Zone3), Some(&100.0));
    }

    #[test]
    fn test_summary_json_roundtrip() {
        let mut session = WorkoutSession::new(190);
        session.start(&bench_program(), 0, &NoOneRepMax);
        session.skip_to_next_step();

        let summary = SessionSummary::from_session(&session, "Bench", Utc::now()).unwrap();
        let json = serde_json::to_string(&summary).unwrap();
        let parsed: SessionSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, summary);
    }
}
