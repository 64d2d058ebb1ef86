//! CSV export of the summary log.
//!
//! Two flat files are produced from the WAL: one row per session and one row
//! per logged set. Rolling up archives the WAL so each summary is exported
//! exactly once.

use crate::{Result, SessionSummary};
use std::fs::{File, OpenOptions};
use std::path::Path;

/// One row per session
#[derive(Debug, serde::Serialize)]
struct SessionRow {
    id: String,
    program_name: String,
    completed_at: String,
    total_elapsed_seconds: u32,
    steps: usize,
    completed_sets: usize,
    skipped_sets: usize,
    total_volume_kg: f64,
    average_rpe: Option<f64>,
    zone1_seconds: u32,
    zone2_seconds: u32,
    zone3_seconds: u32,
    zone4_seconds: u32,
    zone5_seconds: u32,
}

impl From<&SessionSummary> for SessionRow {
    fn from(summary: &SessionSummary) -> Self {
        let zone = |n: u8| {
            summary
                .zone_durations
                .iter()
                .find(|(z, _)| z.number() == n)
                .map(|(_, secs)| *secs)
                .unwrap_or(0)
        };

        SessionRow {
            id: summary.id.to_string(),
            program_name: summary.program_name.clone(),
            completed_at: summary.completed_at.to_rfc3339(),
            total_elapsed_seconds: summary.total_elapsed_seconds,
            steps: summary.step_count,
            completed_sets: summary.completed_sets(),
            skipped_sets: summary.skipped_sets(),
            total_volume_kg: summary.total_volume(),
            average_rpe: summary.average_rpe(),
            zone1_seconds: zone(1),
            zone2_seconds: zone(2),
            zone3_seconds: zone(3),
            zone4_seconds: zone(4),
            zone5_seconds: zone(5),
        }
    }
}

/// One row per logged set
#[derive(Debug, serde::Serialize)]
struct SetRow {
    session_id: String,
    completed_at: String,
    exercise_id: Option<String>,
    exercise_name: String,
    set_number: u32,
    reps: Option<u32>,
    weight_kg: Option<f64>,
    rpe: Option<u8>,
    rounds: Option<u32>,
    skipped: bool,
    notes: Option<String>,
}

/// Rows written by an export
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportCounts {
    pub sessions: usize,
    pub sets: usize,
}

fn open_for_append(path: &Path) -> Result<(File, bool)> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    // Headers only go into an empty file
    let needs_headers = file.metadata()?.len() == 0;
    Ok((file, needs_headers))
}

fn finish(writer: csv::Writer<File>) -> Result<()> {
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;
    Ok(())
}

/// Append summaries to the session and set CSV files
pub fn export_summaries(
    summaries: &[SessionSummary],
    sessions_csv: &Path,
    sets_csv: &Path,
) -> Result<ExportCounts> {
    let mut counts = ExportCounts::default();
    if summaries.is_empty() {
        return Ok(counts);
    }

    let (file, needs_headers) = open_for_append(sessions_csv)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);
    for summary in summaries {
        writer.serialize(SessionRow::from(summary))?;
        counts.sessions += 1;
    }
    writer.flush()?;
    finish(writer)?;

    let (file, needs_headers) = open_for_append(sets_csv)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);
    for summary in summaries {
        for record in &summary.set_records {
            writer.serialize(SetRow {
                session_id: summary.id.to_string(),
                completed_at: summary.completed_at.to_rfc3339(),
                exercise_id: record.exercise_id.clone(),
                exercise_name: record.exercise_name.clone(),
                set_number: record.set_number,
                reps: record.reps,
                weight_kg: record.weight,
                rpe: record.rpe,
                rounds: record.rounds_completed,
                skipped: record.skipped,
                notes: record.notes.clone(),
            })?;
            counts.sets += 1;
        }
    }
    writer.flush()?;
    finish(writer)?;

    tracing::info!(
        "Exported {} sessions and {} sets to CSV",
        counts.sessions,
        counts.sets
    );
    Ok(counts)
}

/// Export the WAL to CSV and archive it
///
/// The CSV files are fsynced before the WAL is renamed to `.wal.processed`,
/// so a crash never loses summaries.
pub fn wal_to_csv_and_archive(wal_path: &Path, sessions_csv: &Path, sets_csv: &Path) -> Result<ExportCounts> {
    let summaries = crate::wal::read_summaries(wal_path)?;

    if summaries.is_empty() {
        tracing::info!("No summaries in WAL to roll up");
        return Ok(ExportCounts::default());
    }

    let counts = export_summaries(&summaries, sessions_csv, sets_csv)?;

    let processed_path = wal_path.with_extension("wal.processed");
    std::fs::rename(wal_path, &processed_path)?;
    tracing::info!("Archived WAL to {:?}", processed_path);

    Ok(counts)
}

/// Remove archived `.wal.processed` files from `dir`
pub fn cleanup_processed_wals(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map(|ext| ext == "processed").unwrap_or(false) {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed WAL: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed WAL files", count);
    }
    Ok(count)
}
