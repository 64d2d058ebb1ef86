//! Heart rate zones.
//!
//! Five intensity bands derived from a percentage of maximum heart rate:
//!
//! | Zone | % of max HR |
//! |------|-------------|
//! | 1    | below 60    |
//! | 2    | 60-69       |
//! | 3    | 70-79       |
//! | 4    | 80-89       |
//! | 5    | 90 and up   |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Heart rate zone (1-5)
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HeartRateZone {
    Zone1,
    Zone2,
    Zone3,
    Zone4,
    Zone5,
}

impl HeartRateZone {
    /// Zone number (1-5)
    pub fn number(&self) -> u8 {
        match self {
            HeartRateZone::Zone1 => 1,
            HeartRateZone::Zone2 => 2,
            HeartRateZone::Zone3 => 3,
            HeartRateZone::Zone4 => 4,
            HeartRateZone::Zone5 => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HeartRateZone::Zone1 => "Recovery",
            HeartRateZone::Zone2 => "Endurance",
            HeartRateZone::Zone3 => "Tempo",
            HeartRateZone::Zone4 => "Threshold",
            HeartRateZone::Zone5 => "Maximum",
        }
    }

    /// Classify a heart rate sample.
    ///
    /// Returns `None` when the sample or the maximum is unknown (zero).
    pub fn from_bpm(bpm: u32, max_heart_rate: u32) -> Option<Self> {
        if bpm == 0 || max_heart_rate == 0 {
            return None;
        }

        let percent = bpm as f64 * 100.0 / max_heart_rate as f64;
        let zone = if percent < 60.0 {
            HeartRateZone::Zone1
        } else if percent < 70.0 {
            HeartRateZone::Zone2
        } else if percent < 80.0 {
            HeartRateZone::Zone3
        } else if percent < 90.0 {
            HeartRateZone::Zone4
        } else {
            HeartRateZone::Zone5
        };
        Some(zone)
    }

    /// BPM range `[min, max)` covered by this zone for a given maximum
    pub fn bpm_range(&self, max_heart_rate: u32) -> (u32, u32) {
        let (lo, hi) = match self {
            HeartRateZone::Zone1 => (0, 60),
            HeartRateZone::Zone2 => (60, 70),
            HeartRateZone::Zone3 => (70, 80),
            HeartRateZone::Zone4 => (80, 90),
            HeartRateZone::Zone5 => (90, 100),
        };
        (max_heart_rate * lo / 100, max_heart_rate * hi / 100)
    }
}

/// Share of total time spent in each zone, as percentages of the summed duration.
///
/// Zones without any time are omitted. An empty map yields an empty result.
pub fn zone_percentages(durations: &BTreeMap<HeartRateZone, u32>) -> BTreeMap<HeartRateZone, f64> {
    let total: u32 = durations.values().sum();
    if total == 0 {
        return BTreeMap::new();
    }

    durations
        .iter()
        .filter(|(_, secs)| **secs > 0)
        .map(|(zone, secs)| (*zone, *secs as f64 * 100.0 / total as f64))
        .collect()
}
