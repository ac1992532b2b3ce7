//! Resize diagnostics: timing and seam statistics for each carving phase.
//!
//! Every call to [`resize`](crate::resize::resize) collects diagnostics
//! alongside the carved grid. Timing goes through the [`Clock`] trait so
//! the engine itself never reads the system time; front ends pass a
//! real clock and library callers that do not care pass [`NoClock`].
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::seam::Direction;
use crate::types::Dimensions;

/// Source of timestamps for diagnostics.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// Capture the current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// A clock that never advances. Every duration reads as zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClock;

impl Clock for NoClock {
    type Instant = ();

    fn now(&self) {}

    fn elapsed(&self, _since: &Self::Instant) -> Duration {
        Duration::ZERO
    }
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single resize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResizeDiagnostics {
    /// Vertical seams (width reduction), carved first.
    pub vertical: PhaseDiagnostics,
    /// Horizontal seams (height reduction), carved second.
    pub horizontal: PhaseDiagnostics,
    /// Total wall-clock duration of the resize (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Sizes before and after.
    pub summary: ResizeSummary,
}

/// Statistics for the seams removed in one direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseDiagnostics {
    /// Orientation of the seams in this phase.
    pub direction: Direction,
    /// Wall-clock duration of this phase (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Number of seams removed.
    pub seams_removed: u32,
    /// Energy of the cheapest seam removed, if any.
    pub min_seam_energy: Option<f64>,
    /// Energy of the most expensive seam removed, if any.
    pub max_seam_energy: Option<f64>,
    /// Sum of the energies of all removed seams.
    pub total_seam_energy: f64,
}

impl PhaseDiagnostics {
    /// An empty phase for `direction`.
    #[must_use]
    pub const fn new(direction: Direction) -> Self {
        Self {
            direction,
            duration: Duration::ZERO,
            seams_removed: 0,
            min_seam_energy: None,
            max_seam_energy: None,
            total_seam_energy: 0.0,
        }
    }

    /// Account for one removed seam.
    pub fn record(&mut self, seam_energy: f64) {
        self.seams_removed += 1;
        self.total_seam_energy += seam_energy;
        self.min_seam_energy = Some(self.min_seam_energy.map_or(seam_energy, |m| m.min(seam_energy)));
        self.max_seam_energy = Some(self.max_seam_energy.map_or(seam_energy, |m| m.max(seam_energy)));
    }

    /// Mean seam energy, or `0.0` if nothing was removed.
    #[must_use]
    pub fn mean_seam_energy(&self) -> f64 {
        if self.seams_removed == 0 {
            0.0
        } else {
            self.total_seam_energy / f64::from(self.seams_removed)
        }
    }
}

/// High-level summary of a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeSummary {
    /// Size before the resize.
    pub source: Dimensions,
    /// Size that was asked for.
    pub requested: Dimensions,
    /// Size after the resize. Differs from `requested` only when an
    /// enlargement was ignored.
    pub result: Dimensions,
}

impl ResizeDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Resize Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Source: {}  Requested: {}  Result: {}",
            self.summary.source, self.summary.requested, self.summary.result,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<12} {:>10} {:>10} {:>8}  {}",
            "Phase", "Duration", "% Total", "Seams", "Seam energy"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, phase) in [("Vertical", &self.vertical), ("Horizontal", &self.horizontal)] {
            let ms = duration_ms(phase.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "{name:<12} {ms:>8.3}ms {pct:>9.1}% {:>8}  {}",
                phase.seams_removed,
                format_energies(phase),
            ));
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn format_energies(phase: &PhaseDiagnostics) -> String {
    match (phase.min_seam_energy, phase.max_seam_energy) {
        (Some(min), Some(max)) => format!(
            "min={min:.1} mean={:.1} max={max:.1}",
            phase.mean_seam_energy()
        ),
        _ => "-".to_owned(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_millis(1234);
        let ms = duration_ms(d);
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn no_clock_reads_zero() {
        let clock = NoClock;
        let start = clock.now();
        assert_eq!(clock.elapsed(&start), Duration::ZERO);
    }

    #[test]
    fn phase_records_seam_statistics() {
        let mut phase = PhaseDiagnostics::new(Direction::Vertical);
        assert!(phase.mean_seam_energy().abs() < f64::EPSILON);
        assert_eq!(phase.min_seam_energy, None);

        for e in [30.0, 10.0, 20.0] {
            phase.record(e);
        }
        assert_eq!(phase.seams_removed, 3);
        assert_eq!(phase.min_seam_energy, Some(10.0));
        assert_eq!(phase.max_seam_energy, Some(30.0));
        assert!((phase.mean_seam_energy() - 20.0).abs() < f64::EPSILON);
    }

    fn sample() -> ResizeDiagnostics {
        let mut vertical = PhaseDiagnostics::new(Direction::Vertical);
        vertical.duration = Duration::from_millis(30);
        vertical.record(12.5);
        vertical.record(40.0);
        let mut horizontal = PhaseDiagnostics::new(Direction::Horizontal);
        horizontal.duration = Duration::from_millis(10);
        ResizeDiagnostics {
            vertical,
            horizontal,
            total_duration: Duration::from_millis(40),
            summary: ResizeSummary {
                source: Dimensions::new(100, 80),
                requested: Dimensions::new(98, 80),
                result: Dimensions::new(98, 80),
            },
        }
    }

    #[test]
    fn report_lists_both_phases() {
        let report = sample().report();
        assert!(report.contains("Resize Diagnostics Report"));
        assert!(report.contains("100x80"));
        assert!(report.contains("Vertical"));
        assert!(report.contains("Horizontal"));
        assert!(report.contains("min=12.5"));
    }

    #[test]
    fn durations_serialize_as_seconds() {
        let json = serde_json::to_value(sample()).unwrap();
        let total = json["total_duration"].as_f64().unwrap();
        assert!((total - 0.04).abs() < 1e-9);
        assert_eq!(json["vertical"]["seams_removed"], 2);
    }
}
