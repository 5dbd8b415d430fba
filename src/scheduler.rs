//! Per-sensor sampling schedule.
//!
//! Each sensor channel is sampled when its interval has elapsed since the
//! previous sample.  The first check after boot is always due, so a
//! reading goes out on the first loop iteration.
//!
//! ```text
//!   t=0        t=interval     t=2*interval
//!    │  sample     │  sample      │  sample
//!    ▼             ▼              ▼
//! ───●─────────────●──────────────●──────▶ now_ms
//!     ◀─ skipped ─▶
//! ```
//!
//! The effective interval is never shorter than what the hardware allows
//! (MAX6675 needs 250 ms per conversion), whatever the configuration says.

// ═══════════════════════════════════════════════════════════════
//  SampleSchedule
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSchedule {
    interval_ms: u32,
    last_ms: Option<u64>,
}

impl SampleSchedule {
    /// `interval_ms` as configured, raised to `min_spacing_ms` if lower.
    pub fn new(interval_ms: u32, min_spacing_ms: u32) -> Self {
        Self {
            interval_ms: interval_ms.max(min_spacing_ms).max(1),
            last_ms: None,
        }
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Time of the last sample, if any.
    pub fn last_ms(&self) -> Option<u64> {
        self.last_ms
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        self.last_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= u64::from(self.interval_ms))
    }

    /// Record a sample taken at `now_ms`.
    pub fn mark(&mut self, now_ms: u64) {
        self.last_ms = Some(now_ms);
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
