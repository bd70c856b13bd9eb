//! Monotonic engine clock and OSC timetag conversion.
//!
//! All scheduling arithmetic happens on a monotonic clock whose zero is
//! captured once at process start. Timetags sent to the server are derived
//! from the same anchor, so wall-clock adjustments (NTP slews) can never
//! reorder already-computed event times.

use std::sync::LazyLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use rosc::OscTime;

/// OSC/NTP epoch is 1900-01-01; Unix epoch is 1970-01-01.
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// Anchor pair captured once: (monotonic instant, wall-clock seconds).
/// The Instant provides monotonicity, the SystemTime only the epoch.
static CLOCK_ANCHOR: LazyLock<(Instant, f64)> = LazyLock::new(|| {
    let wall = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64();
    (Instant::now(), wall)
});

/// Seconds elapsed on the engine clock since the anchor.
pub fn now_secs() -> f64 {
    CLOCK_ANCHOR.0.elapsed().as_secs_f64()
}

/// Convert an absolute engine-clock time to an OSC timetag.
pub fn osc_time_at(at_secs: f64) -> OscTime {
    let (_, anchor_wall) = &*CLOCK_ANCHOR;
    let total_secs = anchor_wall + at_secs;
    let secs = total_secs as u64 + NTP_UNIX_OFFSET;
    let frac = (total_secs.fract() * (u32::MAX as f64)) as u32;
    OscTime {
        seconds: secs as u32,
        fractional: frac,
    }
}

/// Immediate timetag (0, 1) — execute as soon as received.
pub fn osc_time_immediate() -> OscTime {
    OscTime {
        seconds: 0,
        fractional: 1,
    }
}
