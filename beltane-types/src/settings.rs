//! Engine settings: tempo, lookahead window, control-tick interval, and
//! the followers' trigger offsets. Validated at the configuration
//! boundary so the scheduler can assume sane positive values.

use serde::{Deserialize, Serialize};

pub const DEFAULT_BPM: f32 = 50.0;
pub const DEFAULT_LOOKAHEAD_SECS: f64 = 0.2;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 20;
/// In-cycle trigger points for V2, V4, V6 as fractions of a cycle.
pub const DEFAULT_TRIGGER_OFFSETS: [f64; 3] = [0.4, 0.1, 0.0];
pub const DEFAULT_TUNING_A4: f64 = 440.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Beats per minute; one cycle is four beats.
    pub bpm: f32,
    /// How far ahead of the control clock events are scheduled.
    pub lookahead_secs: f64,
    /// Wake interval of the polling loop.
    pub tick_interval_ms: u64,
    /// Fractional in-cycle offsets for the follower voices (V2, V4, V6).
    pub trigger_offsets: [f64; 3],
    /// Reference pitch for A4.
    pub tuning_a4: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            lookahead_secs: DEFAULT_LOOKAHEAD_SECS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            trigger_offsets: DEFAULT_TRIGGER_OFFSETS,
            tuning_a4: DEFAULT_TUNING_A4,
        }
    }
}

impl EngineSettings {
    /// Seconds per cycle at the current tempo (one cycle = four beats).
    pub fn cycle_duration_secs(&self) -> f64 {
        (60.0 / self.bpm as f64) * 4.0
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.bpm > 0.0) {
            return Err(format!("bpm must be positive, got {}", self.bpm));
        }
        if !(self.lookahead_secs > 0.0) {
            return Err(format!(
                "lookahead must be positive, got {}",
                self.lookahead_secs
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err("tick interval must be at least 1ms".to_string());
        }
        for (i, &offset) in self.trigger_offsets.iter().enumerate() {
            if !(0.0..1.0).contains(&offset) {
                return Err(format!(
                    "trigger offset {} out of range [0, 1): {}",
                    i, offset
                ));
            }
        }
        if !(self.tuning_a4 > 0.0) {
            return Err(format!("tuning A4 must be positive, got {}", self.tuning_a4));
        }
        Ok(())
    }
}
