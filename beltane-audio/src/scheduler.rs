//! Lookahead cycle scheduler.
//!
//! Bridges the coarse control-rate polling loop to the server's precise
//! clock: each poll schedules every cycle whose start time falls inside
//! `now + lookahead`, stamping events with absolute times the server
//! realizes sample-accurately. The scheduling cursor is the single source
//! of truth for what has already been dispatched — polls can arrive
//! early, late, or not at all without a cycle ever being skipped or
//! compressed.

use beltane_types::{EngineSettings, SequencerState, VoiceId};

use crate::engine::AudioEngine;
use crate::snapshot::SequencerSnapshot;

/// Gap between start() and the first cycle, so the first events are
/// never stamped in the past.
pub const START_EPSILON_SECS: f64 = 0.06;

pub struct CycleScheduler {
    sequencer: SequencerState,
    cycle_duration_secs: f64,
    lookahead_secs: f64,
    trigger_offsets: [f64; 3],
    /// Start time of the next unscheduled cycle, on the engine clock.
    next_cycle_time: Option<f64>,
    running: bool,
}

impl CycleScheduler {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            sequencer: SequencerState::new(settings.tuning_a4),
            cycle_duration_secs: settings.cycle_duration_secs(),
            lookahead_secs: settings.lookahead_secs,
            trigger_offsets: settings.trigger_offsets,
            next_cycle_time: None,
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn sequencer(&self) -> &SequencerState {
        &self.sequencer
    }

    /// Reset the pattern and begin scheduling. Returns false (and stays
    /// stopped) when the engine clock is unavailable.
    pub fn start(&mut self, engine: &AudioEngine) -> bool {
        let Some(now) = engine.now_secs() else {
            return false;
        };
        self.sequencer.init();
        self.next_cycle_time = Some(now + START_EPSILON_SECS);
        self.running = true;
        true
    }

    /// Stop scheduling. Idempotent; already-dispatched events are the
    /// server's business.
    pub fn stop(&mut self) {
        self.running = false;
        self.next_cycle_time = None;
    }

    /// Tempo changes apply to cycles not yet scheduled; the cursor and
    /// everything already dispatched keep their times.
    pub fn set_bpm(&mut self, bpm: f32) {
        if bpm > 0.0 {
            self.cycle_duration_secs = (60.0 / bpm as f64) * 4.0;
        } else {
            log::warn!(target: "sched", "ignoring non-positive bpm {}", bpm);
        }
    }

    pub fn set_trigger_offsets(&mut self, offsets: [f64; 3]) {
        if offsets.iter().all(|o| (0.0..1.0).contains(o)) {
            self.trigger_offsets = offsets;
        } else {
            log::warn!(target: "sched", "ignoring out-of-range trigger offsets {:?}", offsets);
        }
    }

    /// Skip ahead to the next root block. The owning thread serializes
    /// this against in-flight polls.
    pub fn nudge_root(&mut self) {
        self.sequencer.nudge_root();
    }

    /// Schedule every cycle whose start falls inside the lookahead
    /// horizon. Returns the post-tick snapshot of each scheduled cycle.
    /// A no-op while stopped or while the engine clock is unavailable —
    /// the cursor is left untouched so the next successful poll catches
    /// up with correct absolute times.
    pub fn poll_once(&mut self, engine: &mut AudioEngine) -> Vec<SequencerSnapshot> {
        let mut completed = Vec::new();
        if !self.running {
            return completed;
        }
        let Some(now) = engine.now_secs() else {
            return completed;
        };
        let Some(mut cursor) = self.next_cycle_time else {
            return completed;
        };

        let horizon = now + self.lookahead_secs;
        while cursor < horizon {
            completed.push(self.schedule_cycle(cursor, engine));
            cursor += self.cycle_duration_secs;
        }
        self.next_cycle_time = Some(cursor);

        completed
    }

    /// Tick the sequencer once (its only call site) and dispatch this
    /// cycle's events. Drones land on the cycle start; followers are
    /// staggered by their fractional offsets.
    fn schedule_cycle(&mut self, cycle_start: f64, engine: &mut AudioEngine) -> SequencerSnapshot {
        self.sequencer.tick();

        for id in VoiceId::DRONES {
            let voice = *self.sequencer.voice(id);
            if voice.gate {
                // A rising edge retriggers; a held gate only retunes.
                if let Err(e) = engine.note_on(id, voice.freq, cycle_start, !voice.prev_gate) {
                    log::warn!(target: "sched", "{} note on failed: {}", id.label(), e);
                }
            } else if voice.prev_gate {
                if let Err(e) = engine.note_off(id, cycle_start) {
                    log::warn!(target: "sched", "{} note off failed: {}", id.label(), e);
                }
            }
        }

        for (slot, id) in VoiceId::FOLLOWERS.into_iter().enumerate() {
            let voice = *self.sequencer.voice(id);
            if !voice.gate {
                continue;
            }
            let at = cycle_start + self.trigger_offsets[slot] * self.cycle_duration_secs;
            if let Err(e) = engine.note_on(id, voice.freq, at, true) {
                log::warn!(target: "sched", "{} trigger failed: {}", id.label(), e);
            }
        }

        self.sequencer.clone()
    }
}
