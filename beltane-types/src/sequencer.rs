//! Six-voice generative sequencer state machine.
//!
//! One `tick()` per musical cycle derives six interdependent voices from
//! the cycle counter alone: three drones on interlocking modulo periods
//! and three followers coupled to the drones' recent history. The machine
//! is fully deterministic — there is no randomness anywhere, the pattern
//! evolves from the counter and a handful of frozen registers.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::music::{
    degree_to_midi, midi_to_freq, midi_to_note_info, CIRCLE_OF_FIFTHS, NOTE_NAMES,
};
use crate::voice::{Voice, VoiceId};

/// Cycles per root; the root walks the circle of fifths every 12 cycles.
pub const CYCLES_PER_ROOT: u64 = 12;

/// V5 folds down an octave at or above this pitch.
const V5_MIDI_CEILING: i32 = 72;

/// V6 folds down an octave at or above this pitch.
const V6_MIDI_CEILING: i32 = 84;

/// The generative pattern state. Constructed once, `init()`-ed, then
/// ticked once per cycle for the lifetime of a playback session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencerState {
    /// Monotonic cycle counter; the sole driver of all pattern logic.
    pub cycle: u64,
    pub voices: [Voice; 6],

    /// Frozen degree registers: these change only on the owning voice's
    /// gate-on edge, not every cycle.
    frozen_v2_degree: i32,
    frozen_v4_degree: i32,
    frozen_v6_degree: i32,
    /// V4's degree as it stood before V4's update this tick; V6 copies
    /// this on its own gate, giving a one-cycle echo of V4.
    prev_v4_degree_for_echo: i32,

    /// V5's last two walk steps, newest first. V2 mirrors the direction.
    v5_history: [i32; 2],
    /// Cycle of the most recent V2 trigger; gates V4's coupling window.
    last_v2_trigger_cycle: Option<u64>,

    /// Root pitch class applied on the last tick.
    pub root_pc: i32,
    /// Circle-of-fifths index applied on the last tick.
    pub root_cycle_index: usize,

    tuning_a4: f64,
}

impl Default for SequencerState {
    fn default() -> Self {
        Self::new(440.0)
    }
}

impl SequencerState {
    pub fn new(tuning_a4: f64) -> Self {
        let mut state = Self {
            cycle: 0,
            voices: [Voice::default(); 6],
            frozen_v2_degree: 4,
            frozen_v4_degree: 5,
            frozen_v6_degree: 3,
            prev_v4_degree_for_echo: 5,
            v5_history: [0, 0],
            last_v2_trigger_cycle: None,
            root_pc: 0,
            root_cycle_index: 0,
            tuning_a4,
        };
        state.init();
        state
    }

    /// Reset every counter and register to its cycle-0 default.
    pub fn init(&mut self) {
        self.cycle = 0;
        self.frozen_v2_degree = 4;
        self.frozen_v4_degree = 5;
        self.frozen_v6_degree = 3;
        self.prev_v4_degree_for_echo = 5;
        self.v5_history = [0, 0];
        self.last_v2_trigger_cycle = None;
        self.root_pc = 0;
        self.root_cycle_index = 0;

        for voice in &mut self.voices {
            voice.gate = false;
            voice.prev_gate = false;
            voice.active = false;
            voice.degree = 0;
            voice.octave = 3;
        }

        self.voices[0].midi_note = degree_to_midi(0, 0, 3, None);
        self.voices[1].midi_note = degree_to_midi(0, 4, 3, Some(4));
        self.voices[2].midi_note = degree_to_midi(0, 2, 3, None);
        self.voices[3].midi_note = degree_to_midi(0, 5, 3, Some(4));
        self.voices[4].midi_note = degree_to_midi(0, 0, 4, None);
        self.voices[5].midi_note = degree_to_midi(0, 3, 4, Some(4));

        for voice in &mut self.voices {
            voice.freq = midi_to_freq(voice.midi_note, self.tuning_a4);
            let (note_index, final_octave) = midi_to_note_info(voice.midi_note);
            voice.note_index = note_index;
            voice.final_octave = final_octave;
        }
    }

    pub fn voice(&self, id: VoiceId) -> &Voice {
        &self.voices[id.index()]
    }

    /// Circle-of-fifths index for the current value of `cycle`.
    pub fn current_root_index(&self) -> usize {
        ((self.cycle / CYCLES_PER_ROOT) % 12) as usize
    }

    /// Root pitch class for the current value of `cycle`.
    pub fn current_root_pc(&self) -> i32 {
        CIRCLE_OF_FIFTHS[self.current_root_index()]
    }

    /// Name of the root applied on the last tick.
    pub fn root_name(&self) -> &'static str {
        NOTE_NAMES[self.root_pc.rem_euclid(12) as usize]
    }

    /// Advance the pattern by one cycle. All derivations use the
    /// pre-increment value of `cycle`; the counter advances at the end.
    pub fn tick(&mut self) {
        let cycle = self.cycle;

        for voice in &mut self.voices {
            voice.prev_gate = voice.gate;
        }

        self.root_cycle_index = ((cycle / CYCLES_PER_ROOT) % 12) as usize;
        self.root_pc = CIRCLE_OF_FIFTHS[self.root_cycle_index];
        let root = self.root_pc;

        // Gate phase. Every rule reads only previous-cycle gates, so the
        // whole array is computed first and committed at once.
        let mut gates = [false; 6];
        gates[0] = cycle % 12 < 10;
        gates[2] = cycle % 7 < 5;
        gates[4] = cycle % 5 < 4;

        if cycle % 3 == 0 && self.voices[4].prev_gate {
            gates[1] = true;
            self.last_v2_trigger_cycle = Some(cycle);
        }

        let v2_recent = self
            .last_v2_trigger_cycle
            .is_some_and(|trigger| cycle - trigger <= 2);
        if cycle % 5 == 0 && v2_recent {
            gates[3] = true;
        }

        gates[5] = cycle % 4 == 0;

        for (voice, gate) in self.voices.iter_mut().zip(gates) {
            voice.gate = gate;
        }

        // Pitch phase.

        // V1: root drone.
        let v1 = &mut self.voices[0];
        v1.degree = 0;
        v1.octave = 3;
        v1.midi_note = degree_to_midi(root, 0, 3, None);
        v1.freq = midi_to_freq(v1.midi_note, self.tuning_a4);

        // V3: third drone.
        let v3 = &mut self.voices[2];
        v3.degree = 2;
        v3.octave = 3;
        v3.midi_note = degree_to_midi(root, 2, 3, None);
        v3.freq = midi_to_freq(v3.midi_note, self.tuning_a4);

        // V5: steady seven-step walk, lifted an octave while V3 sounds.
        let v5_step = ((cycle / 3) % 7) as i32;
        let v5_octave = if gates[2] { 4 } else { 3 };
        let v5 = &mut self.voices[4];
        v5.degree = v5_step;
        v5.octave = v5_octave;
        v5.midi_note = degree_to_midi(root, v5_step, v5_octave, Some(3));
        if v5.midi_note >= V5_MIDI_CEILING {
            v5.midi_note -= 12;
        }
        v5.freq = midi_to_freq(v5.midi_note, self.tuning_a4);

        let prev_v5 = self.v5_history[0];
        self.v5_history[1] = prev_v5;
        self.v5_history[0] = v5_step;

        // V2: moves opposite to V5's direction, only at trigger moments.
        if gates[1] {
            self.frozen_v2_degree += match v5_step.cmp(&prev_v5) {
                Ordering::Greater => -1,
                Ordering::Less => 1,
                Ordering::Equal => 0,
            };
        }
        let v2 = &mut self.voices[1];
        v2.degree = self.frozen_v2_degree;
        v2.octave = 3;
        v2.midi_note = degree_to_midi(root, self.frozen_v2_degree, 3, Some(4));
        v2.freq = midi_to_freq(v2.midi_note, self.tuning_a4);

        // Capture V4's degree before this tick's update; V6 echoes it.
        self.prev_v4_degree_for_echo = self.frozen_v4_degree;

        // V4: step chosen by the joint previous-gate state of V3 and V2.
        if gates[3] {
            let v3_was_on = self.voices[2].prev_gate;
            let v2_was_on = self.voices[1].prev_gate;
            self.frozen_v4_degree += match (v3_was_on, v2_was_on) {
                (true, true) => 1,
                (true, false) => -2,
                (false, true) => 0,
                (false, false) => 3,
            };
        }
        let v4 = &mut self.voices[3];
        v4.degree = self.frozen_v4_degree;
        v4.octave = 3;
        v4.midi_note = degree_to_midi(root, self.frozen_v4_degree, 3, Some(4));
        v4.freq = midi_to_freq(v4.midi_note, self.tuning_a4);

        // V6: one-cycle echo of V4; octave drops while V1 was sounding.
        if gates[5] {
            self.frozen_v6_degree = self.prev_v4_degree_for_echo;
        }
        let v6_octave = if self.voices[0].prev_gate { 4 } else { 5 };
        let v6 = &mut self.voices[5];
        v6.degree = self.frozen_v6_degree;
        v6.octave = v6_octave;
        v6.midi_note = degree_to_midi(root, self.frozen_v6_degree, v6_octave, Some(4));
        if v6.midi_note >= V6_MIDI_CEILING {
            v6.midi_note -= 12;
        }
        v6.freq = midi_to_freq(v6.midi_note, self.tuning_a4);

        for voice in &mut self.voices {
            let (note_index, final_octave) = midi_to_note_info(voice.midi_note);
            voice.note_index = note_index;
            voice.final_octave = final_octave;
            voice.active = voice.gate;
        }

        self.cycle += 1;
    }

    /// Jump to the start of the next 12-cycle root block. Frozen degree
    /// registers keep their values; this is a skip ahead, not a reset.
    pub fn nudge_root(&mut self) {
        self.cycle = (self.cycle / CYCLES_PER_ROOT + 1) * CYCLES_PER_ROOT;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticked(n: usize) -> SequencerState {
        let mut seq = SequencerState::default();
        for _ in 0..n {
            seq.tick();
        }
        seq
    }

    #[test]
    fn tick_is_deterministic() {
        let a = ticked(500);
        let b = ticked(500);
        assert_eq!(a, b);
    }

    #[test]
    fn v1_gate_pattern_over_first_root_block() {
        let mut seq = SequencerState::default();
        for cycle in 0..12u64 {
            seq.tick();
            let expected = cycle % 12 < 10;
            assert_eq!(
                seq.voices[0].gate, expected,
                "V1 gate at cycle {} should be {}",
                cycle, expected
            );
        }
    }

    #[test]
    fn root_advances_after_twelve_ticks() {
        let seq = ticked(12);
        assert_eq!(seq.current_root_index(), 1);
        assert_eq!(seq.current_root_pc(), 7); // G
        // The last applied root still belongs to cycle 11.
        assert_eq!(seq.root_cycle_index, 0);
        // One more tick applies the new root.
        let seq = ticked(13);
        assert_eq!(seq.root_cycle_index, 1);
        assert_eq!(seq.root_pc, 7);
    }

    #[test]
    fn root_pattern_has_period_144() {
        let mut seq = SequencerState::default();
        let mut roots = Vec::new();
        for _ in 0..288 {
            seq.tick();
            roots.push(seq.root_pc);
        }
        for c in 0..144 {
            assert_eq!(roots[c], roots[c + 144], "root at cycle {} repeats", c);
        }
    }

    #[test]
    fn v2_fires_only_on_coupled_cycles() {
        let mut seq = SequencerState::default();
        let mut v5_prev_gate = false;
        for cycle in 0..200u64 {
            let expected = cycle % 3 == 0 && v5_prev_gate;
            seq.tick();
            assert_eq!(
                seq.voices[1].gate, expected,
                "V2 gate at cycle {} (V5 prev gate {})",
                cycle, v5_prev_gate
            );
            v5_prev_gate = seq.voices[4].gate;
        }
    }

    #[test]
    fn v4_requires_recent_v2_trigger() {
        let mut seq = SequencerState::default();
        let mut last_v2: Option<u64> = None;
        for cycle in 0..200u64 {
            seq.tick();
            if seq.voices[1].gate {
                last_v2 = Some(cycle);
            }
            let expected =
                cycle % 5 == 0 && last_v2.is_some_and(|trigger| cycle - trigger <= 2);
            assert_eq!(seq.voices[3].gate, expected, "V4 gate at cycle {}", cycle);
        }
    }

    #[test]
    fn v4_degree_frozen_between_gate_edges() {
        let mut seq = SequencerState::default();
        let mut held: Option<i32> = None;
        for _ in 0..300 {
            seq.tick();
            if seq.voices[3].gate {
                held = Some(seq.voices[3].degree);
            } else if let Some(degree) = held {
                assert_eq!(
                    seq.voices[3].degree, degree,
                    "V4 degree changed without a gate at cycle {}",
                    seq.cycle - 1
                );
            }
        }
    }

    #[test]
    fn v5_walks_seven_steps() {
        let mut seq = SequencerState::default();
        for cycle in 0..100u64 {
            seq.tick();
            assert_eq!(seq.voices[4].degree, ((cycle / 3) % 7) as i32);
        }
    }

    #[test]
    fn v5_stays_below_ceiling() {
        let mut seq = SequencerState::default();
        for _ in 0..500 {
            seq.tick();
            assert!(seq.voices[4].midi_note < 72);
            assert!(seq.voices[5].midi_note < 84);
        }
    }

    #[test]
    fn v6_echoes_v4_previous_degree() {
        let mut seq = SequencerState::default();
        seq.tick();
        let mut prev_v4_degree = seq.voices[3].degree;
        for _ in 0..300 {
            let before_tick_v4 = prev_v4_degree;
            seq.tick();
            if seq.voices[5].gate {
                assert_eq!(
                    seq.voices[5].degree, before_tick_v4,
                    "V6 should copy V4's pre-update degree at cycle {}",
                    seq.cycle - 1
                );
            }
            prev_v4_degree = seq.voices[3].degree;
        }
    }

    #[test]
    fn nudge_root_keeps_frozen_registers() {
        let mut seq = ticked(5);
        let v2_degree = seq.voices[1].degree;
        seq.nudge_root();
        assert_eq!(seq.cycle, 12);
        assert_eq!(seq.current_root_index(), 1);
        seq.tick();
        // V2 does not fire on this tick (V5 was ungated on cycle 4), so
        // its frozen degree must be exactly what it was before the nudge.
        assert!(!seq.voices[1].gate);
        assert_eq!(seq.voices[1].degree, v2_degree);
    }

    #[test]
    fn nudge_root_on_boundary_still_advances() {
        let mut seq = ticked(12);
        assert_eq!(seq.cycle, 12);
        seq.nudge_root();
        assert_eq!(seq.cycle, 24);
    }

    #[test]
    fn init_restores_cycle_zero_defaults() {
        let mut seq = ticked(100);
        seq.init();
        assert_eq!(seq.cycle, 0);
        assert_eq!(seq.root_pc, 0);
        let fresh = SequencerState::default();
        assert_eq!(seq, fresh);
    }

    #[test]
    fn initial_pitches_match_layout() {
        let seq = SequencerState::default();
        assert_eq!(seq.voices[0].midi_note, 36); // root, octave 3
        assert_eq!(seq.voices[2].midi_note, 40); // third, octave 3
        assert_eq!(seq.voices[4].midi_note, 48); // root, octave 4
    }

    #[test]
    fn gates_never_read_current_tick_siblings() {
        // Constructed check of the coupling rule: on cycle 3, V2 depends
        // on V5's gate from cycle 2 (on), not V5's freshly computed gate.
        let mut seq = SequencerState::default();
        for _ in 0..3 {
            seq.tick();
        }
        // cycle 3: 3 % 3 == 0 and V5 was gated on cycle 2 (2 % 5 < 4).
        seq.tick();
        assert!(seq.voices[1].gate);
    }
}
