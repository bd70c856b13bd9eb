use serde::{Deserialize, Serialize};

/// The six fixed voices of the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoiceId {
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
}

impl VoiceId {
    pub const ALL: [VoiceId; 6] = [
        VoiceId::V1,
        VoiceId::V2,
        VoiceId::V3,
        VoiceId::V4,
        VoiceId::V5,
        VoiceId::V6,
    ];

    /// The drone voices, in dispatch order.
    pub const DRONES: [VoiceId; 3] = [VoiceId::V1, VoiceId::V3, VoiceId::V5];

    /// The follower voices, in dispatch order.
    pub const FOLLOWERS: [VoiceId; 3] = [VoiceId::V2, VoiceId::V4, VoiceId::V6];

    pub fn index(self) -> usize {
        match self {
            VoiceId::V1 => 0,
            VoiceId::V2 => 1,
            VoiceId::V3 => 2,
            VoiceId::V4 => 3,
            VoiceId::V5 => 4,
            VoiceId::V6 => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VoiceId::V1 => "V1",
            VoiceId::V2 => "V2",
            VoiceId::V3 => "V3",
            VoiceId::V4 => "V4",
            VoiceId::V5 => "V5",
            VoiceId::V6 => "V6",
        }
    }

    pub fn role(self) -> VoiceRole {
        match self {
            VoiceId::V1 | VoiceId::V3 | VoiceId::V5 => VoiceRole::Drone,
            VoiceId::V2 | VoiceId::V4 | VoiceId::V6 => VoiceRole::Follower,
        }
    }
}

/// Voice role: drones sustain across gated cycles, followers fire a fresh
/// trigger on every gated cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoiceRole {
    Drone,
    Follower,
}

impl VoiceRole {
    pub fn name(&self) -> &'static str {
        match self {
            VoiceRole::Drone => "drone",
            VoiceRole::Follower => "follower",
        }
    }
}

/// One voice's state for the current cycle. Mutated in place by the
/// sequencer; never constructed per-cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    /// Scale-degree offset from the root (may be negative).
    pub degree: i32,
    /// Base octave used for pitch derivation this cycle.
    pub octave: i32,
    /// Absolute MIDI note number after all guards.
    pub midi_note: i32,
    /// Equal-temperament frequency of `midi_note`.
    pub freq: f64,
    /// Whether the voice sounds this cycle.
    pub gate: bool,
    /// The previous cycle's gate; the edge between the two drives
    /// note-on/note-off dispatch.
    pub prev_gate: bool,
    /// Display copy of `gate`.
    pub active: bool,
    /// Pitch class 0..11 of `midi_note`.
    pub note_index: i32,
    /// Octave of `midi_note`.
    pub final_octave: i32,
}

impl Default for Voice {
    fn default() -> Self {
        Self {
            degree: 0,
            octave: 3,
            midi_note: 0,
            freq: 0.0,
            gate: false,
            prev_gate: false,
            active: false,
            note_index: 0,
            final_octave: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_ids_index_in_order() {
        for (i, id) in VoiceId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn drones_and_followers_partition_the_voices() {
        for id in VoiceId::DRONES {
            assert_eq!(id.role(), VoiceRole::Drone);
        }
        for id in VoiceId::FOLLOWERS {
            assert_eq!(id.role(), VoiceRole::Follower);
        }
        assert_eq!(VoiceId::DRONES.len() + VoiceId::FOLLOWERS.len(), VoiceId::ALL.len());
    }

    #[test]
    fn labels_unique() {
        let labels: std::collections::HashSet<&str> =
            VoiceId::ALL.iter().map(|v| v.label()).collect();
        assert_eq!(labels.len(), 6);
    }
}
