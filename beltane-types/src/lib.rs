//! # beltane-types
//!
//! Shared type definitions for the beltane drone machine: music theory
//! helpers, voice records, the generative sequencer state machine, and
//! validated engine settings. This crate is pure data — no clocks, no
//! threads, no I/O — so everything here is deterministic and testable
//! without an audio server.

pub mod music;
pub mod sequencer;
pub mod settings;
pub mod voice;

pub use music::{degree_to_midi, midi_to_freq, midi_to_note_info, NOTE_NAMES};
pub use sequencer::SequencerState;
pub use settings::EngineSettings;
pub use voice::{Voice, VoiceId, VoiceRole};
