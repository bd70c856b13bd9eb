//! # beltane-audio
//!
//! The real-time side of beltane: a dedicated audio thread polls a
//! lookahead cycle scheduler at control rate and dispatches timestamped
//! note events to an external SuperCollider server over OSC. The server's
//! sample-accurate clock realizes the events; this crate only has to stay
//! ahead of it.

pub mod audio_thread;
pub mod commands;
pub mod engine;
pub mod handle;
pub mod scheduler;
pub mod snapshot;
pub mod telemetry;

pub use commands::{AudioCmd, AudioFeedback};
pub use engine::{AudioEngine, ServerStatus};
pub use handle::{AudioHandle, AudioReadState};
pub use scheduler::CycleScheduler;
pub use snapshot::SequencerSnapshot;
