//! Command and feedback types for the audio thread abstraction.
//!
//! The handle serializes commands through channels to the dedicated
//! audio thread and consumes feedback updates each frame. Time-critical
//! transport commands ride a priority channel so a backlog of lifecycle
//! commands can never delay them.

use std::sync::mpsc::Sender;

use crate::engine::ServerStatus;
use crate::snapshot::SequencerSnapshot;

/// Commands sent from the main thread to the audio thread.
#[derive(Debug)]
pub enum AudioCmd {
    // ── Server lifecycle ──────────────────────────────────────────
    Connect {
        server_addr: String,
        reply: Sender<Result<(), String>>,
    },
    Disconnect,

    // ── Transport ─────────────────────────────────────────────────
    SetPlaying {
        playing: bool,
    },
    SetBpm {
        bpm: f32,
    },
    /// Skip ahead to the next root block.
    NudgeRoot,
    SetTriggerOffsets {
        offsets: [f64; 3],
    },

    Shutdown,
}

impl AudioCmd {
    /// Transport commands are time-critical and ride the priority channel.
    pub fn is_priority(&self) -> bool {
        matches!(
            self,
            AudioCmd::SetPlaying { .. } | AudioCmd::SetBpm { .. } | AudioCmd::NudgeRoot
        )
    }
}

/// Feedback sent from the audio thread back to the main thread.
#[derive(Debug, Clone)]
pub enum AudioFeedback {
    /// One completed cycle's post-tick state, for display only.
    CycleCompleted(SequencerSnapshot),
    PlayingChanged(bool),
    BpmUpdate(f32),
    ServerStatus {
        status: ServerStatus,
        message: String,
    },
    /// Once-per-second polling loop health summary.
    TelemetrySummary {
        avg_poll_us: u32,
        max_poll_us: u32,
        p95_poll_us: u32,
        overruns: u64,
        cycles_scheduled: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_commands_are_priority() {
        assert!(AudioCmd::SetPlaying { playing: true }.is_priority());
        assert!(AudioCmd::SetBpm { bpm: 50.0 }.is_priority());
        assert!(AudioCmd::NudgeRoot.is_priority());
    }

    #[test]
    fn lifecycle_commands_are_normal() {
        assert!(!AudioCmd::Disconnect.is_priority());
        assert!(!AudioCmd::Shutdown.is_priority());
        assert!(!AudioCmd::SetTriggerOffsets {
            offsets: [0.4, 0.1, 0.0]
        }
        .is_priority());
    }
}
