//! Audio engine: owns the server connection and realizes sequencer events
//! as synth nodes.
//!
//! The scheduler only speaks in edges and timestamps; the per-role
//! retrigger policy lives here. Drones (V1, V3, V5) each hold one
//! sustained node that is retuned in place while the gate is held. The
//! pluck voices (V2, V4) spawn a fresh self-freeing grain per trigger.
//! The pad (V6) retriggers each gated cycle and gets a timed gate-off
//! after its hold period.

pub mod backend;
pub mod clock;

use backend::{AudioBackend, ScBackend};
use beltane_types::{VoiceId, VoiceRole};

/// Synthdef names the server is expected to provide.
pub const DRONE_SYNTHDEF: &str = "beltane_drone";
pub const PLUCK_SYNTHDEF: &str = "beltane_pluck";
pub const PAD_SYNTHDEF: &str = "beltane_pad";

/// How long the pad holds before its scheduled gate-off.
const PAD_HOLD_SECS: f64 = 0.3;

/// First node id handed to voice synths.
const FIRST_NODE_ID: i32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Stopped,
    Connected,
    Error,
}

impl ServerStatus {
    pub fn name(&self) -> &'static str {
        match self {
            ServerStatus::Stopped => "stopped",
            ServerStatus::Connected => "connected",
            ServerStatus::Error => "error",
        }
    }
}

pub struct AudioEngine {
    backend: Option<Box<dyn AudioBackend>>,
    status: ServerStatus,
    next_node_id: i32,
    /// Live sustained node per voice (drones and the pad; plucks are
    /// fire-and-forget).
    voice_nodes: [Option<i32>; 6],
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEngine {
    pub fn new() -> Self {
        Self {
            backend: None,
            status: ServerStatus::Stopped,
            next_node_id: FIRST_NODE_ID,
            voice_nodes: [None; 6],
        }
    }

    pub fn connect(&mut self, server_addr: &str) -> Result<(), String> {
        match ScBackend::connect(server_addr) {
            Ok(backend) => {
                self.install_backend(Box::new(backend));
                Ok(())
            }
            Err(e) => {
                self.status = ServerStatus::Error;
                Err(e)
            }
        }
    }

    /// Install a backend directly (tests, alternative transports).
    pub fn install_backend(&mut self, backend: Box<dyn AudioBackend>) {
        self.backend = Some(backend);
        self.status = ServerStatus::Connected;
    }

    /// Drop the connection. Any nodes still alive are hard-freed first —
    /// without that the server would drone on with no one to gate it off.
    pub fn disconnect(&mut self) {
        if let Some(backend) = self.backend.as_ref() {
            for node_id in self.voice_nodes.iter().flatten() {
                if let Err(e) = backend.free_node(*node_id) {
                    log::warn!(target: "audio", "free of node {} failed: {}", node_id, e);
                }
            }
        }
        self.backend = None;
        self.voice_nodes = [None; 6];
        self.status = ServerStatus::Stopped;
    }

    pub fn is_running(&self) -> bool {
        self.backend.is_some()
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    /// The engine clock, or None when no connected backend provides one.
    pub fn now_secs(&self) -> Option<f64> {
        self.backend.as_ref().and_then(|b| b.now_secs())
    }

    fn alloc_node_id(&mut self) -> i32 {
        let id = self.next_node_id;
        self.next_node_id += 1;
        id
    }

    fn synthdef_for(voice: VoiceId) -> &'static str {
        match voice {
            VoiceId::V6 => PAD_SYNTHDEF,
            v if v.role() == VoiceRole::Drone => DRONE_SYNTHDEF,
            _ => PLUCK_SYNTHDEF,
        }
    }

    /// Start or retune a voice at an absolute engine-clock time.
    /// `retrigger` is true on a rising gate edge and on every follower
    /// trigger; a held drone gate passes false and only retunes.
    pub fn note_on(
        &mut self,
        voice: VoiceId,
        freq: f64,
        at_secs: f64,
        retrigger: bool,
    ) -> Result<(), String> {
        let slot = voice.index();
        match voice.role() {
            VoiceRole::Drone => {
                if let (Some(node_id), false) = (self.voice_nodes[slot], retrigger) {
                    let backend = self.backend.as_ref().ok_or("not connected")?;
                    backend
                        .set_params_at(node_id, &[("freq", freq as f32)], at_secs)
                        .map_err(|e| e.to_string())
                } else {
                    // Rising edge (or explicit retrigger): release any old
                    // node and spawn a fresh one at the event time.
                    if let Some(old) = self.voice_nodes[slot].take() {
                        let backend = self.backend.as_ref().ok_or("not connected")?;
                        backend
                            .set_params_at(old, &[("gate", 0.0)], at_secs)
                            .map_err(|e| e.to_string())?;
                    }
                    let node_id = self.alloc_node_id();
                    let backend = self.backend.as_ref().ok_or("not connected")?;
                    backend
                        .create_synth_at(
                            Self::synthdef_for(voice),
                            node_id,
                            &[
                                ("freq".to_string(), freq as f32),
                                ("gate".to_string(), 1.0),
                            ],
                            at_secs,
                        )
                        .map_err(|e| e.to_string())?;
                    self.voice_nodes[slot] = Some(node_id);
                    Ok(())
                }
            }
            VoiceRole::Follower if voice == VoiceId::V6 => {
                // Pad: choke the previous hold, spawn, schedule gate-off.
                if let Some(old) = self.voice_nodes[slot].take() {
                    let backend = self.backend.as_ref().ok_or("not connected")?;
                    backend
                        .set_params_at(old, &[("gate", 0.0)], at_secs)
                        .map_err(|e| e.to_string())?;
                }
                let node_id = self.alloc_node_id();
                let backend = self.backend.as_ref().ok_or("not connected")?;
                backend
                    .create_synth_at(
                        PAD_SYNTHDEF,
                        node_id,
                        &[
                            ("freq".to_string(), freq as f32),
                            ("gate".to_string(), 1.0),
                        ],
                        at_secs,
                    )
                    .map_err(|e| e.to_string())?;
                backend
                    .set_params_at(node_id, &[("gate", 0.0)], at_secs + PAD_HOLD_SECS)
                    .map_err(|e| e.to_string())?;
                self.voice_nodes[slot] = Some(node_id);
                Ok(())
            }
            VoiceRole::Follower => {
                // Pluck grain: self-freeing, no bookkeeping.
                let node_id = self.alloc_node_id();
                let backend = self.backend.as_ref().ok_or("not connected")?;
                backend
                    .create_synth_at(
                        PLUCK_SYNTHDEF,
                        node_id,
                        &[("freq".to_string(), freq as f32)],
                        at_secs,
                    )
                    .map_err(|e| e.to_string())
            }
        }
    }

    /// Release a voice's sustained node at an absolute engine-clock time.
    /// Synthdefs free themselves when their gate closes, so this only
    /// sends the gate-off and forgets the node.
    pub fn note_off(&mut self, voice: VoiceId, at_secs: f64) -> Result<(), String> {
        let slot = voice.index();
        let Some(node_id) = self.voice_nodes[slot].take() else {
            return Ok(());
        };
        let backend = self.backend.as_ref().ok_or("not connected")?;
        backend
            .set_params_at(node_id, &[("gate", 0.0)], at_secs)
            .map_err(|e| e.to_string())
    }

    /// Gate off everything still sounding.
    pub fn release_all(&mut self, at_secs: f64) {
        for voice in VoiceId::ALL {
            if let Err(e) = self.note_off(voice, at_secs) {
                log::warn!(target: "audio", "release of {} failed: {}", voice.label(), e);
            }
        }
    }
}
