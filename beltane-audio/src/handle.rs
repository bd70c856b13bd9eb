//! AudioHandle: main-thread interface to the audio subsystem.
//!
//! Owns the command/feedback channel endpoints. The engine, scheduler,
//! and sequencer live on the audio thread; the handle folds feedback
//! into a read-state the front end can display.

use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender as CrossbeamSender;

use beltane_types::EngineSettings;

use crate::audio_thread::AudioThread;
use crate::commands::{AudioCmd, AudioFeedback};
use crate::engine::ServerStatus;
use crate::snapshot::SequencerSnapshot;

/// Audio-owned read state: values the audio thread is the authority on.
/// The front end reads these for display; feedback updates them.
#[derive(Debug, Clone)]
pub struct AudioReadState {
    pub playing: bool,
    pub bpm: f32,
    pub cycle: u64,
    pub root_name: &'static str,
    pub server_status: ServerStatus,
    pub last_cycle: Option<SequencerSnapshot>,
}

impl Default for AudioReadState {
    fn default() -> Self {
        Self {
            playing: false,
            bpm: beltane_types::settings::DEFAULT_BPM,
            cycle: 0,
            root_name: "C",
            server_status: ServerStatus::Stopped,
            last_cycle: None,
        }
    }
}

/// Main-thread handle to the audio subsystem. Commands route to a
/// priority or normal channel; the audio thread always drains priority
/// first.
pub struct AudioHandle {
    priority_tx: CrossbeamSender<AudioCmd>,
    normal_tx: CrossbeamSender<AudioCmd>,
    feedback_rx: Receiver<AudioFeedback>,
    audio_state: AudioReadState,
    join_handle: Option<JoinHandle<()>>,
}

impl AudioHandle {
    pub fn new() -> Self {
        Self::with_settings(EngineSettings::default())
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        let (priority_tx, priority_rx) = crossbeam_channel::unbounded();
        let (normal_tx, normal_rx) = crossbeam_channel::unbounded();
        let (feedback_tx, feedback_rx) = mpsc::channel();

        let bpm = settings.bpm;
        let join_handle = thread::spawn(move || {
            let thread = AudioThread::new(settings, priority_rx, normal_rx, feedback_tx);
            thread.run();
        });

        let mut audio_state = AudioReadState::default();
        audio_state.bpm = bpm;

        Self {
            priority_tx,
            normal_tx,
            feedback_rx,
            audio_state,
            join_handle: Some(join_handle),
        }
    }

    /// Send a command, routing to the priority or normal channel.
    pub fn send_cmd(&self, cmd: AudioCmd) -> Result<(), String> {
        if cmd.is_priority() {
            self.priority_tx
                .send(cmd)
                .map_err(|_| "audio thread disconnected".to_string())
        } else {
            self.normal_tx
                .send(cmd)
                .map_err(|_| "audio thread disconnected".to_string())
        }
    }

    /// Fire-and-forget: send a command and log if the thread is gone.
    fn send(&self, cmd: AudioCmd) {
        if let Err(e) = self.send_cmd(cmd) {
            log::warn!(target: "audio", "command dropped: {}", e);
        }
    }

    /// Drain pending feedback, folding it into the read state. Returns
    /// the drained messages for the front end to act on.
    pub fn drain_feedback(&mut self) -> Vec<AudioFeedback> {
        let mut out = Vec::new();
        while let Ok(msg) = self.feedback_rx.try_recv() {
            self.apply_feedback(&msg);
            out.push(msg);
        }
        out
    }

    fn apply_feedback(&mut self, feedback: &AudioFeedback) {
        match feedback {
            AudioFeedback::CycleCompleted(snapshot) => {
                self.audio_state.cycle = snapshot.cycle;
                self.audio_state.root_name = snapshot.root_name();
                self.audio_state.last_cycle = Some(snapshot.clone());
            }
            AudioFeedback::PlayingChanged(playing) => {
                self.audio_state.playing = *playing;
            }
            AudioFeedback::BpmUpdate(bpm) => {
                self.audio_state.bpm = *bpm;
            }
            AudioFeedback::ServerStatus { status, .. } => {
                self.audio_state.server_status = *status;
            }
            AudioFeedback::TelemetrySummary { .. } => {}
        }
    }

    pub fn read_state(&self) -> &AudioReadState {
        &self.audio_state
    }

    pub fn is_playing(&self) -> bool {
        self.audio_state.playing
    }

    pub fn status(&self) -> ServerStatus {
        self.audio_state.server_status
    }

    // ── Server lifecycle ──────────────────────────────────────────

    /// Connect synchronously, waiting for the audio thread's reply.
    pub fn connect(&mut self, server_addr: &str) -> Result<(), String> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.send_cmd(AudioCmd::Connect {
            server_addr: server_addr.to_string(),
            reply: reply_tx,
        })?;
        match reply_rx.recv() {
            Ok(result) => {
                if result.is_ok() {
                    self.audio_state.server_status = ServerStatus::Connected;
                }
                result
            }
            Err(_) => Err("audio thread disconnected".to_string()),
        }
    }

    pub fn disconnect(&mut self) {
        self.send(AudioCmd::Disconnect);
        self.audio_state.server_status = ServerStatus::Stopped;
        self.audio_state.playing = false;
    }

    // ── Transport ─────────────────────────────────────────────────

    pub fn set_playing(&mut self, playing: bool) {
        self.send(AudioCmd::SetPlaying { playing });
    }

    pub fn set_bpm(&mut self, bpm: f32) {
        self.send(AudioCmd::SetBpm { bpm });
    }

    /// Manual control: skip to the next root block. Safe to call at any
    /// time; the audio thread serializes it against in-flight polls.
    pub fn nudge_root(&mut self) {
        self.send(AudioCmd::NudgeRoot);
    }

    pub fn set_trigger_offsets(&mut self, offsets: [f64; 3]) {
        self.send(AudioCmd::SetTriggerOffsets { offsets });
    }
}

impl Drop for AudioHandle {
    fn drop(&mut self) {
        let _ = self.send_cmd(AudioCmd::Shutdown);
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Default for AudioHandle {
    fn default() -> Self {
        Self::new()
    }
}
