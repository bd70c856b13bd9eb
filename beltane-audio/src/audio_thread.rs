//! The dedicated audio thread: a control-rate loop that drains commands,
//! polls the cycle scheduler, and emits feedback.
//!
//! The thread exclusively owns the engine, the scheduler, and the
//! sequencer inside it, so commands like NudgeRoot are serialized against
//! in-flight polls by construction — there is no lock to get wrong.

use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};

use beltane_types::EngineSettings;

use crate::commands::{AudioCmd, AudioFeedback};
use crate::engine::AudioEngine;
use crate::scheduler::CycleScheduler;
use crate::telemetry::PollTelemetry;

/// Most commands handled per drain pass; keeps one burst of commands
/// from starving the poll.
const MAX_DRAIN: usize = 32;

pub(crate) struct AudioThread {
    engine: AudioEngine,
    scheduler: CycleScheduler,
    /// Priority commands: transport and nudge (time-critical).
    priority_rx: Receiver<AudioCmd>,
    /// Normal commands: server lifecycle, configuration.
    normal_rx: Receiver<AudioCmd>,
    feedback_tx: Sender<AudioFeedback>,
    telemetry: PollTelemetry,
    tick_interval: Duration,
    last_poll: Instant,
    last_telemetry_emit: Instant,
}

impl AudioThread {
    pub(crate) fn new(
        settings: EngineSettings,
        priority_rx: Receiver<AudioCmd>,
        normal_rx: Receiver<AudioCmd>,
        feedback_tx: Sender<AudioFeedback>,
    ) -> Self {
        Self {
            engine: AudioEngine::new(),
            scheduler: CycleScheduler::new(&settings),
            priority_rx,
            normal_rx,
            feedback_tx,
            telemetry: PollTelemetry::new(),
            tick_interval: Duration::from_millis(settings.tick_interval_ms),
            last_poll: Instant::now(),
            last_telemetry_emit: Instant::now(),
        }
    }

    pub(crate) fn run(mut self) {
        loop {
            let remaining = self.tick_interval.saturating_sub(self.last_poll.elapsed());

            crossbeam_channel::select! {
                recv(self.priority_rx) -> result => {
                    match result {
                        Ok(cmd) => {
                            if self.handle_cmd(cmd) {
                                break;
                            }
                        }
                        Err(_) => break, // Disconnected
                    }
                }
                recv(self.normal_rx) -> result => {
                    match result {
                        Ok(cmd) => {
                            if self.handle_cmd(cmd) {
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                }
                default(remaining) => {}
            }

            // Priority commands drain fully before the poll runs.
            if self.drain(true) || self.drain(false) {
                break;
            }

            if self.last_poll.elapsed() >= self.tick_interval {
                self.last_poll = Instant::now();

                let poll_start = Instant::now();
                let completed = self.scheduler.poll_once(&mut self.engine);
                let cycles = completed.len();
                for snapshot in completed {
                    let _ = self.feedback_tx.send(AudioFeedback::CycleCompleted(snapshot));
                }
                self.telemetry.record(
                    poll_start.elapsed(),
                    self.tick_interval.as_micros() as u32,
                    cycles,
                );
            }

            if self.last_telemetry_emit.elapsed() >= Duration::from_secs(1) {
                self.last_telemetry_emit = Instant::now();
                let (avg_poll_us, max_poll_us, p95_poll_us, overruns, cycles_scheduled) =
                    self.telemetry.take_summary();
                let _ = self.feedback_tx.send(AudioFeedback::TelemetrySummary {
                    avg_poll_us,
                    max_poll_us,
                    p95_poll_us,
                    overruns,
                    cycles_scheduled,
                });
            }
        }
    }

    /// Drain one channel without blocking. Returns true on shutdown.
    fn drain(&mut self, priority: bool) -> bool {
        for _ in 0..MAX_DRAIN {
            let rx = if priority {
                &self.priority_rx
            } else {
                &self.normal_rx
            };
            match rx.try_recv() {
                Ok(cmd) => {
                    if self.handle_cmd(cmd) {
                        return true;
                    }
                }
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => return true,
            }
        }
        false
    }

    /// Handle one command. Returns true on shutdown.
    fn handle_cmd(&mut self, cmd: AudioCmd) -> bool {
        match cmd {
            AudioCmd::Connect { server_addr, reply } => {
                let result = self.engine.connect(&server_addr);
                let message = match &result {
                    Ok(()) => format!("connected to {}", server_addr),
                    Err(e) => e.clone(),
                };
                self.send_status(message);
                let _ = reply.send(result);
            }
            AudioCmd::Disconnect => {
                self.scheduler.stop();
                self.engine.disconnect();
                self.send_status("disconnected");
                let _ = self.feedback_tx.send(AudioFeedback::PlayingChanged(false));
            }
            AudioCmd::SetPlaying { playing } => {
                if playing {
                    let started = self.scheduler.start(&self.engine);
                    if !started {
                        log::warn!(target: "audio", "cannot start: engine clock unavailable");
                        self.send_status("cannot start: not connected");
                    }
                    let _ = self
                        .feedback_tx
                        .send(AudioFeedback::PlayingChanged(started));
                } else {
                    self.scheduler.stop();
                    if let Some(now) = self.engine.now_secs() {
                        self.engine.release_all(now);
                    }
                    let _ = self.feedback_tx.send(AudioFeedback::PlayingChanged(false));
                }
            }
            AudioCmd::SetBpm { bpm } => {
                self.scheduler.set_bpm(bpm);
                let _ = self.feedback_tx.send(AudioFeedback::BpmUpdate(bpm));
            }
            AudioCmd::NudgeRoot => {
                self.scheduler.nudge_root();
            }
            AudioCmd::SetTriggerOffsets { offsets } => {
                self.scheduler.set_trigger_offsets(offsets);
            }
            AudioCmd::Shutdown => {
                self.scheduler.stop();
                if let Some(now) = self.engine.now_secs() {
                    self.engine.release_all(now);
                }
                return true;
            }
        }
        false
    }

    fn send_status(&self, message: impl Into<String>) {
        let _ = self.feedback_tx.send(AudioFeedback::ServerStatus {
            status: self.engine.status(),
            message: message.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn make_thread() -> (AudioThread, mpsc::Receiver<AudioFeedback>) {
        let (_ptx, prx) = crossbeam_channel::unbounded();
        let (_ntx, nrx) = crossbeam_channel::unbounded();
        let (ftx, frx) = mpsc::channel();
        (
            AudioThread::new(EngineSettings::default(), prx, nrx, ftx),
            frx,
        )
    }

    #[test]
    fn set_playing_without_connection_reports_not_playing() {
        let (mut thread, frx) = make_thread();
        thread.handle_cmd(AudioCmd::SetPlaying { playing: true });

        let mut saw_playing_false = false;
        while let Ok(fb) = frx.try_recv() {
            if let AudioFeedback::PlayingChanged(playing) = fb {
                saw_playing_false = !playing;
            }
        }
        assert!(saw_playing_false);
    }

    #[test]
    fn shutdown_command_terminates() {
        let (mut thread, _frx) = make_thread();
        assert!(thread.handle_cmd(AudioCmd::Shutdown));
        assert!(!thread.handle_cmd(AudioCmd::Disconnect));
    }

    #[test]
    fn bpm_command_echoes_feedback() {
        let (mut thread, frx) = make_thread();
        thread.handle_cmd(AudioCmd::SetBpm { bpm: 72.0 });
        let fb = frx.try_recv().expect("feedback expected");
        assert!(matches!(fb, AudioFeedback::BpmUpdate(bpm) if bpm == 72.0));
    }
}
