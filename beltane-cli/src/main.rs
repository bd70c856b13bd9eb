mod config;

use std::time::Duration;

use beltane_audio::{AudioFeedback, AudioHandle, SequencerSnapshot};
use beltane_types::{VoiceId, NOTE_NAMES};

use config::Config;

fn init_logging(verbose: bool) {
    use simplelog::{LevelFilter, WriteLogger};

    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("beltane")
        .join("beltane.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::File::create(&log_path).unwrap_or_else(|_| {
        std::fs::File::create("/tmp/beltane.log").expect("Cannot create log file")
    });

    WriteLogger::init(log_level, simplelog::Config::default(), log_file)
        .expect("Failed to initialize logger");

    log::info!("beltane starting (log level: {:?})", log_level);
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn print_cycle(snapshot: &SequencerSnapshot) {
    let voices: Vec<String> = snapshot
        .voices
        .iter()
        .zip(VoiceId::ALL)
        .map(|(voice, id)| {
            if voice.gate {
                format!(
                    "{} {:>2}{}",
                    id.label(),
                    NOTE_NAMES[voice.note_index as usize],
                    voice.final_octave
                )
            } else {
                format!("{}  · ", id.label())
            }
        })
        .collect();
    // The snapshot counter is post-increment; report the cycle it played.
    println!(
        "cycle {:>5}  root {:<2}  {}",
        snapshot.cycle - 1,
        snapshot.root_name(),
        voices.join("  ")
    );
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let config = Config::load();
    let mut settings = match config.engine_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(bpm) = arg_value(&args, "--bpm").and_then(|s| s.parse::<f32>().ok()) {
        settings.bpm = bpm;
    }
    if let Err(e) = settings.validate() {
        eprintln!("invalid configuration: {}", e);
        std::process::exit(1);
    }

    let server_addr = arg_value(&args, "--server")
        .map(|s| s.to_string())
        .unwrap_or_else(|| config.server_addr());
    let cycle_limit: Option<u64> = arg_value(&args, "--cycles").and_then(|s| s.parse().ok());
    let nudge_every: Option<u64> = arg_value(&args, "--nudge-every").and_then(|s| s.parse().ok());

    let mut handle = AudioHandle::with_settings(settings);
    if let Err(e) = handle.connect(&server_addr) {
        eprintln!("could not reach scsynth at {}: {}", server_addr, e);
        std::process::exit(1);
    }

    println!(
        "beltane · {} bpm · lookahead {}ms · {}",
        settings.bpm,
        (settings.lookahead_secs * 1000.0) as u64,
        server_addr
    );
    log::info!(target: "cli", "server {}", handle.status().name());
    handle.set_playing(true);

    let mut completed: u64 = 0;
    loop {
        std::thread::sleep(Duration::from_millis(50));

        for feedback in handle.drain_feedback() {
            match feedback {
                AudioFeedback::CycleCompleted(snapshot) => {
                    completed += 1;
                    print_cycle(&snapshot);
                    if let Some(every) = nudge_every {
                        if every > 0 && completed % every == 0 {
                            handle.nudge_root();
                        }
                    }
                }
                AudioFeedback::ServerStatus { status, message } => {
                    log::info!(target: "cli", "server {}: {}", status.name(), message);
                }
                AudioFeedback::PlayingChanged(playing) => {
                    if !playing && cycle_limit.is_none() {
                        log::warn!(target: "cli", "playback stopped");
                    }
                }
                AudioFeedback::BpmUpdate(bpm) => {
                    log::debug!(target: "cli", "bpm {}", bpm);
                }
                AudioFeedback::TelemetrySummary {
                    avg_poll_us,
                    max_poll_us,
                    overruns,
                    cycles_scheduled,
                    ..
                } => {
                    log::debug!(
                        target: "cli",
                        "poll avg {}us max {}us overruns {} cycles {}",
                        avg_poll_us,
                        max_poll_us,
                        overruns,
                        cycles_scheduled
                    );
                }
            }
        }

        if cycle_limit.is_some_and(|limit| completed >= limit) {
            break;
        }
    }

    handle.set_playing(false);
    let state = handle.read_state();
    log::info!(
        target: "cli",
        "stopping at cycle {} (root {})",
        state.cycle,
        state.root_name
    );
    // Let the release reach the server before the socket goes away.
    std::thread::sleep(Duration::from_millis(100));
}
