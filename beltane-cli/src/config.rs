//! Configuration loading: embedded defaults merged with an optional user
//! file. Malformed user config is logged and ignored rather than fatal;
//! out-of-range values are rejected before they reach the scheduler.

use serde::Deserialize;

use beltane_types::EngineSettings;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    defaults: DefaultsConfig,
    #[serde(default)]
    runtime: RuntimeConfig,
}

#[derive(Deserialize, Default)]
struct DefaultsConfig {
    bpm: Option<f32>,
    lookahead_ms: Option<u64>,
    tick_interval_ms: Option<u64>,
    trigger_offsets: Option<[f64; 3]>,
    tuning_a4: Option<f64>,
}

#[derive(Deserialize, Default)]
struct RuntimeConfig {
    server_addr: Option<String>,
}

pub struct Config {
    defaults: DefaultsConfig,
    runtime: RuntimeConfig,
}

impl Config {
    pub fn load() -> Self {
        let mut base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");

        if let Some(path) = user_config_path() {
            if path.exists() {
                match std::fs::read_to_string(&path) {
                    Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                        Ok(user) => {
                            merge_defaults(&mut base.defaults, user.defaults);
                            merge_runtime(&mut base.runtime, user.runtime);
                        }
                        Err(e) => {
                            log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                        }
                    },
                    Err(e) => {
                        log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                    }
                }
            }
        }

        Config {
            defaults: base.defaults,
            runtime: base.runtime,
        }
    }

    /// Build validated engine settings from the merged configuration.
    pub fn engine_settings(&self) -> Result<EngineSettings, String> {
        let fallback = EngineSettings::default();
        let settings = EngineSettings {
            bpm: self.defaults.bpm.unwrap_or(fallback.bpm),
            lookahead_secs: self
                .defaults
                .lookahead_ms
                .map(|ms| ms as f64 / 1000.0)
                .unwrap_or(fallback.lookahead_secs),
            tick_interval_ms: self
                .defaults
                .tick_interval_ms
                .unwrap_or(fallback.tick_interval_ms),
            trigger_offsets: self
                .defaults
                .trigger_offsets
                .unwrap_or(fallback.trigger_offsets),
            tuning_a4: self.defaults.tuning_a4.unwrap_or(fallback.tuning_a4),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn server_addr(&self) -> String {
        self.runtime
            .server_addr
            .clone()
            .unwrap_or_else(|| "127.0.0.1:57110".to_string())
    }
}

fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|dir| dir.join("beltane").join("config.toml"))
}

fn merge_defaults(base: &mut DefaultsConfig, user: DefaultsConfig) {
    if user.bpm.is_some() {
        base.bpm = user.bpm;
    }
    if user.lookahead_ms.is_some() {
        base.lookahead_ms = user.lookahead_ms;
    }
    if user.tick_interval_ms.is_some() {
        base.tick_interval_ms = user.tick_interval_ms;
    }
    if user.trigger_offsets.is_some() {
        base.trigger_offsets = user.trigger_offsets;
    }
    if user.tuning_a4.is_some() {
        base.tuning_a4 = user.tuning_a4;
    }
}

fn merge_runtime(base: &mut RuntimeConfig, user: RuntimeConfig) {
    if user.server_addr.is_some() {
        base.server_addr = user.server_addr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse_and_validate() {
        let base: ConfigFile = toml::from_str(DEFAULT_CONFIG).expect("embedded config");
        let config = Config {
            defaults: base.defaults,
            runtime: base.runtime,
        };
        let settings = config.engine_settings().expect("valid settings");
        assert!((settings.bpm - 50.0).abs() < f32::EPSILON);
        assert!((settings.lookahead_secs - 0.2).abs() < 1e-9);
        assert_eq!(config.server_addr(), "127.0.0.1:57110");
    }

    #[test]
    fn user_values_override_defaults() {
        let mut base: ConfigFile = toml::from_str(DEFAULT_CONFIG).expect("embedded config");
        let user: ConfigFile = toml::from_str(
            r#"
            [defaults]
            bpm = 66.0

            [runtime]
            server_addr = "10.0.0.2:57110"
            "#,
        )
        .expect("user config");

        merge_defaults(&mut base.defaults, user.defaults);
        merge_runtime(&mut base.runtime, user.runtime);

        let config = Config {
            defaults: base.defaults,
            runtime: base.runtime,
        };
        let settings = config.engine_settings().expect("valid settings");
        assert!((settings.bpm - 66.0).abs() < f32::EPSILON);
        // Untouched values keep the embedded defaults.
        assert_eq!(settings.tick_interval_ms, 20);
        assert_eq!(config.server_addr(), "10.0.0.2:57110");
    }

    #[test]
    fn invalid_merged_settings_are_rejected() {
        let config = Config {
            defaults: DefaultsConfig {
                bpm: Some(-1.0),
                ..Default::default()
            },
            runtime: RuntimeConfig::default(),
        };
        assert!(config.engine_settings().is_err());
    }

    #[test]
    fn partial_user_file_parses() {
        let user: ConfigFile = toml::from_str("[defaults]\nbpm = 90.0\n").expect("partial config");
        assert_eq!(user.defaults.bpm, Some(90.0));
        assert!(user.runtime.server_addr.is_none());
    }
}
