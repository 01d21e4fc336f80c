use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::reconciler::RetryPolicy;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Settings {
    #[serde(default = "default_true")]
    pub audio_enabled_on_join: bool,
    #[serde(default = "default_true")]
    pub video_enabled_on_join: bool,
    #[serde(default = "default_true")]
    pub prefer_front_camera: bool,
    #[serde(default)]
    pub retry: RetrySettings,
}

/// Recheck fallback for publications whose subscription has not settled.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RetrySettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: u32,
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_backoff_multiplier() -> u32 {
    2
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            audio_enabled_on_join: true,
            video_enabled_on_join: true,
            prefer_front_camera: true,
            retry: RetrySettings::default(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            enabled: self.enabled,
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
        }
    }
}

/// JSON-backed settings in `<data_dir>/settings.json`.
pub struct SettingsStore {
    settings: Mutex<Settings>,
    file_path: PathBuf,
}

impl SettingsStore {
    pub fn new(data_dir: &str) -> Self {
        let file_path = PathBuf::from(data_dir).join("settings.json");
        let settings = Self::load(&file_path);
        Self {
            settings: Mutex::new(settings),
            file_path,
        }
    }

    pub fn get(&self) -> Settings {
        self.lock().clone()
    }

    pub fn set_audio_enabled_on_join(&self, enabled: bool) {
        self.lock().audio_enabled_on_join = enabled;
        self.save();
    }

    pub fn set_video_enabled_on_join(&self, enabled: bool) {
        self.lock().video_enabled_on_join = enabled;
        self.save();
    }

    pub fn set_prefer_front_camera(&self, prefer_front: bool) {
        self.lock().prefer_front_camera = prefer_front;
        self.save();
    }

    pub fn set_retry(&self, retry: RetrySettings) {
        self.lock().retry = retry;
        self.save();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Settings> {
        self.settings
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn save(&self) {
        let settings = self.get();
        if let Some(parent) = self.file_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(&settings) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.file_path, json) {
                    tracing::warn!("failed to write settings: {e}");
                }
            }
            Err(e) => tracing::warn!("failed to serialize settings: {e}"),
        }
    }

    fn load(path: &Path) -> Settings {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("corrupt settings file, using defaults: {e}");
                Settings::default()
            }),
            Err(_) => Settings::default(),
        }
    }
}
