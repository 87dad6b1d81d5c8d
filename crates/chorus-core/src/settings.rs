use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;
use crate::sdk::ActiveSpeakerPolicy;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ManagerSettings {
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(default)]
    pub enable_web_audio: bool,
    #[serde(default)]
    pub active_speaker_policy: ActiveSpeakerPolicy,
}

/// Manager settings persisted as JSON under the host's data directory.
pub struct SettingsStore {
    settings: Mutex<ManagerSettings>,
    file_path: PathBuf,
}

impl SettingsStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let file_path = data_dir.as_ref().join("settings.json");
        let settings = Self::load(&file_path);
        Self {
            settings: Mutex::new(settings),
            file_path,
        }
    }

    pub fn get(&self) -> ManagerSettings {
        self.lock().clone()
    }

    pub fn set_log_level(&self, level: LogLevel) {
        self.lock().log_level = level;
        self.save();
    }

    pub fn set_enable_web_audio(&self, enabled: bool) {
        self.lock().enable_web_audio = enabled;
        self.save();
    }

    pub fn set_active_speaker_policy(&self, policy: ActiveSpeakerPolicy) {
        self.lock().active_speaker_policy = policy;
        self.save();
    }

    fn lock(&self) -> MutexGuard<'_, ManagerSettings> {
        self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn save(&self) {
        let settings = self.get();
        if let Some(parent) = self.file_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("settings dir {}: {e}", parent.display());
                return;
            }
        }
        match serde_json::to_string_pretty(&settings) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.file_path, json) {
                    tracing::warn!("failed to write {}: {e}", self.file_path.display());
                }
            }
            Err(e) => tracing::warn!("failed to encode settings: {e}"),
        }
    }

    fn load(path: &Path) -> ManagerSettings {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("ignoring corrupt {}: {e}", path.display());
                ManagerSettings::default()
            }),
            Err(_) => ManagerSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn test_default_settings() {
        let s = ManagerSettings::default();
        assert_eq!(s.log_level, LogLevel::Warn);
        assert!(!s.enable_web_audio);
        assert_eq!(s.active_speaker_policy, ActiveSpeakerPolicy::default());
    }

    #[test]
    fn test_new_creates_defaults_when_no_file() {
        let dir = temp_dir();
        let store = SettingsStore::new(dir.path());
        assert_eq!(store.get(), ManagerSettings::default());
    }

    #[test]
    fn test_set_log_level_persists() {
        let dir = temp_dir();
        {
            let store = SettingsStore::new(dir.path());
            store.set_log_level(LogLevel::Debug);
        }
        let store = SettingsStore::new(dir.path());
        assert_eq!(store.get().log_level, LogLevel::Debug);
    }

    #[test]
    fn test_policy_and_web_audio_persist() {
        let dir = temp_dir();
        {
            let store = SettingsStore::new(dir.path());
            store.set_enable_web_audio(true);
            store.set_active_speaker_policy(ActiveSpeakerPolicy {
                speaker_weight: 0.5,
                ..ActiveSpeakerPolicy::default()
            });
        }
        let s = SettingsStore::new(dir.path()).get();
        assert!(s.enable_web_audio);
        assert_eq!(s.active_speaker_policy.speaker_weight, 0.5);
        assert_eq!(s.active_speaker_policy.takeover_rate, 0.2);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = temp_dir();
        fs::write(dir.path().join("settings.json"), "not json!!!").unwrap();
        let store = SettingsStore::new(dir.path());
        assert_eq!(store.get(), ManagerSettings::default());
    }

    #[test]
    fn test_partial_json_uses_serde_defaults() {
        let dir = temp_dir();
        fs::write(dir.path().join("settings.json"), r#"{"log_level":"error"}"#).unwrap();
        let s = SettingsStore::new(dir.path()).get();
        assert_eq!(s.log_level, LogLevel::Error);
        assert!(!s.enable_web_audio);
        assert_eq!(s.active_speaker_policy, ActiveSpeakerPolicy::default());
    }
}
