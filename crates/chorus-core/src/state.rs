use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::devices::{DeviceKind, FullDeviceInfo, MediaDeviceInfo};
use crate::join_info::SessionConfiguration;
use crate::sdk::{ActiveSpeakerCallback, AudioVideoFacade, AudioVideoObserver};

/// Meeting lifecycle as seen by the UI.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MeetingStatus {
    #[default]
    Loading,
    Succeeded,
    Failed,
    Ended,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DevicePermissionStatus {
    #[default]
    Unset,
    InProgress,
    Granted,
    Denied,
}

/// Where the manager is in a join/leave cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    Idle,
    Joining,
    Joined,
    Leaving,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Joining => "joining",
            SessionPhase::Joined => "joined",
            SessionPhase::Leaving => "leaving",
        };
        f.write_str(s)
    }
}

/// Everything the manager knows about the current session.
///
/// Only the manager mutates this, always under its state lock.
pub struct SessionState {
    pub meeting_status: MeetingStatus,
    pub audio_video: Option<Arc<dyn AudioVideoFacade>>,
    pub configuration: Option<SessionConfiguration>,
    pub meeting_id: Option<String>,
    pub selected_audio_input_device: Option<String>,
    pub selected_audio_output_device: Option<String>,
    pub selected_video_input_device: Option<String>,
    pub audio_input_devices: Vec<MediaDeviceInfo>,
    pub audio_output_devices: Vec<MediaDeviceInfo>,
    pub video_input_devices: Vec<MediaDeviceInfo>,
    pub device_permission_status: DevicePermissionStatus,
    pub active_speakers: Vec<String>,
    pub(crate) active_speaker_callback: Option<ActiveSpeakerCallback>,
    pub(crate) observer: Option<Arc<dyn AudioVideoObserver>>,
    pub(crate) phase: SessionPhase,
    /// Set when the SDK reports a stop before `join` has finished.
    pub(crate) pending_stop: bool,
    /// Bumped on every join so late callbacks from an old session are ignored.
    pub(crate) generation: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            meeting_status: MeetingStatus::Loading,
            audio_video: None,
            configuration: None,
            meeting_id: None,
            selected_audio_input_device: None,
            selected_audio_output_device: None,
            selected_video_input_device: None,
            audio_input_devices: Vec::new(),
            audio_output_devices: Vec::new(),
            video_input_devices: Vec::new(),
            device_permission_status: DevicePermissionStatus::Unset,
            active_speakers: Vec::new(),
            active_speaker_callback: None,
            observer: None,
            phase: SessionPhase::Idle,
            pending_stop: false,
            generation: 0,
        }
    }

    /// Back to initial values. Phase and generation are lifecycle bookkeeping
    /// and survive.
    pub fn reset(&mut self) {
        let phase = self.phase;
        let generation = self.generation;
        *self = Self::new();
        self.phase = phase;
        self.generation = generation;
    }

    pub fn selected_device(&self, kind: DeviceKind) -> Option<&str> {
        match kind {
            DeviceKind::AudioInput => self.selected_audio_input_device.as_deref(),
            DeviceKind::AudioOutput => self.selected_audio_output_device.as_deref(),
            DeviceKind::VideoInput => self.selected_video_input_device.as_deref(),
        }
    }

    pub fn set_selected_device(&mut self, kind: DeviceKind, device_id: Option<String>) {
        let slot = match kind {
            DeviceKind::AudioInput => &mut self.selected_audio_input_device,
            DeviceKind::AudioOutput => &mut self.selected_audio_output_device,
            DeviceKind::VideoInput => &mut self.selected_video_input_device,
        };
        *slot = device_id;
    }

    pub fn devices(&self, kind: DeviceKind) -> &[MediaDeviceInfo] {
        match kind {
            DeviceKind::AudioInput => &self.audio_input_devices,
            DeviceKind::AudioOutput => &self.audio_output_devices,
            DeviceKind::VideoInput => &self.video_input_devices,
        }
    }

    pub fn set_devices(&mut self, kind: DeviceKind, devices: Vec<MediaDeviceInfo>) {
        match kind {
            DeviceKind::AudioInput => self.audio_input_devices = devices,
            DeviceKind::AudioOutput => self.audio_output_devices = devices,
            DeviceKind::VideoInput => self.video_input_devices = devices,
        }
    }

    pub fn full_device_info(&self) -> FullDeviceInfo {
        FullDeviceInfo {
            selected_audio_input_device: self.selected_audio_input_device.clone(),
            selected_audio_output_device: self.selected_audio_output_device.clone(),
            selected_video_input_device: self.selected_video_input_device.clone(),
            audio_input_devices: self.audio_input_devices.clone(),
            audio_output_devices: self.audio_output_devices.clone(),
            video_input_devices: self.video_input_devices.clone(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
