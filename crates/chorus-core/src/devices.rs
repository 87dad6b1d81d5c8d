use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier UI pickers send to mean "no device".
pub const NO_DEVICE: &str = "none";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum DeviceKind {
    AudioInput,
    AudioOutput,
    VideoInput,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 3] = [
        DeviceKind::AudioInput,
        DeviceKind::AudioOutput,
        DeviceKind::VideoInput,
    ];
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceKind::AudioInput => "audio input",
            DeviceKind::AudioOutput => "audio output",
            DeviceKind::VideoInput => "video input",
        };
        f.write_str(s)
    }
}

/// A selectable media device as enumerated by the SDK.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaDeviceInfo {
    pub device_id: String,
    pub label: String,
    pub kind: DeviceKind,
}

impl MediaDeviceInfo {
    pub fn new(device_id: impl Into<String>, label: impl Into<String>, kind: DeviceKind) -> Self {
        Self {
            device_id: device_id.into(),
            label: label.into(),
            kind,
        }
    }
}

/// What the SDK is asked to apply for one device kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelection {
    None,
    Device(String),
}

impl DeviceSelection {
    /// Resolve a picker value. Blank strings and [`NO_DEVICE`] (any case)
    /// mean no device; any other id is passed through untouched.
    pub fn from_id(device_id: &str) -> Self {
        let trimmed = device_id.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NO_DEVICE) {
            DeviceSelection::None
        } else {
            DeviceSelection::Device(device_id.to_string())
        }
    }

    pub fn device_id(&self) -> Option<&str> {
        match self {
            DeviceSelection::None => None,
            DeviceSelection::Device(id) => Some(id),
        }
    }

    pub fn into_device_id(self) -> Option<String> {
        match self {
            DeviceSelection::None => None,
            DeviceSelection::Device(id) => Some(id),
        }
    }
}

/// Current selections plus every enumerated device, published after each
/// device-list refresh.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FullDeviceInfo {
    pub selected_audio_input_device: Option<String>,
    pub selected_audio_output_device: Option<String>,
    pub selected_video_input_device: Option<String>,
    pub audio_input_devices: Vec<MediaDeviceInfo>,
    pub audio_output_devices: Vec<MediaDeviceInfo>,
    pub video_input_devices: Vec<MediaDeviceInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_and_empty_mean_no_device() {
        assert_eq!(DeviceSelection::from_id("none"), DeviceSelection::None);
        assert_eq!(DeviceSelection::from_id("None"), DeviceSelection::None);
        assert_eq!(DeviceSelection::from_id(""), DeviceSelection::None);
        assert_eq!(DeviceSelection::from_id("   "), DeviceSelection::None);
    }

    #[test]
    fn real_id_is_kept() {
        let sel = DeviceSelection::from_id("a1");
        assert_eq!(sel.device_id(), Some("a1"));
        assert_eq!(sel.into_device_id(), Some("a1".to_string()));
    }

    #[test]
    fn padded_id_reaches_the_sdk_verbatim() {
        let sel = DeviceSelection::from_id(" usb-cam:1 ");
        assert_eq!(sel.device_id(), Some(" usb-cam:1 "));
        assert_eq!(DeviceSelection::from_id(" none "), DeviceSelection::None);
    }

    #[test]
    fn device_info_uses_camel_case_keys() {
        let info = MediaDeviceInfo::new("a1", "Built-in Mic", DeviceKind::AudioInput);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["deviceId"], "a1");
        assert_eq!(json["kind"], "audioInput");
    }
}
