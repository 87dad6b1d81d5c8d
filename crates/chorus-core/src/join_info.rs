use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::SessionError;
use crate::settings::ManagerSettings;

/// Media endpoints the provider assigned to a meeting.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct MediaPlacement {
    #[serde(default)]
    pub audio_host_url: Option<String>,
    #[serde(default)]
    pub audio_fallback_url: Option<String>,
    #[serde(default)]
    pub signaling_url: Option<String>,
    #[serde(default)]
    pub turn_control_url: Option<String>,
    #[serde(default)]
    pub event_ingestion_url: Option<String>,
}

/// Meeting descriptor as returned by the provider's create-meeting call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct MeetingInfo {
    pub meeting_id: String,
    #[serde(default)]
    pub external_meeting_id: Option<String>,
    #[serde(default)]
    pub media_region: Option<String>,
    #[serde(default)]
    pub media_placement: Option<MediaPlacement>,
}

impl MeetingInfo {
    pub fn new(meeting_id: impl Into<String>) -> Self {
        Self {
            meeting_id: meeting_id.into(),
            external_meeting_id: None,
            media_region: None,
            media_placement: None,
        }
    }

    /// Parse either a bare meeting object or one wrapped as `{"Meeting": {...}}`.
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        let value: Value = serde_json::from_str(json)?;
        Ok(serde_json::from_value(unwrap_envelope(value, "Meeting"))?)
    }
}

/// Attendee descriptor as returned by the provider's create-attendee call.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct AttendeeInfo {
    pub attendee_id: String,
    #[serde(default)]
    pub external_user_id: Option<String>,
    pub join_token: String,
}

impl AttendeeInfo {
    pub fn new(attendee_id: impl Into<String>, join_token: impl Into<String>) -> Self {
        Self {
            attendee_id: attendee_id.into(),
            external_user_id: None,
            join_token: join_token.into(),
        }
    }

    /// Parse either a bare attendee object or one wrapped as `{"Attendee": {...}}`.
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        let value: Value = serde_json::from_str(json)?;
        Ok(serde_json::from_value(unwrap_envelope(value, "Attendee"))?)
    }
}

impl fmt::Debug for AttendeeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttendeeInfo")
            .field("attendee_id", &self.attendee_id)
            .field("external_user_id", &self.external_user_id)
            .field("join_token", &"<redacted>")
            .finish()
    }
}

fn unwrap_envelope(mut value: Value, key: &str) -> Value {
    if let Some(inner) = value.get_mut(key) {
        return inner.take();
    }
    value
}

/// Everything the SDK needs to open a session for one attendee.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionConfiguration {
    pub meeting_id: String,
    pub external_meeting_id: Option<String>,
    pub media_region: Option<String>,
    pub media_placement: Option<MediaPlacement>,
    pub attendee_id: String,
    pub external_user_id: Option<String>,
    pub join_token: String,
    pub enable_web_audio: bool,
}

impl SessionConfiguration {
    pub fn new(
        meeting: &MeetingInfo,
        attendee: &AttendeeInfo,
        settings: &ManagerSettings,
    ) -> Result<Self, SessionError> {
        if meeting.meeting_id.trim().is_empty() {
            return Err(SessionError::InvalidJoinInfo("meeting id is empty".into()));
        }
        if attendee.attendee_id.trim().is_empty() {
            return Err(SessionError::InvalidJoinInfo("attendee id is empty".into()));
        }

        Ok(Self {
            meeting_id: meeting.meeting_id.clone(),
            external_meeting_id: meeting.external_meeting_id.clone(),
            media_region: meeting.media_region.clone(),
            media_placement: meeting.media_placement.clone(),
            attendee_id: attendee.attendee_id.clone(),
            external_user_id: attendee.external_user_id.clone(),
            join_token: attendee.join_token.clone(),
            enable_web_audio: settings.enable_web_audio,
        })
    }
}

impl fmt::Debug for SessionConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfiguration")
            .field("meeting_id", &self.meeting_id)
            .field("external_meeting_id", &self.external_meeting_id)
            .field("media_region", &self.media_region)
            .field("attendee_id", &self.attendee_id)
            .field("external_user_id", &self.external_user_id)
            .field("enable_web_audio", &self.enable_web_audio)
            .finish_non_exhaustive()
    }
}
