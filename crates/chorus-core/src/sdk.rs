//! Seams to the external conferencing SDK.
//!
//! Transport, codecs and the media pipeline live entirely behind these
//! traits. Host shells implement them on top of the real SDK; the manager
//! only ever talks to the trait objects.

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::devices::MediaDeviceInfo;
use crate::errors::SdkError;
use crate::join_info::SessionConfiguration;
use crate::logging::SdkLogger;

pub type SdkResult<T> = Result<T, SdkError>;

/// Receives the attendee ids currently detected as dominant speakers.
pub type ActiveSpeakerCallback = Arc<dyn Fn(Vec<String>) + Send + Sync>;

/// Invoked by the SDK when it needs device labels, which requires a media
/// permission prompt. Must resolve to the stream the prompt produced.
pub type DeviceLabelTrigger = Arc<dyn Fn() -> BoxFuture<'static, SdkResult<MediaStream>> + Send + Sync>;

/// Handle to a captured local media stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStream {
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaStreamConstraints {
    pub audio: bool,
    pub video: bool,
}

/// Tuning for the SDK's active speaker detector.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ActiveSpeakerPolicy {
    pub speaker_weight: f64,
    pub cutoff_threshold: f64,
    pub silence_threshold: f64,
    pub takeover_rate: f64,
}

impl Default for ActiveSpeakerPolicy {
    fn default() -> Self {
        Self {
            speaker_weight: 0.9,
            cutoff_threshold: 0.01,
            silence_threshold: 0.2,
            takeover_rate: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingSessionStatusCode {
    Ok,
    Left,
    AudioJoinedFromAnotherDevice,
    AudioDisconnectAudio,
    AudioAuthenticationRejected,
    AudioCallAtCapacity,
    /// The meeting was ended for every participant.
    AudioCallEnded,
    AudioInternalServerError,
    AudioServiceUnavailable,
    AudioDisconnected,
    SignalingBadRequest,
    ConnectionHealthReconnect,
    TaskFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeetingSessionStatus {
    code: MeetingSessionStatusCode,
}

impl MeetingSessionStatus {
    pub fn new(code: MeetingSessionStatusCode) -> Self {
        Self { code }
    }

    pub fn status_code(&self) -> MeetingSessionStatusCode {
        self.code
    }

    pub fn is_call_ended_for_all(&self) -> bool {
        self.code == MeetingSessionStatusCode::AudioCallEnded
    }
}

impl fmt::Display for MeetingSessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.code)
    }
}

/// Lifecycle notifications from a running session. Both hooks are optional.
pub trait AudioVideoObserver: Send + Sync {
    fn audio_video_did_start(&self) {}

    fn audio_video_did_stop(&self, _status: MeetingSessionStatus) {}
}

/// The live audio/video session exposed by the SDK.
pub trait AudioVideoFacade: Send + Sync {
    fn start(&self);

    fn stop(&self);

    fn list_audio_input_devices(&self) -> BoxFuture<'_, SdkResult<Vec<MediaDeviceInfo>>>;

    fn list_audio_output_devices(&self) -> BoxFuture<'_, SdkResult<Vec<MediaDeviceInfo>>>;

    fn list_video_input_devices(&self) -> BoxFuture<'_, SdkResult<Vec<MediaDeviceInfo>>>;

    /// `None` releases the current device.
    fn choose_audio_input_device(&self, device_id: Option<String>) -> BoxFuture<'_, SdkResult<()>>;

    fn choose_audio_output_device(&self, device_id: Option<String>) -> BoxFuture<'_, SdkResult<()>>;

    fn choose_video_input_device(&self, device_id: Option<String>) -> BoxFuture<'_, SdkResult<()>>;

    fn subscribe_to_active_speaker_detector(
        &self,
        policy: ActiveSpeakerPolicy,
        callback: ActiveSpeakerCallback,
    );

    /// Removes the callback previously passed to
    /// [`subscribe_to_active_speaker_detector`](Self::subscribe_to_active_speaker_detector),
    /// matched by `Arc` identity.
    fn unsubscribe_from_active_speaker_detector(&self, callback: &ActiveSpeakerCallback);

    fn add_observer(&self, observer: Arc<dyn AudioVideoObserver>);

    fn remove_observer(&self, observer: &Arc<dyn AudioVideoObserver>);

    fn stop_content_share(&self);

    fn stop_local_video_tile(&self);

    fn unbind_audio_element(&self);

    fn set_device_label_trigger(&self, trigger: DeviceLabelTrigger);
}

/// Entry point into the SDK.
pub trait MeetingSdk: Send + Sync {
    /// Build a session (and its device controller) for one attendee.
    fn create_session(
        &self,
        configuration: &SessionConfiguration,
        logger: SdkLogger,
    ) -> SdkResult<Arc<dyn AudioVideoFacade>>;

    /// Prompt for local media access.
    fn request_user_media(
        &self,
        constraints: MediaStreamConstraints,
    ) -> BoxFuture<'static, SdkResult<MediaStream>>;
}
