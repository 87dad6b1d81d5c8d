//! Scripted stand-in for the conferencing SDK, used by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::devices::{DeviceKind, MediaDeviceInfo};
use crate::errors::SdkError;
use crate::join_info::SessionConfiguration;
use crate::logging::SdkLogger;
use crate::sdk::{
    ActiveSpeakerCallback, ActiveSpeakerPolicy, AudioVideoFacade, AudioVideoObserver,
    DeviceLabelTrigger, MediaStream, MediaStreamConstraints, MeetingSdk, MeetingSessionStatus,
    MeetingSessionStatusCode, SdkResult,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Start,
    Stop,
    List(DeviceKind),
    Choose(DeviceKind, Option<String>),
    SubscribeActiveSpeaker,
    UnsubscribeActiveSpeaker,
    AddObserver,
    RemoveObserver,
    StopContentShare,
    StopLocalVideoTile,
    UnbindAudioElement,
    SetDeviceLabelTrigger,
}

#[derive(Default)]
pub(crate) struct FakeAudioVideo {
    calls: Mutex<Vec<Call>>,
    devices: Mutex<HashMap<DeviceKind, Vec<MediaDeviceInfo>>>,
    failing_lists: Mutex<HashSet<DeviceKind>>,
    failing_ids: Mutex<HashSet<String>>,
    observers: Mutex<Vec<Arc<dyn AudioVideoObserver>>>,
    speaker_callback: Mutex<Option<ActiveSpeakerCallback>>,
    label_trigger: Mutex<Option<DeviceLabelTrigger>>,
    stop_reports: Mutex<Option<MeetingSessionStatusCode>>,
}

impl FakeAudioVideo {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_devices(self, kind: DeviceKind, ids: &[&str]) -> Self {
        let list = ids
            .iter()
            .map(|id| MediaDeviceInfo::new(*id, format!("{kind} {id}"), kind))
            .collect();
        self.devices.lock().unwrap().insert(kind, list);
        self
    }

    pub(crate) fn failing_list(self, kind: DeviceKind) -> Self {
        self.failing_lists.lock().unwrap().insert(kind);
        self
    }

    pub(crate) fn failing_device(self, id: &str) -> Self {
        self.failing_ids.lock().unwrap().insert(id.to_string());
        self
    }

    /// Make `stop()` notify observers synchronously, as some SDK builds do.
    pub(crate) fn stop_reports(self, code: MeetingSessionStatusCode) -> Self {
        *self.stop_reports.lock().unwrap() = Some(code);
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub(crate) fn count(&self, call: &Call) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    pub(crate) fn observers(&self) -> Vec<Arc<dyn AudioVideoObserver>> {
        self.observers.lock().unwrap().clone()
    }

    pub(crate) fn has_speaker_callback(&self) -> bool {
        self.speaker_callback.lock().unwrap().is_some()
    }

    pub(crate) fn fire_started(&self) {
        for observer in self.observers() {
            observer.audio_video_did_start();
        }
    }

    pub(crate) fn fire_stopped(&self, code: MeetingSessionStatusCode) {
        for observer in self.observers() {
            observer.audio_video_did_stop(MeetingSessionStatus::new(code));
        }
    }

    pub(crate) fn emit_active_speakers(&self, ids: &[&str]) {
        let callback = self.speaker_callback.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback(ids.iter().map(|s| s.to_string()).collect());
        }
    }

    pub(crate) async fn trigger_device_labels(&self) -> SdkResult<MediaStream> {
        let trigger = self.label_trigger.lock().unwrap().clone();
        match trigger {
            Some(trigger) => trigger().await,
            None => Err(SdkError::Other("no device label trigger installed".into())),
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn list(&self, kind: DeviceKind) -> BoxFuture<'_, SdkResult<Vec<MediaDeviceInfo>>> {
        self.record(Call::List(kind));
        let result = if self.failing_lists.lock().unwrap().contains(&kind) {
            Err(SdkError::Device(format!("cannot enumerate {kind} devices")))
        } else {
            Ok(self.devices.lock().unwrap().get(&kind).cloned().unwrap_or_default())
        };
        async move { result }.boxed()
    }

    fn choose(&self, kind: DeviceKind, device_id: Option<String>) -> BoxFuture<'_, SdkResult<()>> {
        self.record(Call::Choose(kind, device_id.clone()));
        let result = match device_id {
            Some(id) if self.failing_ids.lock().unwrap().contains(&id) => {
                Err(SdkError::Device(format!("{id} is unavailable")))
            }
            _ => Ok(()),
        };
        async move {
            tokio::task::yield_now().await;
            result
        }
        .boxed()
    }
}

impl AudioVideoFacade for FakeAudioVideo {
    fn start(&self) {
        self.record(Call::Start);
    }

    fn stop(&self) {
        self.record(Call::Stop);
        let code = *self.stop_reports.lock().unwrap();
        if let Some(code) = code {
            self.fire_stopped(code);
        }
    }

    fn list_audio_input_devices(&self) -> BoxFuture<'_, SdkResult<Vec<MediaDeviceInfo>>> {
        self.list(DeviceKind::AudioInput)
    }

    fn list_audio_output_devices(&self) -> BoxFuture<'_, SdkResult<Vec<MediaDeviceInfo>>> {
        self.list(DeviceKind::AudioOutput)
    }

    fn list_video_input_devices(&self) -> BoxFuture<'_, SdkResult<Vec<MediaDeviceInfo>>> {
        self.list(DeviceKind::VideoInput)
    }

    fn choose_audio_input_device(&self, device_id: Option<String>) -> BoxFuture<'_, SdkResult<()>> {
        self.choose(DeviceKind::AudioInput, device_id)
    }

    fn choose_audio_output_device(&self, device_id: Option<String>) -> BoxFuture<'_, SdkResult<()>> {
        self.choose(DeviceKind::AudioOutput, device_id)
    }

    fn choose_video_input_device(&self, device_id: Option<String>) -> BoxFuture<'_, SdkResult<()>> {
        self.choose(DeviceKind::VideoInput, device_id)
    }

    fn subscribe_to_active_speaker_detector(
        &self,
        _policy: ActiveSpeakerPolicy,
        callback: ActiveSpeakerCallback,
    ) {
        self.record(Call::SubscribeActiveSpeaker);
        *self.speaker_callback.lock().unwrap() = Some(callback);
    }

    fn unsubscribe_from_active_speaker_detector(&self, callback: &ActiveSpeakerCallback) {
        self.record(Call::UnsubscribeActiveSpeaker);
        let mut current = self.speaker_callback.lock().unwrap();
        if current.as_ref().is_some_and(|c| Arc::ptr_eq(c, callback)) {
            *current = None;
        }
    }

    fn add_observer(&self, observer: Arc<dyn AudioVideoObserver>) {
        self.record(Call::AddObserver);
        self.observers.lock().unwrap().push(observer);
    }

    fn remove_observer(&self, observer: &Arc<dyn AudioVideoObserver>) {
        self.record(Call::RemoveObserver);
        self.observers.lock().unwrap().retain(|o| !Arc::ptr_eq(o, observer));
    }

    fn stop_content_share(&self) {
        self.record(Call::StopContentShare);
    }

    fn stop_local_video_tile(&self) {
        self.record(Call::StopLocalVideoTile);
    }

    fn unbind_audio_element(&self) {
        self.record(Call::UnbindAudioElement);
    }

    fn set_device_label_trigger(&self, trigger: DeviceLabelTrigger) {
        self.record(Call::SetDeviceLabelTrigger);
        *self.label_trigger.lock().unwrap() = Some(trigger);
    }
}

pub(crate) struct FakeSdk {
    pub(crate) audio_video: Arc<FakeAudioVideo>,
    fail_construction: AtomicBool,
    sessions_created: AtomicUsize,
    permission_requests: Arc<AtomicUsize>,
    last_configuration: Mutex<Option<SessionConfiguration>>,
    last_logger: Mutex<Option<SdkLogger>>,
}

impl FakeSdk {
    pub(crate) fn new(audio_video: FakeAudioVideo) -> Self {
        Self {
            audio_video: Arc::new(audio_video),
            fail_construction: AtomicBool::new(false),
            sessions_created: AtomicUsize::new(0),
            permission_requests: Arc::new(AtomicUsize::new(0)),
            last_configuration: Mutex::new(None),
            last_logger: Mutex::new(None),
        }
    }

    pub(crate) fn fail_construction(&self, fail: bool) {
        self.fail_construction.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn sessions_created(&self) -> usize {
        self.sessions_created.load(Ordering::SeqCst)
    }

    pub(crate) fn permission_requests(&self) -> usize {
        self.permission_requests.load(Ordering::SeqCst)
    }

    pub(crate) fn last_configuration(&self) -> Option<SessionConfiguration> {
        self.last_configuration.lock().unwrap().clone()
    }

    pub(crate) fn last_logger(&self) -> Option<SdkLogger> {
        self.last_logger.lock().unwrap().clone()
    }
}

impl MeetingSdk for FakeSdk {
    fn create_session(
        &self,
        configuration: &SessionConfiguration,
        logger: SdkLogger,
    ) -> SdkResult<Arc<dyn AudioVideoFacade>> {
        if self.fail_construction.load(Ordering::SeqCst) {
            return Err(SdkError::Construction("meeting not found".into()));
        }
        self.sessions_created.fetch_add(1, Ordering::SeqCst);
        *self.last_configuration.lock().unwrap() = Some(configuration.clone());
        *self.last_logger.lock().unwrap() = Some(logger);
        Ok(self.audio_video.clone())
    }

    fn request_user_media(
        &self,
        constraints: MediaStreamConstraints,
    ) -> BoxFuture<'static, SdkResult<MediaStream>> {
        let requests = self.permission_requests.clone();
        async move {
            requests.fetch_add(1, Ordering::SeqCst);
            if constraints.audio && constraints.video {
                Ok(MediaStream {
                    id: "local-av".into(),
                })
            } else {
                Err(SdkError::Permission("expected audio and video".into()))
            }
        }
        .boxed()
    }
}
