use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::runtime::Handle;

use crate::devices::{DeviceKind, DeviceSelection, FullDeviceInfo, MediaDeviceInfo};
use crate::errors::SessionError;
use crate::join_info::{AttendeeInfo, MeetingInfo, SessionConfiguration};
use crate::logging::SdkLogger;
use crate::observers::{Listener, Observers, SubscriptionId, notify};
use crate::sdk::{
    ActiveSpeakerCallback, AudioVideoFacade, AudioVideoObserver, DeviceLabelTrigger,
    MediaStreamConstraints, MeetingSdk, MeetingSessionStatus, SdkResult,
};
use crate::settings::ManagerSettings;
use crate::state::{DevicePermissionStatus, MeetingStatus, SessionPhase, SessionState};

const SDK_LOGGER_NAME: &str = "SDK";

/// Listener registries, one per observable field.
struct Channels {
    meeting_status: Observers<MeetingStatus>,
    audio_video: Observers<Option<Arc<dyn AudioVideoFacade>>>,
    active_speakers: Observers<Vec<String>>,
    device_permission_status: Observers<DevicePermissionStatus>,
    selected_audio_input_device: Observers<Option<String>>,
    selected_audio_output_device: Observers<Option<String>>,
    selected_video_input_device: Observers<Option<String>>,
    devices_updated: Observers<FullDeviceInfo>,
}

impl Channels {
    fn new() -> Self {
        Self {
            meeting_status: Observers::new(),
            audio_video: Observers::new(),
            active_speakers: Observers::new(),
            device_permission_status: Observers::new(),
            selected_audio_input_device: Observers::new(),
            selected_audio_output_device: Observers::new(),
            selected_video_input_device: Observers::new(),
            devices_updated: Observers::new(),
        }
    }

    fn selected_device(&self, kind: DeviceKind) -> &Observers<Option<String>> {
        match kind {
            DeviceKind::AudioInput => &self.selected_audio_input_device,
            DeviceKind::AudioOutput => &self.selected_audio_output_device,
            DeviceKind::VideoInput => &self.selected_video_input_device,
        }
    }

    fn selected_device_mut(&mut self, kind: DeviceKind) -> &mut Observers<Option<String>> {
        match kind {
            DeviceKind::AudioInput => &mut self.selected_audio_input_device,
            DeviceKind::AudioOutput => &mut self.selected_audio_output_device,
            DeviceKind::VideoInput => &mut self.selected_video_input_device,
        }
    }
}

/// State and listeners share one lock.
struct Shared {
    state: SessionState,
    channels: Channels,
    /// Runtime that SDK callbacks use to schedule the automatic leave.
    runtime: Option<Handle>,
}

struct Inner {
    me: Weak<Inner>,
    sdk: Arc<dyn MeetingSdk>,
    settings: ManagerSettings,
    shared: Mutex<Shared>,
}

/// Mediates between the conferencing SDK and UI code that observes session
/// state.
///
/// Cloning is cheap; every clone drives the same session. Listeners run
/// synchronously on the thread that caused the change and never under the
/// internal lock, so they may call back into the manager.
#[derive(Clone)]
pub struct MeetingManager {
    inner: Arc<Inner>,
}

impl MeetingManager {
    pub fn new(sdk: Arc<dyn MeetingSdk>, settings: ManagerSettings) -> Self {
        let inner = Arc::new_cyclic(|me| Inner {
            me: me.clone(),
            sdk,
            settings,
            shared: Mutex::new(Shared {
                state: SessionState::new(),
                channels: Channels::new(),
                runtime: None,
            }),
        });
        Self { inner }
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.inner.settings
    }

    /// Open a session for `attendee` in `meeting`.
    ///
    /// Fails with [`SessionError::AlreadyJoined`] while a session is live and
    /// with [`SessionError::Transitioning`] while a join or leave is running.
    /// SDK construction failures are returned as-is; status stays `Loading`.
    /// A stop reported by the SDK before this returns tears the session down
    /// again once the join completes.
    pub async fn join(&self, meeting: MeetingInfo, attendee: AttendeeInfo) -> Result<(), SessionError> {
        self.inner.join(meeting, attendee).await
    }

    /// Start media on the current session. No-op without one.
    pub fn start(&self) {
        let audio_video = self.inner.lock().state.audio_video.clone();
        match audio_video {
            Some(audio_video) => audio_video.start(),
            None => tracing::debug!("start ignored: no active session"),
        }
    }

    /// Tear the session down, if any, and reset every field.
    pub async fn leave(&self) -> Result<(), SessionError> {
        self.inner.leave().await
    }

    pub async fn select_audio_input_device(&self, device_id: &str) {
        self.inner
            .apply_device(DeviceKind::AudioInput, DeviceSelection::from_id(device_id))
            .await;
    }

    pub async fn select_audio_output_device(&self, device_id: &str) {
        self.inner
            .apply_device(DeviceKind::AudioOutput, DeviceSelection::from_id(device_id))
            .await;
    }

    pub async fn select_video_input_device(&self, device_id: &str) {
        self.inner
            .apply_device(DeviceKind::VideoInput, DeviceSelection::from_id(device_id))
            .await;
    }

    /// Refresh all device lists and pick the first device of every kind that
    /// has no selection yet.
    pub async fn list_and_select_devices(&self) {
        self.inner.list_and_select_devices().await;
    }

    // ---------------------------------------------------------------
    // Current values
    // ---------------------------------------------------------------

    pub fn phase(&self) -> SessionPhase {
        self.inner.lock().state.phase
    }

    pub fn meeting_status(&self) -> MeetingStatus {
        self.inner.lock().state.meeting_status
    }

    pub fn audio_video(&self) -> Option<Arc<dyn AudioVideoFacade>> {
        self.inner.lock().state.audio_video.clone()
    }

    pub fn meeting_id(&self) -> Option<String> {
        self.inner.lock().state.meeting_id.clone()
    }

    pub fn configuration(&self) -> Option<SessionConfiguration> {
        self.inner.lock().state.configuration.clone()
    }

    pub fn active_speakers(&self) -> Vec<String> {
        self.inner.lock().state.active_speakers.clone()
    }

    pub fn device_permission_status(&self) -> DevicePermissionStatus {
        self.inner.lock().state.device_permission_status
    }

    pub fn selected_audio_input_device(&self) -> Option<String> {
        self.inner.lock().state.selected_audio_input_device.clone()
    }

    pub fn selected_audio_output_device(&self) -> Option<String> {
        self.inner.lock().state.selected_audio_output_device.clone()
    }

    pub fn selected_video_input_device(&self) -> Option<String> {
        self.inner.lock().state.selected_video_input_device.clone()
    }

    pub fn audio_input_devices(&self) -> Vec<MediaDeviceInfo> {
        self.inner.lock().state.audio_input_devices.clone()
    }

    pub fn audio_output_devices(&self) -> Vec<MediaDeviceInfo> {
        self.inner.lock().state.audio_output_devices.clone()
    }

    pub fn video_input_devices(&self) -> Vec<MediaDeviceInfo> {
        self.inner.lock().state.video_input_devices.clone()
    }

    pub fn full_device_info(&self) -> FullDeviceInfo {
        self.inner.lock().state.full_device_info()
    }

    // ---------------------------------------------------------------
    // Subscriptions
    // ---------------------------------------------------------------

    /// The callback receives the current status immediately, then every change.
    pub fn subscribe_to_meeting_status<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&MeetingStatus) + Send + Sync + 'static,
    {
        let listener: Listener<MeetingStatus> = Arc::new(callback);
        let (id, current) = {
            let mut shared = self.inner.lock();
            let id = shared.channels.meeting_status.add(listener.clone());
            (id, shared.state.meeting_status)
        };
        listener(&current);
        id
    }

    pub fn unsubscribe_from_meeting_status(&self, id: SubscriptionId) -> bool {
        self.inner.lock().channels.meeting_status.remove(id)
    }

    pub fn subscribe_to_audio_video<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Option<Arc<dyn AudioVideoFacade>>) + Send + Sync + 'static,
    {
        self.inner.lock().channels.audio_video.add(Arc::new(callback))
    }

    pub fn unsubscribe_from_audio_video(&self, id: SubscriptionId) -> bool {
        self.inner.lock().channels.audio_video.remove(id)
    }

    /// The callback receives the current speakers immediately, then every update.
    pub fn subscribe_to_active_speakers<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Vec<String>) + Send + Sync + 'static,
    {
        let listener: Listener<Vec<String>> = Arc::new(callback);
        let (id, current) = {
            let mut shared = self.inner.lock();
            let id = shared.channels.active_speakers.add(listener.clone());
            (id, shared.state.active_speakers.clone())
        };
        listener(&current);
        id
    }

    pub fn unsubscribe_from_active_speakers(&self, id: SubscriptionId) -> bool {
        self.inner.lock().channels.active_speakers.remove(id)
    }

    pub fn subscribe_to_device_permission_status<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DevicePermissionStatus) + Send + Sync + 'static,
    {
        self.inner
            .lock()
            .channels
            .device_permission_status
            .add(Arc::new(callback))
    }

    pub fn unsubscribe_from_device_permission_status(&self, id: SubscriptionId) -> bool {
        self.inner.lock().channels.device_permission_status.remove(id)
    }

    pub fn subscribe_to_selected_audio_input_device<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Option<String>) + Send + Sync + 'static,
    {
        self.subscribe_to_selected_device(DeviceKind::AudioInput, Arc::new(callback))
    }

    pub fn unsubscribe_from_selected_audio_input_device(&self, id: SubscriptionId) -> bool {
        self.unsubscribe_from_selected_device(DeviceKind::AudioInput, id)
    }

    pub fn subscribe_to_selected_audio_output_device<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Option<String>) + Send + Sync + 'static,
    {
        self.subscribe_to_selected_device(DeviceKind::AudioOutput, Arc::new(callback))
    }

    pub fn unsubscribe_from_selected_audio_output_device(&self, id: SubscriptionId) -> bool {
        self.unsubscribe_from_selected_device(DeviceKind::AudioOutput, id)
    }

    pub fn subscribe_to_selected_video_input_device<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Option<String>) + Send + Sync + 'static,
    {
        self.subscribe_to_selected_device(DeviceKind::VideoInput, Arc::new(callback))
    }

    pub fn unsubscribe_from_selected_video_input_device(&self, id: SubscriptionId) -> bool {
        self.unsubscribe_from_selected_device(DeviceKind::VideoInput, id)
    }

    /// Fired after every device-list refresh.
    pub fn subscribe_to_devices_updated<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&FullDeviceInfo) + Send + Sync + 'static,
    {
        self.inner.lock().channels.devices_updated.add(Arc::new(callback))
    }

    pub fn unsubscribe_from_devices_updated(&self, id: SubscriptionId) -> bool {
        self.inner.lock().channels.devices_updated.remove(id)
    }

    fn subscribe_to_selected_device(
        &self,
        kind: DeviceKind,
        listener: Listener<Option<String>>,
    ) -> SubscriptionId {
        self.inner.lock().channels.selected_device_mut(kind).add(listener)
    }

    fn unsubscribe_from_selected_device(&self, kind: DeviceKind, id: SubscriptionId) -> bool {
        self.inner.lock().channels.selected_device_mut(kind).remove(id)
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------

    async fn join(&self, meeting: MeetingInfo, attendee: AttendeeInfo) -> Result<(), SessionError> {
        let configuration = SessionConfiguration::new(&meeting, &attendee, &self.settings)?;
        let generation = self.begin_join()?;
        let _guard = JoinGuard {
            inner: self,
            generation,
        };

        tracing::info!(
            "joining meeting {} as attendee {}",
            configuration.meeting_id,
            configuration.attendee_id
        );

        let logger = SdkLogger::new(SDK_LOGGER_NAME, self.settings.log_level);
        let audio_video = match self.sdk.create_session(&configuration, logger) {
            Ok(audio_video) => audio_video,
            Err(e) => {
                tracing::error!("failed to create session for {}: {e}", configuration.meeting_id);
                return Err(e.into());
            }
        };

        {
            let mut shared = self.lock();
            shared.state.meeting_id = Some(configuration.meeting_id.clone());
            shared.state.configuration = Some(configuration);
            shared.state.audio_video = Some(audio_video.clone());
        }

        self.setup_audio_video_observer(audio_video.as_ref(), generation);
        self.setup_device_label_trigger(audio_video.as_ref());
        self.list_and_select_devices().await;
        self.publish_audio_video();
        self.setup_active_speaker_detection(audio_video.as_ref(), generation);

        // An `Ended` reported mid-join is kept; the leave below resets it.
        let (ended, pending_stop) = {
            let mut shared = self.lock();
            let ended = shared.state.meeting_status == MeetingStatus::Ended;
            if !ended {
                shared.state.meeting_status = MeetingStatus::Loading;
            }
            shared.state.phase = SessionPhase::Joined;
            (ended, std::mem::take(&mut shared.state.pending_stop))
        };
        if !ended {
            self.publish_meeting_status();
        }

        if pending_stop {
            tracing::info!("session stopped while joining; leaving");
            if let Err(e) = self.leave().await {
                tracing::warn!("leave after stop during join failed: {e}");
            }
        }
        Ok(())
    }

    /// Claim the lifecycle for a join and return the new session generation.
    fn begin_join(&self) -> Result<u64, SessionError> {
        let mut shared = self.lock();
        match shared.state.phase {
            SessionPhase::Idle => {}
            SessionPhase::Joined => {
                let meeting_id = shared.state.meeting_id.clone().unwrap_or_default();
                return Err(SessionError::AlreadyJoined(meeting_id));
            }
            phase => return Err(SessionError::Transitioning(phase)),
        }
        shared.state.reset();
        shared.state.phase = SessionPhase::Joining;
        shared.state.generation += 1;
        shared.runtime = Handle::try_current().ok();
        Ok(shared.state.generation)
    }

    async fn leave(&self) -> Result<(), SessionError> {
        let (audio_video, speaker_callback, observer) = {
            let mut shared = self.lock();
            match shared.state.phase {
                SessionPhase::Joining | SessionPhase::Leaving => {
                    return Err(SessionError::Transitioning(shared.state.phase));
                }
                SessionPhase::Idle | SessionPhase::Joined => {}
            }
            shared.state.phase = SessionPhase::Leaving;
            (
                shared.state.audio_video.clone(),
                shared.state.active_speaker_callback.clone(),
                shared.state.observer.clone(),
            )
        };

        if let Some(audio_video) = audio_video {
            tracing::info!("leaving meeting");
            audio_video.stop_content_share();
            audio_video.stop_local_video_tile();
            audio_video.unbind_audio_element();
            // Released one at a time; the SDK must never see overlapping teardown.
            for kind in [DeviceKind::VideoInput, DeviceKind::AudioInput, DeviceKind::AudioOutput] {
                if let Err(e) = choose_device(audio_video.as_ref(), kind, None).await {
                    tracing::warn!("failed to release {kind} device: {e}");
                }
            }
            if let Some(callback) = &speaker_callback {
                audio_video.unsubscribe_from_active_speaker_detector(callback);
            }
            audio_video.stop();
            if let Some(observer) = &observer {
                audio_video.remove_observer(observer);
            }
        }

        let (had_selection, had_permission) = {
            let mut shared = self.lock();
            let had_selection = DeviceKind::ALL.map(|kind| shared.state.selected_device(kind).is_some());
            let had_permission = shared.state.device_permission_status != DevicePermissionStatus::Unset;
            shared.state.reset();
            shared.state.phase = SessionPhase::Idle;
            (had_selection, had_permission)
        };

        self.publish_meeting_status();
        self.publish_audio_video();
        self.publish_active_speakers();
        for (kind, changed) in DeviceKind::ALL.into_iter().zip(had_selection) {
            if changed {
                self.publish_selected_device(kind);
            }
        }
        if had_permission {
            self.publish_device_permission_status();
        }
        Ok(())
    }

    fn schedule_leave(&self, runtime: Option<Handle>) {
        let Some(runtime) = runtime else {
            tracing::warn!("session stopped outside a tokio runtime; call leave() manually");
            return;
        };
        let me = self.me.clone();
        runtime.spawn(async move {
            let Some(inner) = me.upgrade() else {
                return;
            };
            if let Err(e) = inner.leave().await {
                tracing::warn!("automatic leave failed: {e}");
            }
        });
    }

    // ---------------------------------------------------------------
    // SDK wiring
    // ---------------------------------------------------------------

    fn setup_audio_video_observer(&self, audio_video: &dyn AudioVideoFacade, generation: u64) {
        let observer: Arc<dyn AudioVideoObserver> = Arc::new(SessionObserver {
            inner: self.me.clone(),
            generation,
        });
        self.lock().state.observer = Some(observer.clone());
        audio_video.add_observer(observer);
    }

    /// Permission goes to `InProgress` whenever the SDK fires the trigger, but
    /// is reported `Granted` as soon as the trigger is installed, before the
    /// user has answered any prompt.
    fn setup_device_label_trigger(&self, audio_video: &dyn AudioVideoFacade) {
        let me = self.me.clone();
        let sdk = self.sdk.clone();
        let trigger: DeviceLabelTrigger = Arc::new(move || {
            if let Some(inner) = me.upgrade() {
                inner.set_device_permission_status(DevicePermissionStatus::InProgress);
            }
            sdk.request_user_media(MediaStreamConstraints {
                audio: true,
                video: true,
            })
        });
        audio_video.set_device_label_trigger(trigger);
        self.set_device_permission_status(DevicePermissionStatus::Granted);
    }

    fn setup_active_speaker_detection(&self, audio_video: &dyn AudioVideoFacade, generation: u64) {
        self.publish_active_speakers();

        let me = self.me.clone();
        let callback: ActiveSpeakerCallback = Arc::new(move |speakers: Vec<String>| {
            if let Some(inner) = me.upgrade() {
                inner.update_active_speakers(generation, speakers);
            }
        });
        self.lock().state.active_speaker_callback = Some(callback.clone());
        audio_video.subscribe_to_active_speaker_detector(self.settings.active_speaker_policy, callback);
    }

    fn is_current(shared: &Shared, generation: u64) -> bool {
        shared.state.generation == generation && shared.state.phase != SessionPhase::Idle
    }

    fn audio_video_did_start(&self, generation: u64) {
        {
            let mut shared = self.lock();
            if !Self::is_current(&shared, generation) {
                tracing::debug!("ignoring start from a previous session");
                return;
            }
            shared.state.meeting_status = MeetingStatus::Succeeded;
        }
        tracing::info!("meeting started successfully");
        self.publish_meeting_status();
    }

    fn audio_video_did_stop(&self, generation: u64, status: MeetingSessionStatus) {
        let (phase, runtime) = {
            let mut shared = self.lock();
            if !Self::is_current(&shared, generation) {
                tracing::debug!("ignoring stop ({status}) from a previous session");
                return;
            }
            if status.is_call_ended_for_all() {
                shared.state.meeting_status = MeetingStatus::Ended;
            }
            if shared.state.phase == SessionPhase::Joining {
                shared.state.pending_stop = true;
            }
            (shared.state.phase, shared.runtime.clone())
        };

        if status.is_call_ended_for_all() {
            tracing::info!("meeting ended for all");
            self.publish_meeting_status();
        } else {
            tracing::info!("session stopped: {status}");
        }

        match phase {
            SessionPhase::Leaving => {}
            SessionPhase::Joining => {
                tracing::debug!("stop arrived mid-join; leaving once join completes");
            }
            SessionPhase::Idle | SessionPhase::Joined => self.schedule_leave(runtime),
        }
    }

    fn update_active_speakers(&self, generation: u64, speakers: Vec<String>) {
        {
            let mut shared = self.lock();
            if !Self::is_current(&shared, generation) {
                return;
            }
            shared.state.active_speakers = speakers;
        }
        self.publish_active_speakers();
    }

    fn set_device_permission_status(&self, status: DevicePermissionStatus) {
        self.lock().state.device_permission_status = status;
        self.publish_device_permission_status();
    }

    // ---------------------------------------------------------------
    // Devices
    // ---------------------------------------------------------------

    async fn list_and_select_devices(&self) {
        self.update_device_lists().await;

        for kind in [DeviceKind::AudioInput, DeviceKind::AudioOutput, DeviceKind::VideoInput] {
            let candidate = {
                let shared = self.lock();
                if shared.state.selected_device(kind).is_some() {
                    None
                } else {
                    shared.state.devices(kind).first().map(|d| d.device_id.clone())
                }
            };
            if let Some(device_id) = candidate {
                self.apply_device(kind, DeviceSelection::Device(device_id)).await;
            }
        }

        self.publish_devices_updated();
    }

    async fn update_device_lists(&self) {
        let (audio_video, generation) = {
            let shared = self.lock();
            (shared.state.audio_video.clone(), shared.state.generation)
        };

        for kind in [DeviceKind::AudioInput, DeviceKind::VideoInput, DeviceKind::AudioOutput] {
            let devices = match &audio_video {
                Some(audio_video) => list_devices(audio_video.as_ref(), kind)
                    .await
                    .unwrap_or_else(|e| {
                        tracing::warn!("failed to list {kind} devices: {e}");
                        Vec::new()
                    }),
                None => Vec::new(),
            };
            {
                let mut shared = self.lock();
                if shared.state.generation == generation {
                    shared.state.set_devices(kind, devices);
                }
            }
        }
    }

    /// Ask the SDK to apply `selection`; the local field only changes when it
    /// succeeds.
    async fn apply_device(&self, kind: DeviceKind, selection: DeviceSelection) {
        let (audio_video, generation) = {
            let shared = self.lock();
            (shared.state.audio_video.clone(), shared.state.generation)
        };
        let Some(audio_video) = audio_video else {
            tracing::warn!("cannot select {kind} device {selection:?}: no active session");
            return;
        };

        let device_id = selection.into_device_id();
        if let Err(e) = choose_device(audio_video.as_ref(), kind, device_id.clone()).await {
            tracing::error!("error setting {kind} device: {e}");
            return;
        }

        {
            let mut shared = self.lock();
            if shared.state.generation != generation || shared.state.audio_video.is_none() {
                tracing::debug!("session changed while selecting {kind} device; dropping result");
                return;
            }
            shared.state.set_selected_device(kind, device_id);
        }
        self.publish_selected_device(kind);
    }

    // ---------------------------------------------------------------
    // Publishing
    // ---------------------------------------------------------------

    /// Snapshot a value and its listeners under the lock, then fan out
    /// without it.
    fn publish<T>(&self, read: impl FnOnce(&Shared) -> (T, Vec<Listener<T>>)) {
        let (value, listeners) = {
            let shared = self.lock();
            read(&*shared)
        };
        notify(&listeners, &value);
    }

    fn publish_meeting_status(&self) {
        self.publish(|s| (s.state.meeting_status, s.channels.meeting_status.snapshot()));
    }

    fn publish_audio_video(&self) {
        self.publish(|s| (s.state.audio_video.clone(), s.channels.audio_video.snapshot()));
    }

    fn publish_active_speakers(&self) {
        self.publish(|s| (s.state.active_speakers.clone(), s.channels.active_speakers.snapshot()));
    }

    fn publish_device_permission_status(&self) {
        self.publish(|s| {
            (
                s.state.device_permission_status,
                s.channels.device_permission_status.snapshot(),
            )
        });
    }

    fn publish_selected_device(&self, kind: DeviceKind) {
        self.publish(|s| {
            (
                s.state.selected_device(kind).map(str::to_owned),
                s.channels.selected_device(kind).snapshot(),
            )
        });
    }

    fn publish_devices_updated(&self) {
        self.publish(|s| (s.state.full_device_info(), s.channels.devices_updated.snapshot()));
    }
}

/// Settles the phase when `join` exits before finishing: an error, a
/// dropped future or a panicking listener. A half-built session stays
/// `Joined` so `leave` can tear it down.
struct JoinGuard<'a> {
    inner: &'a Inner,
    generation: u64,
}

impl Drop for JoinGuard<'_> {
    fn drop(&mut self) {
        let (pending_stop, runtime) = {
            let mut shared = self.inner.lock();
            if shared.state.generation != self.generation
                || shared.state.phase != SessionPhase::Joining
            {
                return;
            }
            shared.state.phase = if shared.state.audio_video.is_some() {
                SessionPhase::Joined
            } else {
                SessionPhase::Idle
            };
            tracing::warn!("join did not complete; session is now {}", shared.state.phase);
            (
                std::mem::take(&mut shared.state.pending_stop),
                shared.runtime.clone(),
            )
        };
        if pending_stop {
            self.inner.schedule_leave(runtime);
        }
    }
}

/// Registered on each session; routes SDK lifecycle events back to the
/// manager that created it.
struct SessionObserver {
    inner: Weak<Inner>,
    generation: u64,
}

impl AudioVideoObserver for SessionObserver {
    fn audio_video_did_start(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.audio_video_did_start(self.generation);
        }
    }

    fn audio_video_did_stop(&self, status: MeetingSessionStatus) {
        if let Some(inner) = self.inner.upgrade() {
            inner.audio_video_did_stop(self.generation, status);
        }
    }
}

async fn list_devices(
    audio_video: &dyn AudioVideoFacade,
    kind: DeviceKind,
) -> SdkResult<Vec<MediaDeviceInfo>> {
    match kind {
        DeviceKind::AudioInput => audio_video.list_audio_input_devices().await,
        DeviceKind::AudioOutput => audio_video.list_audio_output_devices().await,
        DeviceKind::VideoInput => audio_video.list_video_input_devices().await,
    }
}

async fn choose_device(
    audio_video: &dyn AudioVideoFacade,
    kind: DeviceKind,
    device_id: Option<String>,
) -> SdkResult<()> {
    match kind {
        DeviceKind::AudioInput => audio_video.choose_audio_input_device(device_id).await,
        DeviceKind::AudioOutput => audio_video.choose_audio_output_device(device_id).await,
        DeviceKind::VideoInput => audio_video.choose_video_input_device(device_id).await,
    }
}
