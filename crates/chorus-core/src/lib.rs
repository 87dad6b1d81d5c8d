//! Chorus core: session state for a conferencing SDK.
//!
//! Wraps one meeting session at a time and republishes its state (status,
//! devices, permission, active speakers) to UI code through per-field
//! subscriptions. The SDK itself sits behind the traits in [`sdk`].

pub mod devices;
pub mod errors;
pub mod join_info;
pub mod logging;
pub mod manager;
pub mod observers;
pub mod sdk;
pub mod settings;
pub mod state;

#[cfg(test)]
mod testing;

pub use devices::{DeviceKind, DeviceSelection, FullDeviceInfo, MediaDeviceInfo, NO_DEVICE};
pub use errors::{SdkError, SessionError};
pub use join_info::{AttendeeInfo, MeetingInfo, SessionConfiguration};
pub use logging::{LogLevel, SdkLogger, init_logging};
pub use manager::MeetingManager;
pub use observers::SubscriptionId;
pub use settings::{ManagerSettings, SettingsStore};
pub use state::{DevicePermissionStatus, MeetingStatus, SessionPhase};
