//! Host lifecycle events.
//!
//! The core does not subscribe to platform notifications. Hosts forward
//! them to [`PasswordManager::handle_lifecycle_event`](crate::PasswordManager::handle_lifecycle_event),
//! or call `purge()` directly.

use serde::{Deserialize, Serialize};

/// Application or device state change reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// The application moved to the background.
    DidEnterBackground,
    /// The application is returning to the foreground.
    WillEnterForeground,
    /// Protected data became unavailable (device locked).
    DeviceLocked,
    /// Protected data became available again.
    DeviceUnlocked,
}

impl LifecycleEvent {
    /// Whether cached secrets must be dropped on this event.
    pub fn should_purge(&self) -> bool {
        matches!(self, Self::DidEnterBackground | Self::DeviceLocked)
    }
}
