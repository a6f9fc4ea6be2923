//! Account credentials and device registration data
//!
//! Logging in happens in the user's browser. After login the Ridibooks
//! account service shows the registered devices as JSON, which the user pastes
//! back. The chosen device's id is the key material for every book's sidecar.

pub mod devices;

pub use devices::{format_last_used, login_url, parse_device_list, UserDevice, UserDevices};

use serde::{Deserialize, Serialize};

/// Device credential used to unlock sidecars
///
/// Passed explicitly through every pipeline call. The device id is not
/// validated here; a short id simply fails to decrypt later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Ridibooks user index
    pub account_id: String,

    /// Registered reader device id
    pub device_id: String,
}

impl Credential {
    pub fn new(account_id: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            device_id: device_id.into(),
        }
    }
}
