// RidiSync - Ridibooks Library Export
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Device list returned after browser login
//!
//! # Login Flow
//! 1. Open [`login_url`] in a browser; the `state` parameter tells the login
//!    page to redirect to the user-devices endpoint afterwards.
//! 2. The endpoint renders JSON like:
//!    ```json
//!    {"user_devices": [{"user_idx": 123, "device_id": "...", "device_nick": "PC", ...}]}
//!    ```
//! 3. The user pastes it back; [`parse_device_list`] turns it into
//!    [`UserDevice`] entries.
//!
//! No HTTP is performed by this crate.

use crate::error::{Result, RidiError};
use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

pub const RIDI_LOGIN_URL: &str = "https://ridibooks.com/account/login";
pub const RIDI_USER_DEVICES_API: &str = "https://account.ridibooks.com/api/user-devices/app";

/// One registered reader device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDevice {
    #[serde(default)]
    pub id: Option<i64>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub user_idx: Option<String>,

    #[serde(default)]
    pub device_id: Option<String>,

    #[serde(default)]
    pub device_code: Option<String>,

    #[serde(default)]
    pub device_ver: Option<String>,

    #[serde(default)]
    pub device_nick: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub last_used: Option<String>,

    #[serde(default)]
    pub created: Option<String>,

    #[serde(default)]
    pub last_modified: Option<String>,
}

impl UserDevice {
    /// Display name, `Unknown` when the device has no nickname
    pub fn display_name(&self) -> &str {
        self.device_nick.as_deref().unwrap_or("Unknown")
    }
}

/// Top-level device list response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDevices {
    #[serde(default)]
    pub user_devices: Vec<UserDevice>,
}

/// `user_idx` arrives as a number but is stored as a string
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Browser URL that logs in and then shows the device list
pub fn login_url() -> String {
    let state = serde_json::json!({ "return_url": RIDI_USER_DEVICES_API }).to_string();
    format!("{}?state={}", RIDI_LOGIN_URL, urlencoding::encode(&state))
}

/// Parse pasted device-list JSON
///
/// Anything before the first `{` is ignored, so stray text copied along with
/// the JSON does not matter.
///
/// # Errors
/// - `InvalidInput` - empty input, invalid JSON, or no devices listed
pub fn parse_device_list(input: &str) -> Result<Vec<UserDevice>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(RidiError::InvalidInput("No data entered".into()));
    }

    let json = match trimmed.find('{') {
        Some(start) => &trimmed[start..],
        None => trimmed,
    };

    let devices: UserDevices = serde_json::from_str(json).map_err(|e| {
        RidiError::InvalidInput(format!(
            "Invalid JSON format. Please ensure you copied the text correctly: {}",
            e
        ))
    })?;

    if devices.user_devices.is_empty() {
        return Err(RidiError::InvalidInput(
            "No devices found in the provided JSON".into(),
        ));
    }

    Ok(devices.user_devices)
}

/// Render a device's `last_used` timestamp in local time
///
/// Returns `N/A` when absent and the raw value when it cannot be parsed.
pub fn format_last_used(raw: Option<&str>) -> String {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return "N/A".to_string();
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string();
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive.format("%Y-%m-%d %H:%M:%S").to_string();
    }

    raw.to_string()
}
