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


//! Persisted accounts
//!
//! # File Format
//! ```json
//! {
//!   "users": [
//!     {"id": "4242_a1b2c3d4", "user_idx": "4242", "device_id": "a1b2c3d4-...", "device_name": "Desk"}
//!   ],
//!   "active_user": "4242_a1b2c3d4"
//! }
//! ```
//!
//! A missing or unreadable file loads as an empty configuration.

use crate::auth::Credential;
use crate::error::{Result, RidiError};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = ".ridi_auth.json";

const UNKNOWN_DEVICE: &str = "Unknown Device";

/// One stored user/device pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    /// `<user_idx>_<first 8 chars of device_id>`
    pub id: String,
    pub user_idx: String,
    pub device_id: String,
    #[serde(default)]
    pub device_name: Option<String>,
}

impl UserData {
    pub fn make_id(user_idx: &str, device_id: &str) -> String {
        let prefix: String = device_id.chars().take(8).collect();
        format!("{}_{}", user_idx, prefix)
    }

    /// Credential to pass through the export pipeline
    pub fn credential(&self) -> Credential {
        Credential::new(self.user_idx.clone(), self.device_id.clone())
    }
}

/// Persisted configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigData {
    #[serde(default)]
    pub users: Vec<UserData>,
    #[serde(default)]
    pub active_user: Option<String>,
}

/// Account store backed by a JSON file
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    pub config: ConfigData,
}

impl ConfigStore {
    /// `~/.ridi_auth.json`
    pub fn default_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(CONFIG_FILE_NAME))
            .ok_or_else(|| RidiError::Config("home directory not found".into()))
    }

    /// Load from `path`; missing or corrupt files give an empty store
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let config = Self::read(&path).unwrap_or_else(|e| {
            warn!("Ignoring unreadable config {}: {}", path.display(), e);
            ConfigData::default()
        });
        Self { path, config }
    }

    fn read(path: &Path) -> Result<ConfigData> {
        if !path.exists() {
            return Ok(ConfigData::default());
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the configuration, creating parent directories
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| RidiError::Config(format!("Failed to save config: {}", e)))?;
        }
        let json = serde_json::to_string_pretty(&self.config)?;
        fs::write(&self.path, json)
            .map_err(|e| RidiError::Config(format!("Failed to save config: {}", e)))?;
        debug!("Saved config to {}", self.path.display());
        Ok(())
    }

    /// Add or update a user and make it active
    pub fn add_user(&mut self, user_idx: &str, device_id: &str, device_name: Option<&str>) -> Result<()> {
        let id = UserData::make_id(user_idx, device_id);
        let device_name = Some(device_name.unwrap_or(UNKNOWN_DEVICE).to_string());

        match self
            .config
            .users
            .iter()
            .position(|u| u.user_idx == user_idx && u.device_id == device_id)
        {
            Some(index) => self.config.users[index].device_name = device_name,
            None => self.config.users.push(UserData {
                id: id.clone(),
                user_idx: user_idx.to_string(),
                device_id: device_id.to_string(),
                device_name,
            }),
        }

        self.config.active_user = Some(id);
        self.save()
    }

    pub fn active_user(&self) -> Option<&UserData> {
        let active = self.config.active_user.as_deref()?;
        self.config.users.iter().find(|u| u.id == active)
    }

    /// Make `user_id` active; `false` if no such user
    pub fn switch_user(&mut self, user_id: &str) -> Result<bool> {
        if !self.config.users.iter().any(|u| u.id == user_id) {
            return Ok(false);
        }
        self.config.active_user = Some(user_id.to_string());
        self.save()?;
        Ok(true)
    }

    /// Remove `user_id`; the first remaining user becomes active if needed
    pub fn remove_user(&mut self, user_id: &str) -> Result<bool> {
        let before = self.config.users.len();
        self.config.users.retain(|u| u.id != user_id);
        if self.config.users.len() == before {
            return Ok(false);
        }

        if self.config.active_user.as_deref() == Some(user_id) {
            self.config.active_user = self.config.users.first().map(|u| u.id.clone());
        }
        self.save()?;
        Ok(true)
    }

    pub fn list_users(&self) -> &[UserData] {
        &self.config.users
    }
}
