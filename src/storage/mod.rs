//! Local persistence
//!
//! Stores registered accounts and which one is active. Nothing else about a
//! run is persisted; book records are rediscovered every time.

pub mod config;

pub use config::{ConfigData, ConfigStore, UserData};
