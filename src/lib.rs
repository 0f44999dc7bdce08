//! Minimal watchface for the PineTime
//!
//! Shows the time, day and month, the battery charge and a Bluetooth
//! indicator. The two indicators can be hidden from a companion app over the
//! settings channel; the choice is persisted.
//!
//! Everything in this library is hardware independent. The firmware binary
//! (feature `firmware`) provides the clock, battery, Bluetooth, storage and
//! settings-channel capabilities and feeds events to [`Watchface`].

#![cfg_attr(not(test), no_std)]

// This must go first so the log macros are visible in every module
mod fmt;

pub mod app;
pub mod battery;
pub mod bluetooth;
pub mod clock;
pub mod config;
pub mod error;
pub mod message;
pub mod settings;
pub mod storage;
pub mod ui;

#[cfg(test)]
mod testing;

pub use app::{Event, Watchface};
pub use battery::{BatteryMonitor, ChargeState};
pub use bluetooth::BluetoothMonitor;
pub use clock::{Clock, ClockFormat, Locale, TickUnits};
pub use config::Config;
pub use error::Error;
pub use message::{DropReason, Payload, SettingsChannel};
pub use settings::{DisplaySettings, SettingKey, Visibility};
pub use storage::{MemoryStorage, RecordSink, Storage, WriteBehind};
