//! Persisted indicator visibility
//!
//! Each indicator has one flag in storage meaning "hidden". A missing flag
//! counts as visible.

use crate::{storage::Storage, Error};

/// Keys of the persisted settings. The same numbers identify the entries of
/// a settings message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum SettingKey {
    Battery = 0,
    Bluetooth = 1,
}

impl SettingKey {
    pub const ALL: [SettingKey; 2] = [SettingKey::Battery, SettingKey::Bluetooth];

    pub const fn key(self) -> u32 {
        self as u32
    }

    pub fn from_key(key: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.key() == key)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

impl Visibility {
    /// "on" shows the indicator, any other value hides it
    pub fn from_toggle(value: &str) -> Self {
        if value == "on" {
            Self::Visible
        } else {
            Self::Hidden
        }
    }

    /// Value sent back to the companion app
    pub fn as_toggle(self) -> &'static str {
        match self {
            Self::Visible => "on",
            Self::Hidden => "off",
        }
    }

    pub fn is_hidden(self) -> bool {
        self == Self::Hidden
    }
}

/// Current visibility of both indicators
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplaySettings {
    pub show_battery: bool,
    pub show_bluetooth: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_battery: true,
            show_bluetooth: true,
        }
    }
}

/// Typed access to the visibility flags in a [`Storage`]
pub struct SettingsStore<S> {
    storage: S,
}

impl<S> SettingsStore<S>
where
    S: Storage,
{
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Persist "visible" for `key` unless a value was stored before.
    pub fn ensure_default(&mut self, key: SettingKey) {
        if self.storage.exists(key.key()) {
            return;
        }
        debug!("Storing default visibility for {}", key);
        if let Err(e) = self.storage.write_bool(key.key(), false) {
            warn!("Could not store default for {}: {}", key, e);
        }
    }

    /// Persisted visibility of `key`. Read failures count as visible.
    pub fn visibility(&self, key: SettingKey) -> Visibility {
        match self.storage.read_bool(key.key()) {
            Ok(Some(true)) => Visibility::Hidden,
            Ok(_) => Visibility::Visible,
            Err(e) => {
                warn!("Could not read {}: {}", key, e);
                Visibility::Visible
            }
        }
    }

    pub fn apply(&mut self, key: SettingKey, visibility: Visibility) -> Result<(), Error> {
        info!("Setting {} to {}", key, visibility);
        self.storage.write_bool(key.key(), visibility.is_hidden())
    }

    pub fn display_settings(&self) -> DisplaySettings {
        DisplaySettings {
            show_battery: !self.visibility(SettingKey::Battery).is_hidden(),
            show_bluetooth: !self.visibility(SettingKey::Bluetooth).is_hidden(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{storage::MemoryStorage, testing::FailingStorage};

    #[test]
    fn keys_match_wire_numbers() {
        assert_eq!(SettingKey::Battery.key(), 0);
        assert_eq!(SettingKey::Bluetooth.key(), 1);
        assert_eq!(SettingKey::from_key(1), Some(SettingKey::Bluetooth));
        assert_eq!(SettingKey::from_key(2), None);
    }

    #[test]
    fn toggle_values() {
        assert_eq!(Visibility::from_toggle("on"), Visibility::Visible);
        assert_eq!(Visibility::from_toggle("off"), Visibility::Hidden);
        assert_eq!(Visibility::from_toggle("ON"), Visibility::Hidden);
        assert_eq!(Visibility::from_toggle(""), Visibility::Hidden);
    }

    #[test]
    fn absent_flag_is_visible() {
        let store = SettingsStore::new(MemoryStorage::new());
        assert_eq!(store.visibility(SettingKey::Battery), Visibility::Visible);
        assert_eq!(store.display_settings(), DisplaySettings::default());
    }

    #[test]
    fn default_is_written_once() {
        let mut store = SettingsStore::new(MemoryStorage::new());
        store.ensure_default(SettingKey::Battery);
        assert_eq!(store.storage().read_bool(0), Ok(Some(false)));

        store.apply(SettingKey::Battery, Visibility::Hidden).unwrap();
        store.ensure_default(SettingKey::Battery);
        assert_eq!(store.visibility(SettingKey::Battery), Visibility::Hidden);
    }

    #[test]
    fn applying_is_idempotent() {
        let mut store = SettingsStore::new(MemoryStorage::new());
        for _ in 0..2 {
            store.apply(SettingKey::Bluetooth, Visibility::Hidden).unwrap();
            assert_eq!(store.visibility(SettingKey::Bluetooth), Visibility::Hidden);
        }
        store.apply(SettingKey::Bluetooth, Visibility::Visible).unwrap();
        assert_eq!(
            store.display_settings(),
            DisplaySettings {
                show_battery: true,
                show_bluetooth: true
            }
        );
    }

    #[test]
    fn read_failure_counts_as_visible() {
        let mut store = SettingsStore::new(FailingStorage);
        assert_eq!(store.visibility(SettingKey::Battery), Visibility::Visible);
        assert_eq!(
            store.apply(SettingKey::Battery, Visibility::Hidden),
            Err(Error::StorageWrite)
        );
        // Must not panic
        store.ensure_default(SettingKey::Bluetooth);
    }
}
