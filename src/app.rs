//! Watchface coordinator
//!
//! Owns the window and the persisted settings and reacts to host events.
//! Events are handled one at a time; every handler runs to completion
//! before the next one is delivered.

use chrono::NaiveDateTime;
use embedded_graphics::{pixelcolor::Rgb565, prelude::*};

use crate::{
    battery::{format_percent, BatteryMonitor, ChargeState},
    bluetooth::{indicator_visible, BluetoothMonitor},
    clock::{Clock, ClockFormat, ClockState, Locale, TickUnits},
    message::{
        encode_settings, Dictionary, DropReason, Payload, SettingsChannel, SettingsMessage,
        MAX_MESSAGE_LEN,
    },
    settings::{DisplaySettings, SettingKey, SettingsStore, Visibility},
    storage::Storage,
    ui::Window,
    Error,
};

/// Ticks the watchface asks for
pub const TICK_UNITS: TickUnits = TickUnits::MINUTE.union(TickUnits::DAY);

/// Host events delivered to the watchface
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// One of the subscribed time units changed
    Tick {
        time: NaiveDateTime,
        units: TickUnits,
    },
    BatteryChanged(ChargeState),
    BluetoothChanged(bool),
    /// Raw dictionary received over the settings channel
    MessageReceived(Payload),
    MessageDropped(DropReason),
}

/// The watchface application state
pub struct Watchface<C, B, T, K, S> {
    clock: C,
    battery: B,
    bluetooth: T,
    channel: K,
    settings: SettingsStore<S>,
    locale: Locale,
    window: Window,
}

impl<C, B, T, K, S> Watchface<C, B, T, K, S>
where
    C: Clock,
    B: BatteryMonitor,
    T: BluetoothMonitor,
    K: SettingsChannel,
    S: Storage,
{
    pub fn new(clock: C, battery: B, bluetooth: T, channel: K, storage: S, locale: Locale) -> Self {
        Self {
            clock,
            battery,
            bluetooth,
            channel,
            settings: SettingsStore::new(storage),
            locale,
            window: Window::new(Rgb565::BLACK),
        }
    }

    /// Show the window, open the settings channel and subscribe to events.
    ///
    /// Fails if the window resources cannot be loaded or the channel cannot
    /// be opened; the watchface cannot run in either case and nothing is left
    /// loaded or open.
    pub fn init(&mut self) -> Result<(), Error> {
        self.load()?;
        if let Err(e) = self.channel.open(MAX_MESSAGE_LEN, MAX_MESSAGE_LEN) {
            self.unload();
            return Err(e);
        }

        self.clock.subscribe(TICK_UNITS);
        self.battery.subscribe();
        self.bluetooth.subscribe();

        self.send_settings();
        info!("Watchface started");
        Ok(())
    }

    /// Unsubscribe from all events, unload the window and close the channel
    pub fn deinit(&mut self) {
        self.clock.unsubscribe();
        self.battery.unsubscribe();
        self.bluetooth.unsubscribe();
        self.unload();
        self.channel.close();
        info!("Watchface stopped");
    }

    /// Create the window content and refresh every region once
    pub fn load(&mut self) -> Result<(), Error> {
        self.window.load()?;

        let now = self.clock.now();
        self.update_clock(&now);
        self.on_battery(self.battery.peek());
        self.on_bluetooth(self.bluetooth.peek());
        Ok(())
    }

    /// Release the window content
    pub fn unload(&mut self) {
        self.window.unload();
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::Tick { time, units } => self.on_tick(&time, units),
            Event::BatteryChanged(state) => self.on_battery(state),
            Event::BluetoothChanged(connected) => self.on_bluetooth(connected),
            Event::MessageReceived(payload) => self.on_message(&payload),
            Event::MessageDropped(reason) => self.on_message_dropped(reason),
        }
    }

    pub fn on_tick(&mut self, time: &NaiveDateTime, units: TickUnits) {
        debug!("Tick {}", units);
        self.update_clock(time);
    }

    pub fn on_battery(&mut self, state: ChargeState) {
        self.settings.ensure_default(SettingKey::Battery);
        let hidden = self.settings.visibility(SettingKey::Battery).is_hidden();

        if let Some(layers) = self.window.layers_mut() {
            layers.battery.set_text(&format_percent(state.percent));
            layers.battery.set_hidden(hidden);
        }
    }

    pub fn on_bluetooth(&mut self, connected: bool) {
        self.settings.ensure_default(SettingKey::Bluetooth);
        let hidden = self.settings.visibility(SettingKey::Bluetooth).is_hidden();

        if let Some(layers) = self.window.layers_mut() {
            layers
                .bluetooth
                .set_hidden(!indicator_visible(connected, hidden));
        }
    }

    /// Apply a settings dictionary from the companion app
    pub fn on_message(&mut self, payload: &[u8]) {
        let dict = match Dictionary::parse(payload) {
            Ok(dict) => dict,
            Err(_) => return self.on_message_dropped(DropReason::Malformed),
        };
        let message = SettingsMessage::from_dictionary(&dict);

        if let Some(visibility) = message.battery {
            self.store(SettingKey::Battery, visibility);
            self.on_battery(self.battery.peek());
        }
        if let Some(visibility) = message.bluetooth {
            self.store(SettingKey::Bluetooth, visibility);
            self.on_bluetooth(self.bluetooth.peek());
        }

        if !message.is_empty() {
            self.send_settings();
        }
    }

    pub fn on_message_dropped(&mut self, reason: DropReason) {
        error!("Message dropped: {}", reason);
    }

    pub fn display_settings(&self) -> DisplaySettings {
        self.settings.display_settings()
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn needs_redraw(&self) -> bool {
        self.window.needs_redraw()
    }

    pub fn draw<D>(&mut self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        self.window.draw(target)
    }

    pub fn storage(&self) -> &S {
        self.settings.storage()
    }

    fn store(&mut self, key: SettingKey, visibility: Visibility) {
        if let Err(e) = self.settings.apply(key, visibility) {
            error!("Could not persist {}: {}", key, e);
        }
    }

    /// Set the time, day and month texts
    fn update_clock(&mut self, now: &NaiveDateTime) {
        let format = ClockFormat::from_24h_style(self.clock.is_24h_style());
        let state = ClockState::new(now, format, self.locale);
        if let Some(layers) = self.window.layers_mut() {
            layers.time.set_text(&state.time);
            layers.day.set_text(&state.day);
            layers.month.set_text(&state.month);
        }
    }

    /// Report the current settings to the companion app
    fn send_settings(&mut self) {
        let result = encode_settings(&self.settings.display_settings())
            .and_then(|payload| self.channel.send(&payload));
        if let Err(e) = result {
            warn!("Could not send settings: {}", e);
        }
    }
}
