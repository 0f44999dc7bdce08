//! Battery status check
//!
//! Pinout from https://wiki.pine64.org/wiki/PineTime.

use core::{
    cell::Cell,
    sync::atomic::{AtomicBool, Ordering},
};

use embassy_nrf::{
    gpio::Input,
    peripherals::{P0_12, P0_19},
    saadc::Saadc,
};
use embassy_sync::blocking_mutex::{raw::ThreadModeRawMutex, Mutex};
use pinetime_watchface::{
    battery::{millivolts_from_adc, percent_from_millivolts},
    BatteryMonitor, ChargeState, Error,
};

/// Latest measured state, shared with the watchface
static STATE: Mutex<ThreadModeRawMutex, Cell<ChargeState>> =
    Mutex::new(Cell::new(ChargeState {
        percent: 0,
        charging: false,
        plugged: false,
    }));
static SUBSCRIBED: AtomicBool = AtomicBool::new(false);

/// Battery configuration
struct BatteryConfig<'a> {
    /// ADC instance for battery voltage measurement
    adc: Saadc<'a, 1>,
    /// Charge indication pin:
    /// high = battery, low = charging
    pin_charge_indication: Input<'a, P0_12>,
    /// Power presence pin:
    /// high = battery, low = plugged in
    pin_power_presence: Input<'a, P0_19>,
}

/// Battery API
pub struct Battery {
    /// Battery configuration
    config: BatteryConfig<'static>,
}

impl Battery {
    /// Configure battery settings on boot
    pub fn init(
        adc: Saadc<'static, 1>,
        charge_pin: Input<'static, P0_12>,
        power_pin: Input<'static, P0_19>,
    ) -> Self {
        Self {
            config: BatteryConfig {
                adc,
                pin_charge_indication: charge_pin,
                pin_power_presence: power_pin,
            },
        }
    }

    /// Carging state of the battery
    pub fn is_charging(&self) -> bool {
        self.config.pin_charge_indication.is_low()
    }

    /// Whether external power is connected
    pub fn is_plugged(&self) -> bool {
        self.config.pin_power_presence.is_low()
    }

    /// Measure the battery and publish the result.
    ///
    /// Returns the new state when it differs from the previous one.
    pub async fn update(&mut self) -> Result<Option<ChargeState>, Error> {
        let voltage = self.get_voltage().await?;
        let state = ChargeState {
            percent: percent_from_millivolts(voltage),
            charging: self.is_charging(),
            plugged: self.is_plugged(),
        };
        let previous = STATE.lock(|cell| cell.replace(state));
        Ok((previous != state).then_some(state))
    }

    /// Battery voltage in millivolts
    async fn get_voltage(&mut self) -> Result<u16, Error> {
        let mut buf = [0; 1];
        self.config.adc.sample(&mut buf).await;
        millivolts_from_adc(buf[0])
    }
}

/// Whether the watchface asked for battery change events
pub fn is_subscribed() -> bool {
    SUBSCRIBED.load(Ordering::Relaxed)
}

/// Battery state provider for the watchface
pub struct BatteryState;

impl BatteryMonitor for BatteryState {
    fn peek(&self) -> ChargeState {
        STATE.lock(Cell::get)
    }

    fn subscribe(&mut self) {
        SUBSCRIBED.store(true, Ordering::Relaxed);
    }

    fn unsubscribe(&mut self) {
        SUBSCRIBED.store(false, Ordering::Relaxed);
    }
}
