//! Battery charge state and its text representation
//!
//! Voltage conversion based upon https://github.com/dbrgn/pinetime-rtic/blob/master/pinetime-rtic/src/battery.rs
//! and https://wiki.pine64.org/wiki/PineTime.

use core::fmt::Write;

use heapless::String;

use crate::Error;

/// Capacity of the battery text, "100"
pub const PERCENT_LEN: usize = 3;

pub type PercentText = String<PERCENT_LEN>;

/// Snapshot of the battery
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargeState {
    /// Remaining charge in percent (0–100)
    pub percent: u8,
    /// Battery is being charged
    pub charging: bool,
    /// External power is connected
    pub plugged: bool,
}

/// Source of battery state changes
pub trait BatteryMonitor {
    /// Current battery state, without waiting for a change
    fn peek(&self) -> ChargeState;

    /// Start delivering battery change events
    fn subscribe(&mut self);

    /// Stop delivering battery change events
    fn unsubscribe(&mut self);
}

/// Format the charge as a plain decimal number
pub fn format_percent(percent: u8) -> PercentText {
    let mut text = PercentText::new();
    let _ = write!(text, "{}", percent.min(100));
    text
}

/// Convert a 12 bit SAADC sample of the battery divider into millivolts.
pub fn millivolts_from_adc(sample: i16) -> Result<u16, Error> {
    match sample {
        0..=4095 => {
            // The divider halves the voltage, the reference is 3.3 V: 2 * 1000 * 3.3 / 4096.
            // Keep 32 bit during the multiplication to prevent overflow.
            Ok((sample as u32 * 2000 / 1241) as u16)
        }
        _ => Err(Error::InvalidMeasurement),
    }
}

/// Estimate the remaining capacity from the battery voltage.
pub fn percent_from_millivolts(voltage: u16) -> u8 {
    // Fixed data points with linear interpolation in between
    (match voltage {
        0..=3449 => 0,
        3450..=3699 => (voltage - 3450) / 5,
        3700..=4199 => 50 + (voltage - 3700) / 10,
        _ => 100,
    }) as u8
}
