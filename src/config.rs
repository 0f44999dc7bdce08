//! Watchface configuration
//!
//! The firmware bakes the values in at build time (see `build.rs`); parsing
//! never fails, bad values fall back to the defaults.

use crate::clock::{ClockFormat, Locale};

/// Largest accepted distance from UTC, in seconds
const MAX_UTC_OFFSET: i32 = 14 * 3_600;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub clock_format: ClockFormat,
    pub locale: Locale,
    /// Local time offset from UTC in seconds
    pub utc_offset: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            clock_format: ClockFormat::TwentyFourHour,
            locale: Locale::EnUs,
            utc_offset: 3_600,
        }
    }
}

impl Config {
    /// Build the configuration from its string form
    pub fn from_build(clock_24h: &str, locale: &str, utc_offset: &str) -> Self {
        let defaults = Self::default();

        let clock_format = match clock_24h.trim() {
            "true" | "1" | "yes" => ClockFormat::TwentyFourHour,
            "false" | "0" | "no" => ClockFormat::TwelveHour,
            _ => {
                warn!("Invalid clock style, using default");
                defaults.clock_format
            }
        };

        let utc_offset = match utc_offset.trim().parse::<i32>() {
            Ok(offset) if offset.abs() <= MAX_UTC_OFFSET => offset,
            _ => {
                warn!("Invalid UTC offset, using default");
                defaults.utc_offset
            }
        };

        Self {
            clock_format,
            locale: Locale::from_tag(locale.trim()),
            utc_offset,
        }
    }

    pub fn is_24h_style(&self) -> bool {
        self.clock_format == ClockFormat::TwentyFourHour
    }
}
