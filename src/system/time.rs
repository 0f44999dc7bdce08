//! Time keeping module for PineTime

use chrono::{DateTime, NaiveDateTime};
use embassy_sync::{blocking_mutex::raw::ThreadModeRawMutex, signal::Signal};
use embassy_time::Instant;
use pinetime_watchface::{Clock, Config, TickUnits};

/// Units the tick task reports on, `TickUnits::NONE` when unsubscribed
pub static TICK_UNITS: Signal<ThreadModeRawMutex, TickUnits> = Signal::new();

#[derive(Clone, Copy)]
pub struct TimeReference {
    /// UTC seconds since the Unix epoch
    epoch: i64,
    /// Related system time
    instant: Instant,
}

impl TimeReference {
    /// Anchor `epoch` to the current system time
    pub fn from_epoch(epoch: i64) -> Self {
        Self {
            epoch,
            instant: Instant::now(),
        }
    }
}

/// Local wall clock derived from a time reference and the system timer
#[derive(Clone, Copy)]
pub struct WatchClock {
    reference: TimeReference,
    utc_offset: i32,
    is_24h: bool,
}

impl WatchClock {
    pub fn new(reference: TimeReference, config: &Config) -> Self {
        Self {
            reference,
            utc_offset: config.utc_offset,
            is_24h: config.is_24h_style(),
        }
    }

    /// Get current local time
    pub fn local_time(&self) -> NaiveDateTime {
        let elapsed = Instant::now().duration_since(self.reference.instant);
        let local = self.reference.epoch + self.utc_offset as i64;
        DateTime::from_timestamp_micros(local * 1_000_000 + elapsed.as_micros() as i64)
            .map(|time| time.naive_utc())
            .unwrap_or_default()
    }
}

impl Clock for WatchClock {
    fn now(&self) -> NaiveDateTime {
        self.local_time()
    }

    fn is_24h_style(&self) -> bool {
        self.is_24h
    }

    fn subscribe(&mut self, units: TickUnits) {
        TICK_UNITS.signal(units);
    }

    fn unsubscribe(&mut self) {
        TICK_UNITS.signal(TickUnits::NONE);
    }
}
