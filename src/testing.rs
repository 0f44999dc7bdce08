//! Fakes for the host capabilities and a frame buffer to draw into

use std::{
    cell::{Ref, RefCell, RefMut},
    convert::Infallible,
    rc::Rc,
    vec::Vec,
};

use chrono::{NaiveDate, NaiveDateTime};
use embedded_graphics::{pixelcolor::Rgb565, prelude::*, primitives::Rectangle};

use crate::{
    battery::{BatteryMonitor, ChargeState},
    bluetooth::BluetoothMonitor,
    clock::{Clock, TickUnits},
    message::SettingsChannel,
    storage::{record::Record, RecordSink, Storage},
    ui::{LCD_H, LCD_W},
    Error,
};

pub fn datetime(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, min, sec))
        .unwrap()
}

/// Observable state behind [`FakeHost`]
pub struct HostState {
    pub now: NaiveDateTime,
    pub is_24h: bool,
    pub tick_units: Option<TickUnits>,
    pub charge: ChargeState,
    pub battery_subscribed: bool,
    pub connected: bool,
    pub bluetooth_subscribed: bool,
    pub channel_open: bool,
    pub fail_open: bool,
    pub fail_send: bool,
    pub sent: Vec<Vec<u8>>,
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            now: datetime(2024, 6, 3, 9, 5, 0),
            is_24h: true,
            tick_units: None,
            charge: ChargeState::default(),
            battery_subscribed: false,
            connected: false,
            bluetooth_subscribed: false,
            channel_open: false,
            fail_open: false,
            fail_send: false,
            sent: Vec::new(),
        }
    }
}

/// Plays every host capability; clones share one state
#[derive(Clone, Default)]
pub struct FakeHost(Rc<RefCell<HostState>>);

impl FakeHost {
    pub fn state(&self) -> Ref<'_, HostState> {
        self.0.borrow()
    }

    pub fn state_mut(&self) -> RefMut<'_, HostState> {
        self.0.borrow_mut()
    }

    pub fn set_now(&self, now: NaiveDateTime) {
        self.state_mut().now = now;
    }

    pub fn set_charge(&self, percent: u8) {
        self.state_mut().charge.percent = percent;
    }

    pub fn set_connected(&self, connected: bool) {
        self.state_mut().connected = connected;
    }
}

impl Clock for FakeHost {
    fn now(&self) -> NaiveDateTime {
        self.state().now
    }

    fn is_24h_style(&self) -> bool {
        self.state().is_24h
    }

    fn subscribe(&mut self, units: TickUnits) {
        self.state_mut().tick_units = Some(units);
    }

    fn unsubscribe(&mut self) {
        self.state_mut().tick_units = None;
    }
}

impl BatteryMonitor for FakeHost {
    fn peek(&self) -> ChargeState {
        self.state().charge
    }

    fn subscribe(&mut self) {
        self.state_mut().battery_subscribed = true;
    }

    fn unsubscribe(&mut self) {
        self.state_mut().battery_subscribed = false;
    }
}

impl BluetoothMonitor for FakeHost {
    fn peek(&self) -> bool {
        self.state().connected
    }

    fn subscribe(&mut self) {
        self.state_mut().bluetooth_subscribed = true;
    }

    fn unsubscribe(&mut self) {
        self.state_mut().bluetooth_subscribed = false;
    }
}

impl SettingsChannel for FakeHost {
    fn open(&mut self, _inbox_size: usize, _outbox_size: usize) -> Result<(), Error> {
        let mut state = self.state_mut();
        if state.fail_open {
            return Err(Error::ChannelOpen);
        }
        state.channel_open = true;
        Ok(())
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), Error> {
        let mut state = self.state_mut();
        if state.fail_send || !state.channel_open {
            return Err(Error::ChannelSend);
        }
        state.sent.push(payload.to_vec());
        Ok(())
    }

    fn close(&mut self) {
        self.state_mut().channel_open = false;
    }
}

/// Storage whose every access fails
pub struct FailingStorage;

impl Storage for FailingStorage {
    fn exists(&self, _key: u32) -> bool {
        false
    }

    fn read_bool(&self, _key: u32) -> Result<Option<bool>, Error> {
        Err(Error::StorageRead)
    }

    fn write_bool(&mut self, _key: u32, _value: bool) -> Result<(), Error> {
        Err(Error::StorageWrite)
    }

    fn delete(&mut self, _key: u32) -> Result<(), Error> {
        Err(Error::StorageWrite)
    }
}

/// Bounded record queue that refuses records once `capacity` is reached
#[derive(Debug, Default)]
pub struct RecordQueue {
    pub records: Vec<Record>,
    pub capacity: usize,
}

impl RecordQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Vec::new(),
            capacity,
        }
    }
}

impl RecordSink for RecordQueue {
    fn push(&mut self, record: Record) -> Result<(), Error> {
        if self.records.len() >= self.capacity {
            return Err(Error::StorageWrite);
        }
        self.records.push(record);
        Ok(())
    }
}

/// Display sized frame buffer
pub struct FrameBuffer {
    pixels: Vec<Rgb565>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            pixels: vec![Rgb565::BLACK; (LCD_W * LCD_H) as usize],
        }
    }

    /// Number of pixels that are not black
    pub fn lit(&self) -> usize {
        self.pixels.iter().filter(|p| **p != Rgb565::BLACK).count()
    }

    /// Number of pixels inside `area` that are not black
    pub fn lit_in(&self, area: Rectangle) -> usize {
        area.points()
            .filter(|p| self.bounding_box().contains(*p))
            .filter(|p| self.pixels[p.y as usize * LCD_W as usize + p.x as usize] != Rgb565::BLACK)
            .count()
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(LCD_W, LCD_H)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if self.bounding_box().contains(point) {
                self.pixels[point.y as usize * LCD_W as usize + point.x as usize] = color;
            }
        }
        Ok(())
    }
}
