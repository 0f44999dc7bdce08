//! Fonts and bitmaps used by the watchface

use embedded_graphics::mono_font::{
    iso_8859_1::{FONT_10X20, FONT_6X10},
    MonoFont,
};
use profont::PROFONT_24_POINT;

use super::layer::IconBitmap;
use crate::Error;

pub const BLUETOOTH_ICON_SIZE: u32 = 14;

/// Bluetooth rune, 14 × 14 pixels, two bytes per row
#[rustfmt::skip]
static BLUETOOTH_ICON: [u8; 28] = [
    0b0000_0010, 0b0000_0000,
    0b0000_0011, 0b0000_0000,
    0b0000_0010, 0b1000_0000,
    0b0010_0010, 0b0100_0000,
    0b0001_0010, 0b1000_0000,
    0b0000_1011, 0b0000_0000,
    0b0000_0110, 0b0000_0000,
    0b0000_0110, 0b0000_0000,
    0b0000_1011, 0b0000_0000,
    0b0001_0010, 0b1000_0000,
    0b0010_0010, 0b0100_0000,
    0b0000_0010, 0b1000_0000,
    0b0000_0011, 0b0000_0000,
    0b0000_0010, 0b0000_0000,
];

/// Resources loaded for the lifetime of the window
pub struct Resources {
    /// Large font for the time
    pub time_font: &'static MonoFont<'static>,
    /// Day and month font, covers accented characters
    pub small_font: &'static MonoFont<'static>,
    /// Battery percentage font
    pub tiny_font: &'static MonoFont<'static>,
    pub bluetooth: IconBitmap,
}

impl Resources {
    pub fn load() -> Result<Self, Error> {
        debug!("Loading resources");
        Ok(Self {
            time_font: &PROFONT_24_POINT,
            small_font: &FONT_10X20,
            tiny_font: &FONT_6X10,
            bluetooth: IconBitmap::load(
                &BLUETOOTH_ICON,
                BLUETOOTH_ICON_SIZE,
                BLUETOOTH_ICON_SIZE,
            )?,
        })
    }
}

impl Drop for Resources {
    fn drop(&mut self) {
        debug!("Releasing resources");
    }
}
