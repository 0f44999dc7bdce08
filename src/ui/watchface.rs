//! Layer layout of the watchface on the 240 × 240 display

use embedded_graphics::{
    geometry::{Point, Size},
    pixelcolor::{Rgb565, RgbColor},
    prelude::DrawTarget,
    primitives::Rectangle,
    text::Alignment,
};

use super::{
    layer::{BitmapLayer, LineLayer, TextLayer},
    resources::{Resources, BLUETOOTH_ICON_SIZE},
};
use crate::{
    battery::PERCENT_LEN,
    clock::{DATE_LEN, TIME_LEN},
};

const fn frame(x: i32, y: i32, width: u32, height: u32) -> Rectangle {
    Rectangle::new(Point::new(x, y), Size::new(width, height))
}

const LINE_FRAME: Rectangle = frame(20, 180, 200, 1);
const TIME_FRAME: Rectangle = frame(0, 84, 240, 40);
const DAY_FRAME: Rectangle = frame(0, 152, 240, 22);
const MONTH_FRAME: Rectangle = frame(0, 186, 240, 22);
const BATTERY_FRAME: Rectangle = frame(186, 6, 48, 12);
const BLUETOOTH_FRAME: Rectangle = frame(6, 6, BLUETOOTH_ICON_SIZE, BLUETOOTH_ICON_SIZE);

/// All regions of the watchface
pub struct WatchfaceLayers {
    /// Divider between day and month
    pub line: LineLayer,
    pub time: TextLayer<TIME_LEN>,
    pub day: TextLayer<DATE_LEN>,
    pub month: TextLayer<DATE_LEN>,
    pub battery: TextLayer<PERCENT_LEN>,
    pub bluetooth: BitmapLayer,
}

impl WatchfaceLayers {
    /// Create every region. The Bluetooth icon starts hidden.
    pub fn setup(resources: &Resources) -> Self {
        let mut bluetooth = BitmapLayer::new(BLUETOOTH_FRAME, resources.bluetooth);
        bluetooth.set_hidden(true);

        Self {
            line: LineLayer::new(LINE_FRAME, Rgb565::WHITE),
            time: TextLayer::new(TIME_FRAME, resources.time_font, Alignment::Center),
            day: TextLayer::new(DAY_FRAME, resources.small_font, Alignment::Center),
            month: TextLayer::new(MONTH_FRAME, resources.small_font, Alignment::Center),
            battery: TextLayer::new(BATTERY_FRAME, resources.tiny_font, Alignment::Right),
            bluetooth,
        }
    }

    /// Draw the regions in stacking order
    pub fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        self.line.draw(target)?;
        self.time.draw(target)?;
        self.day.draw(target)?;
        self.month.draw(target)?;
        self.battery.draw(target)?;
        self.bluetooth.draw(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_fit_on_screen_without_overlap() {
        let screen = frame(0, 0, 240, 240);
        let frames = [
            LINE_FRAME,
            TIME_FRAME,
            DAY_FRAME,
            MONTH_FRAME,
            BATTERY_FRAME,
            BLUETOOTH_FRAME,
        ];
        for (i, a) in frames.iter().enumerate() {
            assert_eq!(screen.intersection(a), *a);
            for b in &frames[i + 1..] {
                assert!(a.intersection(b).is_zero_sized());
            }
        }
    }

    #[test]
    fn bluetooth_starts_hidden() {
        let resources = Resources::load().unwrap();
        let layers = WatchfaceLayers::setup(&resources);
        assert!(layers.bluetooth.is_hidden());
        assert!(!layers.battery.is_hidden());
        assert_eq!(layers.time.frame(), TIME_FRAME);
    }
}
