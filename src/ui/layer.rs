//! Drawable regions of the watchface

use embedded_graphics::{
    image::{Image, ImageRaw},
    mono_font::{MonoFont, MonoTextStyle},
    pixelcolor::{BinaryColor, Rgb565},
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};
use heapless::String;

use crate::Error;

/// Text region with a fixed text capacity
pub struct TextLayer<const N: usize> {
    frame: Rectangle,
    font: &'static MonoFont<'static>,
    color: Rgb565,
    alignment: Alignment,
    text: String<N>,
    hidden: bool,
}

impl<const N: usize> TextLayer<N> {
    pub fn new(frame: Rectangle, font: &'static MonoFont<'static>, alignment: Alignment) -> Self {
        Self {
            frame,
            font,
            color: Rgb565::WHITE,
            alignment,
            text: String::new(),
            hidden: false,
        }
    }

    /// Replace the text, cutting it at the last character that fits
    pub fn set_text(&mut self, text: &str) {
        self.text.clear();
        for c in text.chars() {
            if self.text.push(c).is_err() {
                break;
            }
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn frame(&self) -> Rectangle {
        self.frame
    }

    pub fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        if self.hidden || self.text.is_empty() {
            return Ok(());
        }

        let x = match self.alignment {
            Alignment::Left => self.frame.top_left.x,
            Alignment::Center => self.frame.center().x,
            Alignment::Right => self.frame.top_left.x + self.frame.size.width as i32 - 1,
        };
        let style = TextStyleBuilder::new()
            .alignment(self.alignment)
            .baseline(Baseline::Top)
            .build();

        Text::with_text_style(
            &self.text,
            Point::new(x, self.frame.top_left.y),
            MonoTextStyle::new(self.font, self.color),
            style,
        )
        .draw(&mut target.clipped(&self.frame))?;

        Ok(())
    }
}

/// 1 bit per pixel image, rows packed MSB first and padded to full bytes
#[derive(Clone, Copy, Debug)]
pub struct IconBitmap {
    data: &'static [u8],
    size: Size,
}

impl IconBitmap {
    /// Check that `data` holds exactly `width` × `height` pixels
    pub fn load(data: &'static [u8], width: u32, height: u32) -> Result<Self, Error> {
        let stride = (width as usize + 7) / 8;
        if width == 0 || height == 0 || data.len() != stride * height as usize {
            return Err(Error::ResourceLoad);
        }
        Ok(Self {
            data,
            size: Size::new(width, height),
        })
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Whether the pixel at `x`, `y` is set
    pub fn pixel(&self, x: u32, y: u32) -> bool {
        if x >= self.size.width || y >= self.size.height {
            return false;
        }
        let stride = (self.size.width as usize + 7) / 8;
        let byte = self.data[y as usize * stride + x as usize / 8];
        byte & (0x80 >> (x % 8)) != 0
    }
}

/// Bitmap region
pub struct BitmapLayer {
    frame: Rectangle,
    bitmap: IconBitmap,
    hidden: bool,
}

impl BitmapLayer {
    pub fn new(frame: Rectangle, bitmap: IconBitmap) -> Self {
        Self {
            frame,
            bitmap,
            hidden: false,
        }
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn frame(&self) -> Rectangle {
        self.frame
    }

    pub fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        if self.hidden {
            return Ok(());
        }
        let raw = ImageRaw::<BinaryColor>::new(self.bitmap.data, self.bitmap.size().width);
        Image::new(&raw, self.frame.top_left)
            .draw(&mut target.clipped(&self.frame).color_converted())
    }
}

/// Solid filled rectangle, used as divider
pub struct LineLayer {
    frame: Rectangle,
    color: Rgb565,
}

impl LineLayer {
    pub fn new(frame: Rectangle, color: Rgb565) -> Self {
        Self { frame, color }
    }

    pub fn frame(&self) -> Rectangle {
        self.frame
    }

    pub fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        self.frame
            .into_styled(PrimitiveStyle::with_fill(self.color))
            .draw(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FrameBuffer;
    use embedded_graphics::mono_font::ascii::FONT_6X10;

    #[test]
    fn text_is_cut_to_capacity() {
        let mut layer: TextLayer<3> = TextLayer::new(Rectangle::zero(), &FONT_6X10, Alignment::Left);
        layer.set_text("1000");
        assert_eq!(layer.text(), "100");
        // Multi byte characters are never split
        layer.set_text("aé");
        assert_eq!(layer.text(), "aé");
        layer.set_text("abé");
        assert_eq!(layer.text(), "ab");
    }

    #[test]
    fn text_stays_inside_its_frame() {
        let frame = Rectangle::new(Point::new(10, 10), Size::new(20, 10));
        let mut layer: TextLayer<8> = TextLayer::new(frame, &FONT_6X10, Alignment::Left);
        layer.set_text("88888888");

        let mut fb = FrameBuffer::new();
        layer.draw(&mut fb).unwrap();
        assert!(fb.lit_in(frame) > 0);
        assert_eq!(fb.lit(), fb.lit_in(frame));
    }

    #[test]
    fn hidden_layers_draw_nothing() {
        let frame = Rectangle::new(Point::new(0, 0), Size::new(60, 12));
        let mut text: TextLayer<4> = TextLayer::new(frame, &FONT_6X10, Alignment::Right);
        text.set_text("42");
        text.set_hidden(true);

        let mut bitmap = BitmapLayer::new(
            Rectangle::new(Point::new(0, 20), Size::new(8, 1)),
            IconBitmap::load(&[0xFF], 8, 1).unwrap(),
        );
        bitmap.set_hidden(true);

        let mut fb = FrameBuffer::new();
        text.draw(&mut fb).unwrap();
        bitmap.draw(&mut fb).unwrap();
        assert_eq!(fb.lit(), 0);

        text.set_hidden(false);
        bitmap.set_hidden(false);
        text.draw(&mut fb).unwrap();
        bitmap.draw(&mut fb).unwrap();
        assert!(fb.lit() > 8);
    }

    #[test]
    fn bitmap_pixels() {
        static DATA: [u8; 4] = [0b1100_0000, 0b1000_0000, 0b0000_0001, 0b0000_0000];
        let icon = IconBitmap::load(&DATA, 9, 2).unwrap();
        assert_eq!(icon.size(), Size::new(9, 2));
        assert!(icon.pixel(0, 0));
        assert!(icon.pixel(1, 0));
        assert!(!icon.pixel(2, 0));
        assert!(icon.pixel(8, 0));
        assert!(icon.pixel(7, 1));
        assert!(!icon.pixel(8, 1));
        // Outside of the bitmap
        assert!(!icon.pixel(9, 0));
    }

    #[test]
    fn bitmap_size_is_checked() {
        static DATA: [u8; 3] = [0; 3];
        assert_eq!(IconBitmap::load(&DATA, 9, 2).err(), Some(Error::ResourceLoad));
        assert_eq!(IconBitmap::load(&DATA, 0, 3).err(), Some(Error::ResourceLoad));
        assert!(IconBitmap::load(&DATA, 8, 3).is_ok());
    }

    #[test]
    fn line_fills_its_frame() {
        let frame = Rectangle::new(Point::new(20, 180), Size::new(200, 1));
        let mut fb = FrameBuffer::new();
        LineLayer::new(frame, Rgb565::WHITE).draw(&mut fb).unwrap();
        assert_eq!(fb.lit(), 200);
    }
}
