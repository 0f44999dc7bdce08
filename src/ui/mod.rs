//! UI definitions module
//!
//! The window owns its resources and layers only while loaded.

use embedded_graphics::{pixelcolor::Rgb565, prelude::*};

use crate::Error;

mod layer;
mod resources;
mod watchface;

pub use layer::{BitmapLayer, IconBitmap, LineLayer, TextLayer};
pub use resources::Resources;
pub use watchface::WatchfaceLayers;

pub const LCD_W: u32 = 240;
pub const LCD_H: u32 = 240;

/// The watchface window
pub struct Window {
    background: Rgb565,
    resources: Option<Resources>,
    layers: Option<WatchfaceLayers>,
    dirty: bool,
}

impl Window {
    pub fn new(background: Rgb565) -> Self {
        Self {
            background,
            resources: None,
            layers: None,
            dirty: true,
        }
    }

    /// Load resources and create the layers
    pub fn load(&mut self) -> Result<(), Error> {
        let resources = Resources::load()?;
        self.layers = Some(WatchfaceLayers::setup(&resources));
        self.resources = Some(resources);
        self.dirty = true;
        info!("Window loaded");
        Ok(())
    }

    /// Drop the layers, then the resources
    pub fn unload(&mut self) {
        if self.layers.take().is_some() {
            info!("Window unloaded");
        }
        self.resources = None;
        self.dirty = true;
    }

    pub fn is_loaded(&self) -> bool {
        self.layers.is_some()
    }

    pub fn layers(&self) -> Option<&WatchfaceLayers> {
        self.layers.as_ref()
    }

    /// Mutable access to the layers, marks the window for redraw
    pub fn layers_mut(&mut self) -> Option<&mut WatchfaceLayers> {
        let layers = self.layers.as_mut()?;
        self.dirty = true;
        Some(layers)
    }

    pub fn needs_redraw(&self) -> bool {
        self.dirty
    }

    pub fn draw<D>(&mut self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        target.clear(self.background)?;
        if let Some(layers) = &self.layers {
            layers.draw(target)?;
        }
        self.dirty = false;
        Ok(())
    }
}
