//! Decoded render results and the sink that displays them.
//!
//! The renderer writes its image with continuous saving, so a read may catch the file
//! half-written. [`RenderFrame::load`] reports that as a transient
//! [`DispatchError::Decode`] and the dispatcher simply tries again on the next tick.

use crate::error::{DispatchError, Result};
use std::path::{Path, PathBuf};

/// Number of samples stored per pixel (RGBA).
pub const CHANNELS: usize = 4;

/// A decoded image buffer: `width * height` pixels of linear RGBA `f32` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    width: u32,
    height: u32,
    pixels: Vec<f32>,
    source: PathBuf,
}

impl RenderFrame {
    /// Wrap an existing RGBA buffer. Fails when the buffer size does not match the dimensions.
    pub fn from_rgba(
        width: u32,
        height: u32,
        pixels: Vec<f32>,
        source: impl Into<PathBuf>,
    ) -> Result<Self> {
        let source = source.into();
        let expected = width as usize * height as usize * CHANNELS;
        if pixels.len() != expected {
            return Err(DispatchError::decode(
                source,
                format!(
                    "expected {expected} samples for {width}x{height}, got {}",
                    pixels.len()
                ),
            ));
        }
        Ok(Self {
            width,
            height,
            pixels,
            source,
        })
    }

    /// Read and decode the image at `path`, guessing the format from its contents.
    pub fn load(path: &Path) -> Result<Self> {
        let reader = image::io::Reader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| DispatchError::decode(path, e.to_string()))?;
        let decoded = reader
            .decode()
            .map_err(|e| DispatchError::decode(path, e.to_string()))?;

        let rgba = decoded.to_rgba32f();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(DispatchError::decode(path, "image has no pixels"));
        }
        Self::from_rgba(width, height, rgba.into_raw(), path)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major RGBA samples, top row first.
    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    /// File the frame was decoded from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// RGBA sample at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
        let px = &self.pixels[offset..offset + CHANNELS];
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Host render surface fed by the dispatcher.
///
/// Calls are strictly sequential in poll-tick order; an implementation never sees two
/// frames at once.
pub trait FrameSink {
    /// A new (possibly partial) frame is available for display.
    fn frame_available(&mut self, frame: &RenderFrame);

    /// Short status line update such as "Rendering" or "Error".
    fn update_stats(&mut self, _message: &str) {}
}
