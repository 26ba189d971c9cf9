//! Frame preprocessing for recognition
//!
//! Crops the framing rectangle out of a preview frame and renders it as a
//! grayscale image for the engine.

use image::{GrayImage, Luma};

use crate::capture::{Frame, PixelFormat};
use crate::config::{CaptureSettings, FramingSettings};
use crate::error::FrameError;

/// Preprocessing configuration
#[derive(Debug, Clone, Default)]
pub struct PreprocessConfig {
    /// Region of interest sizing
    pub framing: FramingSettings,
    /// Invert luminance (light text on dark background)
    pub reverse_image: bool,
}

impl From<&CaptureSettings> for PreprocessConfig {
    fn from(settings: &CaptureSettings) -> Self {
        Self {
            framing: settings.framing.clone(),
            reverse_image: settings.reverse_image,
        }
    }
}

/// Region of interest in frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramingRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl FramingRect {
    /// Centered rectangle for a frame of the given size
    pub fn for_frame(frame_width: u32, frame_height: u32, settings: &FramingSettings) -> Self {
        let width = clamp_extent(
            frame_width,
            settings.width_fraction,
            settings.min_width,
            settings.max_width,
        );
        let height = clamp_extent(
            frame_height,
            settings.height_fraction,
            settings.min_height,
            settings.max_height,
        );

        Self {
            left: (frame_width - width) / 2,
            top: (frame_height - height) / 2,
            width,
            height,
        }
    }
}

/// Scale an extent, clamp it to [min, max], then clip it to the frame
fn clamp_extent(extent: u32, fraction: f32, min: u32, max: u32) -> u32 {
    let scaled = (extent as f32 * fraction) as u32;
    scaled.max(min).min(max.max(min)).min(extent)
}

/// Luminance of one pixel; the caller guarantees the frame was validated
fn luminance_at(frame: &Frame, x: u32, y: u32) -> u8 {
    let idx = (y * frame.width + x) as usize;
    match frame.format {
        // Luminance plane comes first, so only the leading w*h bytes matter
        PixelFormat::Nv21 | PixelFormat::Gray8 => frame.data[idx],
        PixelFormat::Rgba8 => {
            let p = idx * 4;
            let r = frame.data[p] as u32;
            let g = frame.data[p + 1] as u32;
            let b = frame.data[p + 2] as u32;
            // BT.601 integer weights
            ((77 * r + 150 * g + 29 * b) >> 8) as u8
        }
    }
}

/// Render the framing rectangle of `frame` as a grayscale image
pub fn preprocess_for_recognition(
    frame: &Frame,
    config: &PreprocessConfig,
) -> Result<GrayImage, FrameError> {
    frame.validate()?;

    let rect = FramingRect::for_frame(frame.width, frame.height, &config.framing);
    let image = GrayImage::from_fn(rect.width, rect.height, |x, y| {
        let luma = luminance_at(frame, rect.left + x, rect.top + y);
        if config.reverse_image {
            Luma([255 - luma])
        } else {
            Luma([luma])
        }
    });

    Ok(image)
}
