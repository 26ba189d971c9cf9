//! Frame data structures for camera preview content

use std::fmt;
use std::time::Instant;

use crate::error::FrameError;

/// Pixel layout of a preview buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// YUV 4:2:0 semi-planar, luminance plane first (standard phone preview format)
    #[default]
    Nv21,
    /// One luminance byte per pixel
    Gray8,
    /// Four bytes per pixel, red first
    Rgba8,
}

impl PixelFormat {
    /// Minimum buffer length for a frame of the given size
    pub fn required_len(&self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self {
            PixelFormat::Nv21 => pixels + pixels / 2,
            PixelFormat::Gray8 => pixels,
            PixelFormat::Rgba8 => pixels * 4,
        }
    }
}

/// A single frame from the camera preview stream
pub struct Frame {
    /// Raw pixel data
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Layout of `data`
    pub format: PixelFormat,
    /// Timestamp when frame was captured
    pub timestamp: Instant,
}

impl Frame {
    /// Create a new frame stamped with the current time
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            data,
            width,
            height,
            format,
            timestamp: Instant::now(),
        }
    }

    /// Get frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Check that the buffer covers the declared geometry
    pub fn validate(&self) -> Result<(), FrameError> {
        if self.width == 0 || self.height == 0 {
            return Err(FrameError::EmptyDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let expected = self.format.required_len(self.width, self.height);
        if self.data.len() < expected {
            return Err(FrameError::BufferTooShort {
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }
}

// Pixel buffers are large; keep them out of message logs.
impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_len_per_format() {
        assert_eq!(PixelFormat::Nv21.required_len(4, 2), 12);
        assert_eq!(PixelFormat::Gray8.required_len(4, 2), 8);
        assert_eq!(PixelFormat::Rgba8.required_len(4, 2), 32);
    }

    #[test]
    fn test_validate_short_buffer() {
        let frame = Frame::new(vec![0; 10], 4, 4, PixelFormat::Gray8);
        assert_eq!(
            frame.validate(),
            Err(FrameError::BufferTooShort {
                expected: 16,
                actual: 10
            })
        );
    }

    #[test]
    fn test_validate_empty_dimensions() {
        let frame = Frame::new(vec![], 0, 4, PixelFormat::Gray8);
        assert!(matches!(
            frame.validate(),
            Err(FrameError::EmptyDimensions { .. })
        ));
    }

    #[test]
    fn test_debug_omits_pixels() {
        let frame = Frame::new(vec![7; 64], 8, 8, PixelFormat::Gray8);
        let text = format!("{:?}", frame);
        assert!(text.contains("bytes: 64"));
        assert!(!text.contains("7, 7"));
    }
}
