//! Core data types shared by the simulator and every bridge client.
//!
//! - [`Frame`]: one camera image, dense and row-major
//! - [`WheelCommand`]: left/right wheel angular velocity pair

use crate::error::{ProtocolError, Result};

/// Default channel count (blue, green, red)
pub const BGR_CHANNELS: u32 = 3;

/// One camera image as a dense HxWxC byte buffer.
///
/// Samples are row-major and channel-interleaved; the channel order for
/// color frames is blue, green, red. The buffer never carries padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    height: u32,
    width: u32,
    channels: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Create a frame, checking that every dimension is non-zero and the
    /// buffer length matches exactly.
    pub fn new(height: u32, width: u32, channels: u32, data: Vec<u8>) -> Result<Self> {
        if height == 0 || width == 0 || channels == 0 {
            return Err(ProtocolError::EmptyFrame {
                height,
                width,
                channels,
            }
            .into());
        }
        let declared = height as usize * width as usize * channels as usize;
        if data.len() != declared {
            return Err(ProtocolError::SizeMismatch {
                declared,
                actual: data.len(),
            }
            .into());
        }
        Ok(Self {
            height,
            width,
            channels,
            data,
        })
    }

    /// Create a BGR frame filled with a single color.
    pub fn filled(height: u32, width: u32, bgr: [u8; 3]) -> Result<Self> {
        let pixels = height as usize * width as usize;
        let mut data = Vec::with_capacity(pixels * BGR_CHANNELS as usize);
        for _ in 0..pixels {
            data.extend_from_slice(&bgr);
        }
        Self::new(height, width, BGR_CHANNELS, data)
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Raw sample buffer
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the frame and return its sample buffer
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Samples of one pixel (`channels` bytes).
    ///
    /// Returns `None` outside the image.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let c = self.channels as usize;
        let start = (y as usize * self.width as usize + x as usize) * c;
        Some(&self.data[start..start + c])
    }

    /// Mutable samples of one pixel.
    #[inline]
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> Option<&mut [u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let c = self.channels as usize;
        let start = (y as usize * self.width as usize + x as usize) * c;
        Some(&mut self.data[start..start + c])
    }

    /// Number of bytes in the pixel buffer (H*W*C)
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}

/// Left/right wheel angular velocities (rad/s, positive = forward)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelCommand {
    pub left: f32,
    pub right: f32,
}

impl WheelCommand {
    pub const STOP: WheelCommand = WheelCommand {
        left: 0.0,
        right: 0.0,
    };

    #[inline]
    pub const fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    /// Sum of absolute wheel velocities, used as an effort measure
    #[inline]
    pub fn effort(&self) -> f32 {
        self.left.abs() + self.right.abs()
    }

    /// Clamp both wheels into `[-limit, limit]`
    #[inline]
    pub fn clamped(&self, limit: f32) -> Self {
        Self {
            left: self.left.clamp(-limit, limit),
            right: self.right.clamp(-limit, limit),
        }
    }
}
