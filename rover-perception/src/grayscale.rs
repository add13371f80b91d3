//! Frame to single-channel intensity conversion.

use image::{GrayImage, Luma};
use rover_bridge::Frame;

/// BT.601 luma weights (red, green, blue)
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// Convert a camera frame to an intensity image.
///
/// One-channel frames are copied as-is. Frames with three or more channels
/// are read as blue, green, red; extra channels (alpha) are ignored. A
/// two-channel frame uses its first channel.
pub fn to_gray(frame: &Frame) -> GrayImage {
    let channels = frame.channels() as usize;
    let data = frame.data();

    GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        let idx = (y as usize * frame.width() as usize + x as usize) * channels;
        let value = if channels >= 3 {
            luma(data[idx], data[idx + 1], data[idx + 2])
        } else {
            data[idx]
        };
        Luma([value])
    })
}

/// Weighted intensity of one BGR pixel
#[inline]
pub fn luma(b: u8, g: u8, r: u8) -> u8 {
    let y = LUMA_R * r as f32 + LUMA_G * g as f32 + LUMA_B * b as f32;
    y.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bgr_channel_order() {
        // Pure red is stored last
        assert_eq!(luma(0, 0, 255), 76);
        assert_eq!(luma(255, 0, 0), 29);
        assert_eq!(luma(0, 255, 0), 150);
        assert_eq!(luma(255, 255, 255), 255);
    }

    #[test]
    fn test_gray_frame_passthrough() {
        let frame = Frame::new(2, 2, 1, vec![0, 50, 100, 200]).unwrap();
        let gray = to_gray(&frame);
        assert_eq!(gray.as_raw(), &vec![0, 50, 100, 200]);
    }

    #[test]
    fn test_bgra_ignores_alpha() {
        let frame = Frame::new(1, 2, 4, vec![0, 0, 255, 0, 0, 0, 255, 255]).unwrap();
        let gray = to_gray(&frame);
        assert_eq!(gray.get_pixel(0, 0).0[0], 76);
        assert_eq!(gray.get_pixel(1, 0).0[0], 76);
    }
}
