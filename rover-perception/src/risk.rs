//! Edge-density risk estimator.
//!
//! Pipeline: BGR → intensity → Gaussian blur → Canny → per-third fraction of
//! edge pixels. Rocks and ridges produce dense edges against the smooth
//! terrain, so the fraction is a cheap obstacle-density proxy.

use crate::bands::{RiskTriple, band_densities};
use crate::error::{PerceptionError, Result};
use crate::grayscale::to_gray;
use image::GrayImage;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use rover_bridge::Frame;
use serde::{Deserialize, Serialize};

/// Anything that turns a camera frame into left/center/right risk
pub trait ObstacleRisk {
    /// Risk per third, each value in `[0, 1]`
    fn risk(&self, frame: &Frame) -> RiskTriple;
}

/// Edge-density estimator parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRiskConfig {
    /// Pre-blur standard deviation in pixels (0 disables the blur)
    #[serde(default = "default_blur_sigma")]
    pub blur_sigma: f32,

    /// Canny hysteresis low threshold
    #[serde(default = "default_canny_low")]
    pub canny_low: f32,

    /// Canny hysteresis high threshold
    #[serde(default = "default_canny_high")]
    pub canny_high: f32,
}

fn default_blur_sigma() -> f32 {
    1.1 // matches a 5x5 kernel
}

fn default_canny_low() -> f32 {
    60.0
}

fn default_canny_high() -> f32 {
    120.0
}

impl Default for EdgeRiskConfig {
    fn default() -> Self {
        Self {
            blur_sigma: default_blur_sigma(),
            canny_low: default_canny_low(),
            canny_high: default_canny_high(),
        }
    }
}

impl EdgeRiskConfig {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if !self.blur_sigma.is_finite() || self.blur_sigma < 0.0 {
            return Err(PerceptionError::InvalidConfig(format!(
                "blur_sigma must be >= 0, got {}",
                self.blur_sigma
            )));
        }
        validate_thresholds(self.canny_low, self.canny_high)
    }
}

pub(crate) fn validate_thresholds(low: f32, high: f32) -> Result<()> {
    if !(low.is_finite() && high.is_finite()) || low < 0.0 || low > high {
        return Err(PerceptionError::InvalidConfig(format!(
            "canny thresholds need 0 <= low <= high, got {} / {}",
            low, high
        )));
    }
    Ok(())
}

/// Risk Estimator: fraction of Canny edge pixels per third
#[derive(Debug, Clone)]
pub struct EdgeRiskEstimator {
    config: EdgeRiskConfig,
}

impl EdgeRiskEstimator {
    pub fn new(config: EdgeRiskConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EdgeRiskConfig {
        &self.config
    }

    /// Binary edge map (0 or 255) of a frame
    pub fn edge_map(&self, frame: &Frame) -> GrayImage {
        let gray = to_gray(frame);
        let blurred = if self.config.blur_sigma > 0.0 {
            gaussian_blur_f32(&gray, self.config.blur_sigma)
        } else {
            gray
        };
        canny(&blurred, self.config.canny_low, self.config.canny_high)
    }
}

impl Default for EdgeRiskEstimator {
    fn default() -> Self {
        Self {
            config: EdgeRiskConfig::default(),
        }
    }
}

impl ObstacleRisk for EdgeRiskEstimator {
    fn risk(&self, frame: &Frame) -> RiskTriple {
        band_densities(&self.edge_map(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_black_frame_is_clear() {
        let frame = Frame::filled(120, 160, [0, 0, 0]).unwrap();
        let risk = EdgeRiskEstimator::default().risk(&frame);
        assert_eq!(risk, RiskTriple::CLEAR);
    }

    #[test]
    fn test_uniform_color_is_clear() {
        let frame = Frame::filled(60, 90, [40, 90, 160]).unwrap();
        let risk = EdgeRiskEstimator::default().risk(&frame);
        assert!(risk.max() < 1e-6);
    }

    #[test]
    fn test_config_validation() {
        let bad_sigma = EdgeRiskConfig {
            blur_sigma: -1.0,
            ..Default::default()
        };
        assert!(EdgeRiskEstimator::new(bad_sigma).is_err());

        let inverted = EdgeRiskConfig {
            canny_low: 200.0,
            canny_high: 100.0,
            ..Default::default()
        };
        assert!(EdgeRiskEstimator::new(inverted).is_err());

        assert!(EdgeRiskEstimator::new(EdgeRiskConfig::default()).is_ok());
    }

    #[test]
    fn test_config_defaults_from_partial_toml() {
        let config: EdgeRiskConfig = toml::from_str("canny_low = 30.0").unwrap();
        assert_eq!(config.canny_low, 30.0);
        assert_eq!(config.canny_high, 120.0);
        assert_eq!(config.blur_sigma, 1.1);
    }
}
