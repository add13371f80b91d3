//! Rover Perception - obstacle heuristics over camera frames
//!
//! Two independent heuristics share the same left/center/right partition:
//!
//! - [`EdgeRiskEstimator`]: blurred Canny edge density, used by the
//!   environment adapter for reward shaping
//! - [`HazardDetector`]: filled masks of large edge clusters, used by the
//!   onboard reflex controller
//!
//! Both implement [`ObstacleRisk`].

pub mod bands;
pub mod error;
pub mod grayscale;
pub mod hazard;
pub mod risk;

// Re-export commonly used types
pub use bands::{RiskTriple, band_bounds, band_densities};
pub use error::{PerceptionError, Result};
pub use grayscale::to_gray;
pub use hazard::{HazardDetector, HazardMask, HazardMaskConfig};
pub use risk::{EdgeRiskConfig, EdgeRiskEstimator, ObstacleRisk};
