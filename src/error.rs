use glam::Vec3;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TreeError {
    #[error("point {0} has a non-finite coordinate")]
    NonFinitePoint(Vec3),
    #[error("invalid bounds: start {start} must be finite and not above end {end} on any axis")]
    InvalidBounds { start: Vec3, end: Vec3 },
    #[error("depth {depth} exceeds the maximum of {max}")]
    DepthTooLarge { depth: u8, max: u8 },
}

pub type Result<T> = std::result::Result<T, TreeError>;

pub(crate) fn check_finite(point: Vec3) -> Result<Vec3> {
    if point.is_finite() {
        Ok(point)
    } else {
        Err(TreeError::NonFinitePoint(point))
    }
}
