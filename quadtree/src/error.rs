use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuadtreeError {
    InvalidBounds {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    },
}

pub type QuadtreeResult<T> = Result<T, QuadtreeError>;

impl fmt::Display for QuadtreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuadtreeError::InvalidBounds { x1, y1, x2, y2 } => {
                write!(
                    f,
                    "quadtree bounds must be finite with positive area (x1: {}, y1: {}, x2: {}, y2: {})",
                    x1, y1, x2, y2
                )
            }
        }
    }
}

impl std::error::Error for QuadtreeError {}
