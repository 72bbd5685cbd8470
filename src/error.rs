//! Error types for the spectral ray tracing core.

use thiserror::Error;

/// Main error type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A constructor received a value it cannot accept.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Array has the wrong number of elements for the expected shape.
    #[error("Invalid shape for {name}: expected {expected}, got {actual}")]
    Shape {
        name: &'static str,
        expected: String,
        actual: usize,
    },

    /// Triangle references a vertex that does not exist.
    #[error("Triangle {triangle} references vertex {vertex} (vertex count: {count})")]
    VertexOutOfRange {
        triangle: usize,
        vertex: usize,
        count: usize,
    },

    /// Triangle with (numerically) zero area.
    #[error("Triangle {0} is degenerate (zero area)")]
    DegenerateTriangle(usize),

    /// Function evaluated outside of its domain with limits enforced.
    #[error("Requested value outside mesh bounds at ({x}, {y})")]
    Domain { x: f64, y: f64 },

    /// Pipeline used out of order (before initialise, after finalise, ...).
    #[error("Pipeline state: {0}")]
    PipelineState(String),

    /// Spectral slice id unknown to the pipeline.
    #[error("Slice {index} out of bounds (count: {count})")]
    SliceOutOfBounds { index: usize, count: usize },

    /// Coordinate does not fit the pipeline's coordinate shape.
    #[error("Coordinate {coordinate} outside of shape {shape}")]
    CoordinateOutOfBounds { coordinate: String, shape: String },
}

impl Error {
    /// Create a configuration error from a string.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a pipeline state error from a string.
    pub fn state(msg: impl Into<String>) -> Self {
        Self::PipelineState(msg.into())
    }
}

/// Result type alias for fallible operations of this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::Domain { x: 2., y: 3.5 };
        assert!(e.to_string().contains("outside mesh"));
        assert!(e.to_string().contains("3.5"));

        let e = Error::VertexOutOfRange {
            triangle: 4,
            vertex: 9,
            count: 3,
        };
        assert!(e.to_string().contains("9"));
        assert!(e.to_string().contains("3"));
    }

    #[test]
    fn test_error_helpers() {
        assert!(matches!(Error::config("bins"), Error::Configuration(_)));
        assert!(matches!(Error::state("finalised"), Error::PipelineState(_)));
    }
}
