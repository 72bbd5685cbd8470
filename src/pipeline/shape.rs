use crate::error::{Error, Result};
use std::fmt;

/// Coordinate space of a pipeline: a single quantity, a set of indexed
/// points, or a pixel grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Unit,
    Points(usize),
    Pixels { width: usize, height: usize },
}

/// One element of a [`Shape`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Coordinate {
    Unit,
    Point(usize),
    Pixel(usize, usize),
}

impl Shape {
    pub fn validate(&self) -> Result<()> {
        match *self {
            Shape::Points(0) => Err(Error::config("point count must be greater than zero")),
            Shape::Pixels { width, height } if width == 0 || height == 0 => Err(Error::config(
                format!("pixel dimensions must be greater than zero, got {}", self),
            )),
            Shape::Pixels { width, height } if width.checked_mul(height).is_none() => Err(
                Error::config(format!("pixel count of {} overflows", self)),
            ),
            _ => Ok(()),
        }
    }

    /// Number of coordinates.
    pub fn len(&self) -> usize {
        match *self {
            Shape::Unit => 1,
            Shape::Points(n) => n,
            Shape::Pixels { width, height } => width.saturating_mul(height),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Linear index of `coordinate`; pixels are stored row by row.
    pub fn index(&self, coordinate: Coordinate) -> Result<usize> {
        match (*self, coordinate) {
            (Shape::Unit, Coordinate::Unit) => Ok(0),
            (Shape::Points(n), Coordinate::Point(i)) if i < n => Ok(i),
            (Shape::Pixels { width, height }, Coordinate::Pixel(x, y)) if x < width && y < height => {
                Ok(y * width + x)
            }
            _ => Err(Error::CoordinateOutOfBounds {
                coordinate: coordinate.to_string(),
                shape: self.to_string(),
            }),
        }
    }

    pub fn coordinate(&self, index: usize) -> Option<Coordinate> {
        if index >= self.len() {
            return None;
        }
        Some(match *self {
            Shape::Unit => Coordinate::Unit,
            Shape::Points(_) => Coordinate::Point(index),
            Shape::Pixels { width, .. } => Coordinate::Pixel(index % width, index / width),
        })
    }

    /// All coordinates in index order.
    pub fn coordinates(&self) -> impl Iterator<Item = Coordinate> {
        let shape = *self;
        (0..shape.len()).filter_map(move |i| shape.coordinate(i))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Unit => write!(f, "unit"),
            Shape::Points(n) => write!(f, "{} points", n),
            Shape::Pixels { width, height } => write!(f, "{}x{} pixels", width, height),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coordinate::Unit => write!(f, "unit"),
            Coordinate::Point(i) => write!(f, "point {}", i),
            Coordinate::Pixel(x, y) => write!(f, "pixel ({}, {})", x, y),
        }
    }
}
