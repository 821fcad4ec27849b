//! Color primitives and distance functions.

mod lab;
mod method;
mod rgb;

pub use lab::Lab;
pub use method::{ColorDistance, ColorMethod};
pub use rgb::{Axis, Rgb, SignedRgb};
