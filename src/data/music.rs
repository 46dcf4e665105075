//! Contains types and functions for working with pitches, keys, and scales.

pub mod circle_fifths;
pub mod intervals;
pub mod notes;
pub mod scales;
