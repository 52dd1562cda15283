//! Coordinate reference system transformations.
//!
//! Implements map projections from scratch without external dependencies.

pub mod transform;
pub mod utm;

pub use transform::Projector;
pub use utm::TransverseMercator;
