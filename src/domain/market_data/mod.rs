//! Market data aggregate: time points, series identity and input shapes.

pub mod entities;
pub mod value_objects;

pub use entities::*;
pub use value_objects::*;
