//! Chart aggregate: provider seam, reconciliation, sessions and overlays.

pub mod overlay;
pub mod provider;
pub mod reconciler;
pub mod sessions;
pub mod value_objects;

pub use overlay::*;
pub use provider::*;
pub use reconciler::*;
pub use sessions::*;
pub use value_objects::*;
