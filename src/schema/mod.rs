//! Schema module - Configuration, transform codec and snapshot types.

mod config;
mod snapshot;
mod transform;

pub use config::*;
pub use snapshot::*;
pub use transform::*;
