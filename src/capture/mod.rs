//! Capture module - Sampling live entities into frame sequences.

mod buffer;
mod sampler;
mod scheduler;

pub use buffer::*;
pub use sampler::*;
pub use scheduler::*;
