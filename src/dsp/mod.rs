//! DSP primitives: pure Rust sample-level building blocks.
//!
//! Everything here runs per sample on the render side; none of it
//! allocates once constructed.

pub mod filter;
pub mod lfo;
pub mod limiter;
pub mod noise;
pub mod param;
pub mod renderer;
