// src/dsp/mod.rs
//
// DSP primitives used by the synth pipeline and the effects chain.
//
// Every primitive is allocation-free after construction and has a fixed
// per-sample cost.

mod delay;
mod envelope;
mod filters;
mod oscillators;

pub use delay::*;
pub use envelope::*;
pub use filters::*;
pub use oscillators::*;
