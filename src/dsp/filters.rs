// src/dsp/filters.rs
//
// Second-order low-pass filter stage with a control-rate cutoff handle.

use std::f32::consts::PI;
use std::sync::Arc;

use crate::config::FilterSettings;
use crate::parameter::SharedParam;

/// Normalised biquad coefficients (`a0` divided out).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl BiquadCoefficients {
    /// Low-pass response (RBJ cookbook form).
    pub fn lowpass(cutoff_hz: f32, q: f32, sample_rate: f32) -> Self {
        // Clamp cutoff to valid range
        let cutoff = cutoff_hz.clamp(10.0, (sample_rate * 0.49).max(10.0));
        let q = q.max(0.1);

        let w0 = 2.0 * PI * cutoff / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);
        let a0 = 1.0 + alpha;

        let b1 = (1.0 - cos_w0) / a0;
        Self {
            b0: b1 * 0.5,
            b1,
            b2: b1 * 0.5,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
        }
    }
}

/// Create a filter stage and the handle used to retune it.
pub fn filter(settings: &FilterSettings, sample_rate: f32) -> (BiquadFilter, FilterControl) {
    let cutoff = Arc::new(SharedParam::new(settings.cutoff_hz));
    let filter = BiquadFilter {
        coeffs: BiquadCoefficients::lowpass(settings.cutoff_hz, settings.q, sample_rate),
        z1: 0.0,
        z2: 0.0,
        q: settings.q,
        sample_rate,
        applied_cutoff: settings.cutoff_hz,
        cutoff: Arc::clone(&cutoff),
    };
    (filter, FilterControl { cutoff })
}

/// Biquad low-pass, transposed direct form II.
///
/// The cutoff is read once per block; on a change the coefficients are
/// recomputed while the two state variables carry over, so retuning does not
/// reset the filter's history.
#[derive(Debug)]
pub struct BiquadFilter {
    coeffs: BiquadCoefficients,
    z1: f32,
    z2: f32,

    q: f32,
    sample_rate: f32,
    applied_cutoff: f32,
    cutoff: Arc<SharedParam>,
}

impl BiquadFilter {
    pub fn coefficients(&self) -> BiquadCoefficients {
        self.coeffs
    }

    /// Filter one block. `output` must be at least as long as `input`.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        let cutoff = self.cutoff.get();
        if cutoff != self.applied_cutoff {
            self.coeffs = BiquadCoefficients::lowpass(cutoff, self.q, self.sample_rate);
            self.applied_cutoff = cutoff;
        }

        let c = self.coeffs;
        for (out, &x) in output.iter_mut().zip(input) {
            let y = c.b0 * x + self.z1;
            self.z1 = c.b1 * x - c.a1 * y + self.z2;
            self.z2 = c.b2 * x - c.a2 * y;
            *out = y;
        }
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

/// Control-rate handle for a [`BiquadFilter`].
#[derive(Debug)]
pub struct FilterControl {
    cutoff: Arc<SharedParam>,
}

impl FilterControl {
    /// Takes effect at the start of the next block.
    pub fn set_cutoff_frequency(&self, hz: f32) {
        self.cutoff.set(hz);
    }

    pub fn cutoff_frequency(&self) -> f32 {
        self.cutoff.get()
    }
}
