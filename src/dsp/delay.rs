// src/dsp/delay.rs
//
// Feedback delay line over a fixed circular buffer, with a control-rate
// handle for feedback, length, dampening and feedthrough.

use std::sync::Arc;

use crate::config::DelaySettings;
use crate::parameter::{SharedCount, SharedParam};

/// Samples over which a length change crossfades from the old read cursor to
/// the new one.
pub const CROSSFADE_SAMPLES: usize = 64;

const MAX_FEEDBACK: f32 = 0.99;

#[derive(Debug)]
struct DelayParams {
    feedthrough: SharedParam,
    feedback: SharedParam,
    dampening: SharedParam,
    length: SharedCount,
}

/// Create a delay stage and the handle used to modulate it.
///
/// The buffer (`capacity_seconds` of audio) is allocated here and never
/// resized.
pub fn delay(settings: &DelaySettings, sample_rate: f32) -> (DelayLine, DelayControl) {
    let capacity = ((settings.capacity_seconds * sample_rate) as usize).max(1);
    let length = ((settings.initial_seconds * sample_rate) as usize).clamp(1, capacity);

    let params = Arc::new(DelayParams {
        feedthrough: SharedParam::new(settings.feedthrough.max(0.0)),
        feedback: SharedParam::new(settings.feedback.clamp(0.0, MAX_FEEDBACK)),
        dampening: SharedParam::new(settings.dampening.clamp(0.0, 1.0)),
        length: SharedCount::new(length),
    });

    let line = DelayLine {
        buffer: vec![0.0; capacity].into_boxed_slice(),
        write_pos: 0,
        length,
        fade_from: length,
        fade_remaining: 0,
        damp_state: 0.0,
        params: Arc::clone(&params),
    };
    let control = DelayControl { params, capacity };

    (line, control)
}

/// Circular-buffer delay.
///
/// Per sample:
/// - `delayed` is read `length` samples behind the write cursor
/// - `delayed` is low-passed by the dampening coefficient (0 = no dampening)
/// - the buffer receives `input + feedback * delayed`
/// - the output is `feedthrough * input + delayed`
pub struct DelayLine {
    buffer: Box<[f32]>,
    write_pos: usize,

    /// Length applied to the current block, always in `[1, capacity]`.
    length: usize,
    fade_from: usize,
    fade_remaining: usize,

    damp_state: f32,
    params: Arc<DelayParams>,
}

impl DelayLine {
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Length the read cursor is at or fading towards.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Process one block. `output` must be at least as long as `input`.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        let cap = self.buffer.len();

        // Parameters are sampled once per block.
        let feedthrough = self.params.feedthrough.get();
        let feedback = self.params.feedback.get();
        let damping = self.params.dampening.get();
        let target = self.params.length.get().clamp(1, cap);

        for (out, &x) in output.iter_mut().zip(input) {
            // A new length waits for any running crossfade to finish, so the
            // read position only ever blends between two fixed taps.
            if self.fade_remaining == 0 && target != self.length {
                self.fade_from = self.length;
                self.length = target;
                self.fade_remaining = CROSSFADE_SAMPLES;
            }

            let read_pos = (self.write_pos + cap - self.length) % cap;
            let mut delayed = self.buffer[read_pos];

            if self.fade_remaining > 0 {
                let old_pos = (self.write_pos + cap - self.fade_from) % cap;
                let old = self.buffer[old_pos];
                let t = 1.0 - self.fade_remaining as f32 / CROSSFADE_SAMPLES as f32;
                delayed = old + (delayed - old) * t;
                self.fade_remaining -= 1;
            }

            self.damp_state = delayed * (1.0 - damping) + self.damp_state * damping;
            let wet = self.damp_state;

            self.buffer[self.write_pos] = x + wet * feedback;
            *out = x * feedthrough + wet;

            self.write_pos = (self.write_pos + 1) % cap;
        }
    }
}

/// Control-rate handle for a [`DelayLine`].
///
/// Each setter writes exactly one parameter; the delay picks it up at the
/// start of its next block. A length arriving during a crossfade is applied
/// once that crossfade ends.
#[derive(Debug)]
pub struct DelayControl {
    params: Arc<DelayParams>,
    capacity: usize,
}

impl DelayControl {
    pub fn set_feedback(&self, gain: f32) {
        self.params.feedback.set(gain.clamp(0.0, MAX_FEEDBACK));
    }

    /// Set the delay length in samples, clamped to `[1, capacity]`.
    ///
    /// Returns the length that will be applied.
    pub fn set_length(&self, samples: usize) -> usize {
        let samples = samples.clamp(1, self.capacity);
        self.params.length.set(samples);
        samples
    }

    pub fn set_dampening(&self, coefficient: f32) {
        self.params.dampening.set(coefficient.clamp(0.0, 1.0));
    }

    pub fn set_feedthrough(&self, gain: f32) {
        self.params.feedthrough.set(gain.max(0.0));
    }

    pub fn feedback(&self) -> f32 {
        self.params.feedback.get()
    }

    pub fn length(&self) -> usize {
        self.params.length.get()
    }

    pub fn dampening(&self) -> f32 {
        self.params.dampening.get()
    }

    pub fn feedthrough(&self) -> f32 {
        self.params.feedthrough.get()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> DelaySettings {
        DelaySettings {
            capacity_seconds: 1.0,
            initial_seconds: 0.5,
            feedthrough: 0.0,
            feedback: 0.0,
            dampening: 0.0,
        }
    }

    #[test]
    fn test_impulse_comes_back_after_length() {
        // 100 Hz sample rate keeps the buffers tiny
        let (mut line, control) = delay(&settings(), 100.0);
        assert_eq!(line.capacity(), 100);
        assert_eq!(control.length(), 50);

        let mut input = [0.0; 60];
        input[0] = 1.0;
        let mut out = [0.0; 60];
        line.process(&input, &mut out);

        for (i, &s) in out.iter().enumerate() {
            let expected = if i == 50 { 1.0 } else { 0.0 };
            assert_eq!(s, expected, "sample {}", i);
        }
    }

    #[test]
    fn test_feedback_repeats_decay() {
        let mut s = settings();
        s.feedback = 0.5;
        let (mut line, _) = delay(&s, 100.0);

        let mut input = [0.0; 101];
        input[0] = 1.0;
        let mut out = [0.0; 101];
        line.process(&input, &mut out);
        assert_eq!(out[50], 1.0);
        assert_eq!(out[100], 0.5);
    }

    #[test]
    fn test_feedthrough_passes_dry_signal() {
        let mut s = settings();
        s.feedthrough = 0.8;
        let (mut line, _) = delay(&s, 100.0);
        let mut out = [0.0; 4];
        line.process(&[1.0, 0.0, 0.5, 0.0], &mut out);
        assert_eq!(out, [0.8, 0.0, 0.4, 0.0]);
    }

    #[test]
    fn test_set_length_leaves_other_params_alone() {
        let mut s = settings();
        s.feedback = 0.6;
        s.dampening = 0.3;
        let (_, control) = delay(&s, 100.0);

        assert_eq!(control.set_length(20), 20);
        assert_eq!(control.feedback(), 0.6);
        assert_eq!(control.dampening(), 0.3);
        assert_eq!(control.feedthrough(), 0.0);
    }

    #[test]
    fn test_set_length_clamps_to_capacity() {
        let (_, control) = delay(&settings(), 100.0);
        assert_eq!(control.set_length(0), 1);
        assert_eq!(control.set_length(100), 100);
        assert_eq!(control.set_length(10_000), 100);
    }

    #[test]
    fn test_feedback_is_clamped_below_one() {
        let (_, control) = delay(&settings(), 100.0);
        control.set_feedback(4.0);
        assert_eq!(control.feedback(), MAX_FEEDBACK);
    }

    #[test]
    fn test_full_capacity_length_stays_in_bounds() {
        let (mut line, control) = delay(&settings(), 100.0);
        control.set_length(100);
        let mut input = [0.0; 250];
        input[0] = 1.0;
        let mut out = [0.0; 250];
        line.process(&input, &mut out);
        assert_eq!(line.length(), 100);
        // Crossfade from 50 to 100 has finished long before sample 100.
        assert_eq!(out[100], 1.0);
    }

    #[test]
    fn test_random_length_changes_never_index_out_of_bounds() {
        let (mut line, control) = delay(&settings(), 100.0);
        let input = [0.25; 7];
        let mut out = [0.0; 7];
        let mut seed: u32 = 99;
        for _ in 0..2000 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            control.set_length((seed >> 16) as usize % 300);
            line.process(&input, &mut out);
            assert!(line.length() >= 1 && line.length() <= line.capacity());
        }
    }

    #[test]
    fn test_length_change_has_no_step() {
        let s = DelaySettings {
            capacity_seconds: 1.0,
            initial_seconds: 0.05,
            feedthrough: 0.0,
            feedback: 0.0,
            dampening: 0.0,
        };
        let (mut line, control) = delay(&s, 2000.0);

        // Slow ramp: any jump in read position shows up as a large step.
        let ramp: Vec<f32> = (0..4000).map(|i| i as f32 * 1e-4).collect();
        let mut out = vec![0.0; 2000];
        line.process(&ramp[..2000], &mut out);
        let mut previous = out[1999];

        control.set_length(1000);
        line.process(&ramp[2000..], &mut out);
        for &s in &out[..256] {
            assert!((s - previous).abs() < 0.01, "step from {} to {}", previous, s);
            previous = s;
        }
    }

    #[test]
    fn test_length_change_during_crossfade_has_no_step() {
        let s = DelaySettings {
            capacity_seconds: 1.0,
            initial_seconds: 0.05,
            feedthrough: 0.0,
            feedback: 0.0,
            dampening: 0.0,
        };
        let (mut line, control) = delay(&s, 2000.0);

        let ramp: Vec<f32> = (0..2400).map(|i| i as f32 * 1e-4).collect();
        let mut out = vec![0.0; 2000];
        line.process(&ramp[..2000], &mut out);
        let mut previous = out[1999];

        // Second change lands halfway through the first crossfade.
        let mut block = [0.0; 32];
        control.set_length(1000);
        line.process(&ramp[2000..2032], &mut block);
        let mut checked: Vec<f32> = block.to_vec();

        control.set_length(1500);
        for chunk in ramp[2032..2400].chunks(32) {
            line.process(chunk, &mut block[..chunk.len()]);
            checked.extend_from_slice(&block[..chunk.len()]);
        }

        for &s in &checked {
            assert!((s - previous).abs() < 0.01, "step from {} to {}", previous, s);
            previous = s;
        }
        assert_eq!(line.length(), 1500);
    }
}
