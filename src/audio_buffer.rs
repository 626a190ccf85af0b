// src/audio_buffer.rs

/// A borrowed block of planar audio: `channels` runs of `frames` samples,
/// laid out back to back (`[ch0 f0..fN, ch1 f0..fN, ...]`).
///
/// Wraps a peripheral or inter-core buffer for the duration of one callback.
#[derive(Debug)]
pub struct AudioBuffer<'a> {
    pub channels: usize,
    pub frames: usize,
    pub data: &'a mut [f32],
}

impl<'a> AudioBuffer<'a> {
    /// Create a new AudioBuffer wrapping existing data.
    #[inline]
    pub fn new(data: &'a mut [f32], channels: usize) -> Self {
        let frames = if channels == 0 { 0 } else { data.len() / channels };
        Self {
            channels,
            frames,
            data,
        }
    }

    #[inline]
    pub fn channel(&self, ch: usize) -> &[f32] {
        let start = ch * self.frames;
        &self.data[start..start + self.frames]
    }

    #[inline]
    pub fn channel_mut(&mut self, ch: usize) -> &mut [f32] {
        let start = ch * self.frames;
        &mut self.data[start..start + self.frames]
    }

    /// Write `src * gain` into every channel.
    #[inline]
    pub fn fill_all_scaled(&mut self, src: &[f32], gain: f32) {
        for ch in 0..self.channels {
            for (out, &s) in self.channel_mut(ch).iter_mut().zip(src) {
                *out = s * gain;
            }
        }
    }
}
