// src/effects_chain.rs
//
// Audio-rate effects block: input -> low-pass -> feedback delay -> outputs.
//
// Channel layout (planar, stereo pairs):
// - input channel 0 is the processed source
// - output channels 0 and 1 receive the processed signal
// - channels 2.. are auxiliary pairs passed through unchanged

use crate::audio_buffer::AudioBuffer;
use crate::dsp::{BiquadFilter, DelayLine};
use crate::realtime::{DeadlineMonitor, LogOverrun, OverrunHook};

const PROCESSED_CHANNELS: usize = 2;

pub struct EffectsChain<H = LogOverrun> {
    filter: BiquadFilter,
    delay: DelayLine,

    filtered: Box<[f32]>,
    delayed: Box<[f32]>,

    deadline: DeadlineMonitor<H>,
}

impl<H: OverrunHook> EffectsChain<H> {
    pub fn new(
        filter: BiquadFilter,
        delay: DelayLine,
        block_size: usize,
        deadline: DeadlineMonitor<H>,
    ) -> Self {
        Self {
            filter,
            delay,
            filtered: vec![0.0; block_size].into_boxed_slice(),
            delayed: vec![0.0; block_size].into_boxed_slice(),
            deadline,
        }
    }

    pub fn with_overrun_hook<H2: OverrunHook>(self, hook: H2) -> EffectsChain<H2> {
        EffectsChain {
            filter: self.filter,
            delay: self.delay,
            filtered: self.filtered,
            delayed: self.delayed,
            deadline: self.deadline.replace_hook(hook),
        }
    }

    /// Process one block.
    ///
    /// Output channels with no input counterpart are cleared.
    pub fn process(&mut self, input: &AudioBuffer, output: &mut AudioBuffer) {
        let frames = input.frames.min(output.frames).min(self.filtered.len());

        let filtered = &mut self.filtered[..frames];
        let delayed = &mut self.delayed[..frames];
        let filter = &mut self.filter;
        let delay = &mut self.delay;

        self.deadline.measure(|| {
            if input.channels > 0 {
                filter.process(&input.channel(0)[..frames], filtered);
            } else {
                filtered.fill(0.0);
            }
            delay.process(filtered, delayed);

            for ch in 0..output.channels {
                let out = &mut output.channel_mut(ch)[..frames];
                if ch < PROCESSED_CHANNELS {
                    out.copy_from_slice(delayed);
                } else if ch < input.channels {
                    out.copy_from_slice(&input.channel(ch)[..frames]);
                } else {
                    out.fill(0.0);
                }
            }
        });
    }

    pub fn delay(&self) -> &DelayLine {
        &self.delay
    }

    pub fn filter(&self) -> &BiquadFilter {
        &self.filter
    }

    pub fn overruns(&self) -> u64 {
        self.deadline.overruns()
    }
}
