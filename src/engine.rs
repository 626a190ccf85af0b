// src/engine.rs

use std::sync::Arc;

use crate::audio_buffer::AudioBuffer;
use crate::config::{EngineConfig, VoiceSettings};
use crate::dsp::{Envelope, EnvelopeStage, Oscillator};
use crate::realtime::{DeadlineMonitor, LogOverrun, OverrunHook};
use crate::voice::{VoicePool, VoiceSnapshot};

/// DSP state of one voice, owned by the audio side.
///
/// Follows the published [`VoiceSnapshot`]: a new trigger count starts the
/// attack, a cleared `playing` flag starts the release.
struct VoiceRenderer {
    oscillator: Oscillator,
    envelope: Envelope,
    amplitude: f32,
    trigger_count: u32,
}

impl VoiceRenderer {
    fn new(settings: &VoiceSettings, sample_rate: f32) -> Self {
        Self {
            oscillator: Oscillator::new(settings.waveform, sample_rate),
            envelope: Envelope::new(settings),
            amplitude: 0.0,
            trigger_count: 0,
        }
    }

    #[inline]
    fn render(&mut self, voice: VoiceSnapshot, out: &mut [f32]) {
        if voice.trigger_count != self.trigger_count {
            self.trigger_count = voice.trigger_count;
            if self.envelope.stage() == EnvelopeStage::Idle {
                self.oscillator.reset();
            }
            self.oscillator.set_note(voice.note);
            self.amplitude = voice.amplitude;
            self.envelope.gate_on();
        }
        if !voice.playing {
            self.envelope.gate_off();
        }

        // Idle voices still run the loop so every block costs the same.
        for sample in out.iter_mut() {
            *sample = self.oscillator.next_sample() * self.envelope.next_sample() * self.amplitude;
        }
    }
}

/// Real-time synth block pipeline.
///
/// This struct runs exclusively on the audio thread.
/// It reads the voice pool once per block, never allocates and never blocks;
/// its cost is (voices) x (per-voice render), whatever is playing.
pub struct SynthEngine<H = LogOverrun> {
    pool: Arc<VoicePool>,
    renderers: Box<[VoiceRenderer]>,

    /// Pre-allocated mix bus and per-voice scratch, one block each.
    accum: Box<[f32]>,
    scratch: Box<[f32]>,

    output_gain: f32,
    deadline: DeadlineMonitor<H>,
}

impl SynthEngine {
    /// Engine whose deadline is one block period, logging overruns.
    pub fn new(pool: Arc<VoicePool>, config: &EngineConfig) -> Self {
        Self::with_deadline(pool, config, DeadlineMonitor::new(config.block_duration()))
    }
}

impl<H: OverrunHook> SynthEngine<H> {
    pub fn with_deadline(
        pool: Arc<VoicePool>,
        config: &EngineConfig,
        deadline: DeadlineMonitor<H>,
    ) -> Self {
        let sample_rate = config.sample_rate as f32;
        let renderers = (0..pool.len())
            .map(|_| VoiceRenderer::new(&config.voice, sample_rate))
            .collect();

        Self {
            pool,
            renderers,
            accum: vec![0.0; config.block_size].into_boxed_slice(),
            scratch: vec![0.0; config.block_size].into_boxed_slice(),
            output_gain: config.output_gain,
            deadline,
        }
    }

    pub fn with_overrun_hook<H2: OverrunHook>(self, hook: H2) -> SynthEngine<H2> {
        SynthEngine {
            pool: self.pool,
            renderers: self.renderers,
            accum: self.accum,
            scratch: self.scratch,
            output_gain: self.output_gain,
            deadline: self.deadline.replace_hook(hook),
        }
    }

    /// Render one block into every channel of `output`.
    ///
    /// Called once per audio block from the audio callback. Renders at most
    /// `block_size` frames; any extra frames are left untouched.
    pub fn process(&mut self, output: &mut AudioBuffer) {
        let frames = output.frames.min(self.accum.len());

        let accum = &mut self.accum[..frames];
        let scratch = &mut self.scratch[..frames];
        let renderers = &mut self.renderers;
        let pool = &self.pool;
        let gain = self.output_gain;

        self.deadline.measure(|| {
            accum.fill(0.0);

            for (id, renderer) in renderers.iter_mut().enumerate() {
                let Some(voice) = pool.snapshot(id) else {
                    continue;
                };
                renderer.render(voice, scratch);
                for (a, &s) in accum.iter_mut().zip(scratch.iter()) {
                    *a += s;
                }
            }

            output.fill_all_scaled(accum, gain);
        });
    }

    pub fn block_size(&self) -> usize {
        self.accum.len()
    }

    pub fn overruns(&self) -> u64 {
        self.deadline.overruns()
    }
}
