//! Wiring between MIDI ingestion, the control-rate loops and the audio callbacks.
//!
//! The system runs as two cores, each with one control-rate task and one
//! audio-rate task:
//!
//! - **Synth core**: [`MidiInput`] (receive path) writes note and controller
//!   values; [`SynthControl`] turns note edges into voice claims;
//!   [`SynthAudio`] renders the voice pool.
//! - **Effects core**: [`EffectsControl`] turns controller edges into effect
//!   parameters; [`EffectsAudio`] runs filter and delay.
//!
//! Every handle is `Send` but not `Clone`. Moving each into its own thread
//! or callback is the only sharing there is; values cross between tasks
//! through atomics and become visible within one block.
//!
//! # Usage
//!
//! ```ignore
//! let synth = create_synth_core(&config)?;
//! let effects = create_effects_core(&config, synth.controllers)?;
//!
//! // Receive path
//! synth.input.feed(byte);
//!
//! // Background loops
//! synth.control.tick();
//! effects.control.tick();
//!
//! // Audio callbacks
//! synth.audio.process(&mut synth_out);
//! effects.audio.process(&synth_out, &mut effects_out);
//! ```

use std::sync::Arc;

use crate::audio_buffer::AudioBuffer;
use crate::config::EngineConfig;
use crate::control_state::{ControllerEdges, NoteEdges, control_state};
use crate::dsp::{delay, filter};
use crate::effects_chain::EffectsChain;
use crate::engine::SynthEngine;
use crate::error::Result;
use crate::ingest::MidiInput;
use crate::modulation::ModulationLoop;
use crate::realtime::{DeadlineMonitor, LogOverrun, OverrunHook};
use crate::voice::VoicePool;
use crate::voice_allocator::VoiceAllocator;

/// Handles for the synth core.
pub struct SynthCore {
    pub input: MidiInput,
    pub control: SynthControl,
    pub audio: SynthAudio,
    /// Reader for controller values, handed to [`create_effects_core`].
    pub controllers: ControllerEdges,
}

/// Handles for the effects core.
pub struct EffectsCore {
    pub control: EffectsControl,
    pub audio: EffectsAudio,
}

/// Build the synth core from a validated configuration.
pub fn create_synth_core(config: &EngineConfig) -> Result<SynthCore> {
    config.validate()?;

    let (writer, notes, controllers) = control_state();
    let pool = Arc::new(VoicePool::new(config.voices));

    Ok(SynthCore {
        input: MidiInput::new(writer),
        control: SynthControl {
            notes,
            allocator: VoiceAllocator::new(Arc::clone(&pool), config.stealing),
        },
        audio: SynthAudio {
            engine: SynthEngine::new(pool, config),
        },
        controllers,
    })
}

/// Build the effects core, driven by the synth core's controller reader.
pub fn create_effects_core(
    config: &EngineConfig,
    controllers: ControllerEdges,
) -> Result<EffectsCore> {
    config.validate()?;

    let sample_rate = config.sample_rate as f32;
    let (filter, filter_control) = filter(&config.filter, sample_rate);
    let (delay, delay_control) = delay(&config.delay, sample_rate);

    Ok(EffectsCore {
        control: EffectsControl {
            modulation: ModulationLoop::new(
                controllers,
                &config.modulation,
                delay_control,
                filter_control,
                config.sample_rate,
            ),
        },
        audio: EffectsAudio {
            chain: EffectsChain::new(
                filter,
                delay,
                config.block_size,
                DeadlineMonitor::new(config.block_duration()),
            ),
        },
    })
}

// ═══════════════════════════════════════════════════════════════════
// Synth core
// ═══════════════════════════════════════════════════════════════════

/// Background loop of the synth core: note edges to voice claims.
pub struct SynthControl {
    notes: NoteEdges,
    allocator: VoiceAllocator,
}

impl SynthControl {
    /// One scan of all notes. Returns the number of edges handled.
    pub fn tick(&mut self) -> usize {
        let mut edges = 0;
        for (note, velocity) in self.notes.changes() {
            self.allocator.apply(note, velocity);
            edges += 1;
        }
        edges
    }

    pub fn allocator(&self) -> &VoiceAllocator {
        &self.allocator
    }
}

/// Audio callback of the synth core.
pub struct SynthAudio<H = LogOverrun> {
    engine: SynthEngine<H>,
}

impl<H: OverrunHook> SynthAudio<H> {
    pub fn with_overrun_hook<H2: OverrunHook>(self, hook: H2) -> SynthAudio<H2> {
        SynthAudio {
            engine: self.engine.with_overrun_hook(hook),
        }
    }

    #[inline]
    pub fn process(&mut self, output: &mut AudioBuffer) {
        self.engine.process(output);
    }

    pub fn block_size(&self) -> usize {
        self.engine.block_size()
    }

    pub fn overruns(&self) -> u64 {
        self.engine.overruns()
    }
}

// ═══════════════════════════════════════════════════════════════════
// Effects core
// ═══════════════════════════════════════════════════════════════════

/// Background loop of the effects core: controller edges to effect parameters.
pub struct EffectsControl {
    modulation: ModulationLoop,
}

impl EffectsControl {
    /// Returns the number of parameters changed.
    pub fn tick(&mut self) -> usize {
        self.modulation.tick()
    }

    pub fn modulation(&self) -> &ModulationLoop {
        &self.modulation
    }
}

/// Audio callback of the effects core.
pub struct EffectsAudio<H = LogOverrun> {
    chain: EffectsChain<H>,
}

impl<H: OverrunHook> EffectsAudio<H> {
    pub fn with_overrun_hook<H2: OverrunHook>(self, hook: H2) -> EffectsAudio<H2> {
        EffectsAudio {
            chain: self.chain.with_overrun_hook(hook),
        }
    }

    #[inline]
    pub fn process(&mut self, input: &AudioBuffer, output: &mut AudioBuffer) {
        self.chain.process(input, output);
    }

    pub fn chain(&self) -> &EffectsChain<H> {
        &self.chain
    }

    pub fn overruns(&self) -> u64 {
        self.chain.overruns()
    }
}
