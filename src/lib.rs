// src/lib.rs
//
// Library entry point: a dual-core polyphonic synthesizer engine driven by
// serial MIDI.

pub mod audio_buffer;
pub mod bridge;
pub mod config;
pub mod control_state;
pub mod dsp;
pub mod effects_chain;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod midi;
pub mod modulation;
pub mod parameter;
pub mod realtime;
pub mod router;
pub mod voice;
pub mod voice_allocator;


// Re-export key types for Rust consumers
pub use audio_buffer::AudioBuffer;
pub use bridge::{
    EffectsAudio, EffectsControl, EffectsCore, SynthAudio, SynthControl, SynthCore,
    create_effects_core, create_synth_core,
};
pub use config::{EngineConfig, VoiceStealing};
pub use error::{ConfigError, Result};
pub use midi::{MidiEvent, MidiEventKind, MidiParser};
pub use router::{AudioRouter, ChannelBank, ChannelId};
