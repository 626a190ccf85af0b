// src/config.rs
//
// Startup configuration: sample rate, block size, voice pool size and
// effect defaults. Nothing here is mutable once the engine is built; runtime
// changes go through the effect setters driven by the modulation loop.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dsp::Waveform;
use crate::error::{ConfigError, Result};
use crate::modulation::{ModulationRoute, ModulationTarget};

/// What the allocator does when every voice is already playing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceStealing {
    /// Drop the new note.
    #[default]
    Disabled,
    /// Take over the voice whose note was claimed longest ago.
    OldestFirst,
}

/// Per-voice synthesis settings shared by the whole pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub waveform: Waveform,
    pub attack_samples: u32,
    pub decay_samples: u32,
    /// Sustain level, 0-1
    pub sustain_level: f32,
    pub release_samples: u32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            waveform: Waveform::Triangle,
            attack_samples: 2000,
            decay_samples: 2000,
            sustain_level: 28_000.0 / 32_767.0,
            release_samples: 20_000,
        }
    }
}

/// Low-pass filter stage defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub cutoff_hz: f32,
    pub q: f32,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            cutoff_hz: 3000.0,
            q: 4.0,
        }
    }
}

/// Feedback delay stage defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelaySettings {
    /// Size of the circular buffer, in seconds.
    pub capacity_seconds: f32,
    pub initial_seconds: f32,
    pub feedthrough: f32,
    pub feedback: f32,
    pub dampening: f32,
}

impl Default for DelaySettings {
    fn default() -> Self {
        Self {
            capacity_seconds: 2.0,
            initial_seconds: 0.25,
            feedthrough: 0.8,
            feedback: 0.6,
            dampening: 0.0,
        }
    }
}

/// Engine configuration supplied at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: u32,
    pub block_size: usize,
    pub voices: usize,
    /// Attenuation applied to the summed voices.
    pub output_gain: f32,
    pub stealing: VoiceStealing,
    pub voice: VoiceSettings,
    pub filter: FilterSettings,
    pub delay: DelaySettings,
    pub modulation: Vec<ModulationRoute>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_size: 32,
            voices: 16,
            output_gain: 0.25,
            stealing: VoiceStealing::Disabled,
            voice: VoiceSettings::default(),
            filter: FilterSettings::default(),
            delay: DelaySettings::default(),
            modulation: vec![
                ModulationRoute::new(4, ModulationTarget::DelayFeedback),
                ModulationRoute::new(5, ModulationTarget::DelayLength),
                ModulationRoute::new(6, ModulationTarget::FilterCutoff),
            ],
        }
    }
}

impl EngineConfig {
    /// Parse a YAML document and validate it.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: EngineConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        log::info!("Loading engine config from {:?}", path);
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if self.block_size == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }
        if self.voices == 0 {
            return Err(ConfigError::EmptyVoicePool);
        }

        check_non_negative("output_gain", self.output_gain)?;
        check_non_negative("sustain_level", self.voice.sustain_level)?;
        check_non_negative("filter.cutoff_hz", self.filter.cutoff_hz)?;
        check_non_negative("filter.q", self.filter.q)?;
        check_non_negative("delay.feedthrough", self.delay.feedthrough)?;
        check_non_negative("delay.feedback", self.delay.feedback)?;
        check_non_negative("delay.dampening", self.delay.dampening)?;
        check_non_negative("delay.capacity_seconds", self.delay.capacity_seconds)?;
        check_non_negative("delay.initial_seconds", self.delay.initial_seconds)?;

        let capacity = self.delay_capacity_samples();
        if capacity == 0 {
            return Err(ConfigError::ZeroDelayCapacity);
        }
        let initial = self.delay_initial_samples();
        if initial > capacity {
            return Err(ConfigError::DelayLengthExceedsCapacity {
                length: initial,
                capacity,
            });
        }

        let mut seen = HashSet::new();
        for route in &self.modulation {
            if route.controller > 127 {
                return Err(ConfigError::InvalidController(route.controller));
            }
            if !seen.insert(route.controller) {
                return Err(ConfigError::DuplicateController(route.controller));
            }
        }

        Ok(())
    }

    /// Wall-clock budget for one audio block.
    pub fn block_duration(&self) -> Duration {
        Duration::from_secs_f64(self.block_size as f64 / self.sample_rate as f64)
    }

    pub fn delay_capacity_samples(&self) -> usize {
        (self.delay.capacity_seconds * self.sample_rate as f32) as usize
    }

    pub fn delay_initial_samples(&self) -> usize {
        (self.delay.initial_seconds * self.sample_rate as f32) as usize
    }
}

fn check_non_negative(name: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { name, value })
    }
}
