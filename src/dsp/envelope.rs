// Envelope generator.

use crate::config::VoiceSettings;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Linear ADSR with stage lengths given in samples.
#[derive(Debug, Clone)]
pub struct Envelope {
    stage: EnvelopeStage,
    level: f32,

    attack_rate: f32,
    decay_rate: f32,
    sustain: f32,
    release_samples: f32,
    release_rate: f32,
}

impl Envelope {
    pub fn new(settings: &VoiceSettings) -> Self {
        let sustain = settings.sustain_level.clamp(0.0, 1.0);
        Self {
            stage: EnvelopeStage::Idle,
            level: 0.0,
            attack_rate: 1.0 / (settings.attack_samples.max(1) as f32),
            decay_rate: (1.0 - sustain) / (settings.decay_samples.max(1) as f32),
            sustain,
            release_samples: settings.release_samples.max(1) as f32,
            release_rate: 0.0,
        }
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    /// Start the attack from the current level.
    pub fn gate_on(&mut self) {
        self.stage = EnvelopeStage::Attack;
    }

    /// Enter the release stage from whatever level has been reached.
    pub fn gate_off(&mut self) {
        if matches!(self.stage, EnvelopeStage::Idle | EnvelopeStage::Release) {
            return;
        }
        self.release_rate = self.level / self.release_samples;
        self.stage = EnvelopeStage::Release;
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => 0.0,

            EnvelopeStage::Attack => {
                self.level += self.attack_rate;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvelopeStage::Decay;
                }
                self.level
            }

            EnvelopeStage::Decay => {
                self.level -= self.decay_rate;
                if self.level <= self.sustain {
                    self.level = self.sustain;
                    self.stage = EnvelopeStage::Sustain;
                }
                self.level
            }

            EnvelopeStage::Sustain => self.sustain,

            EnvelopeStage::Release => {
                self.level -= self.release_rate;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Idle;
                }
                self.level
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> VoiceSettings {
        VoiceSettings {
            attack_samples: 4,
            decay_samples: 2,
            sustain_level: 0.5,
            release_samples: 10,
            ..VoiceSettings::default()
        }
    }

    #[test]
    fn test_idle_is_silent() {
        let mut env = Envelope::new(&settings());
        assert_eq!(env.next_sample(), 0.0);
        env.gate_off();
        assert_eq!(env.stage(), EnvelopeStage::Idle);
    }

    #[test]
    fn test_full_cycle() {
        let mut env = Envelope::new(&settings());
        env.gate_on();
        let attack: Vec<f32> = (0..4).map(|_| env.next_sample()).collect();
        assert_eq!(attack, vec![0.25, 0.5, 0.75, 1.0]);
        assert_eq!(env.next_sample(), 0.75);
        assert_eq!(env.next_sample(), 0.5);
        assert_eq!(env.stage(), EnvelopeStage::Sustain);

        env.gate_off();
        // 10 samples of release, plus one for rounding
        for _ in 0..11 {
            env.next_sample();
        }
        assert_eq!(env.stage(), EnvelopeStage::Idle);
        assert_eq!(env.next_sample(), 0.0);
    }

    #[test]
    fn test_release_during_attack_starts_from_current_level() {
        let mut env = Envelope::new(&settings());
        env.gate_on();
        env.next_sample();
        env.next_sample();
        env.gate_off();
        let first = env.next_sample();
        assert!((first - 0.45).abs() < 1e-6);
    }
}
