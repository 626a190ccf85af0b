// src/modulation.rs
//
// Control-rate loop mapping MIDI controllers onto effect parameters.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::control_state::ControllerEdges;
use crate::dsp::{DelayControl, FilterControl};

/// Effect parameter a controller can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModulationTarget {
    /// 0 to 0.9 of the controller range.
    DelayFeedback,
    /// 0 to one second of samples.
    DelayLength,
    /// 100 Hz plus up to 3000 Hz.
    FilterCutoff,
}

/// Controller value as a fraction of the full 7-bit range (`value / 128`).
#[inline]
fn fraction(value: u8) -> f32 {
    value as f32 / 128.0
}

pub fn feedback_for(value: u8) -> f32 {
    0.9 * fraction(value)
}

pub fn length_for(value: u8, sample_rate: u32) -> usize {
    (sample_rate as f32 * fraction(value)) as usize
}

pub fn cutoff_for(value: u8) -> f32 {
    3000.0 * fraction(value) + 100.0
}

/// One row of the controller table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulationRoute {
    pub controller: u8,
    pub target: ModulationTarget,
}

impl ModulationRoute {
    pub fn new(controller: u8, target: ModulationTarget) -> Self {
        Self { controller, target }
    }
}

/// Polls the routed controllers and forwards changes to the effect setters.
///
/// Controllers that are not in the table are never looked at.
pub struct ModulationLoop {
    controllers: ControllerEdges,
    routes: Box<[ModulationRoute]>,
    delay: DelayControl,
    filter: FilterControl,
    sample_rate: u32,
}

impl ModulationLoop {
    pub fn new(
        controllers: ControllerEdges,
        routes: &[ModulationRoute],
        delay: DelayControl,
        filter: FilterControl,
        sample_rate: u32,
    ) -> Self {
        Self {
            controllers,
            routes: routes.into(),
            delay,
            filter,
            sample_rate,
        }
    }

    /// One background-loop iteration. Returns the number of parameters changed.
    pub fn tick(&mut self) -> usize {
        let mut applied = 0;
        for route in self.routes.iter() {
            let Some(value) = self.controllers.poll(route.controller) else {
                continue;
            };

            match route.target {
                ModulationTarget::DelayFeedback => {
                    let gain = feedback_for(value);
                    self.delay.set_feedback(gain);
                    debug!("CC{} = {} -> delay feedback {:.3}", route.controller, value, gain);
                }
                ModulationTarget::DelayLength => {
                    let samples = self.delay.set_length(length_for(value, self.sample_rate));
                    debug!("CC{} = {} -> delay length {} samples", route.controller, value, samples);
                }
                ModulationTarget::FilterCutoff => {
                    let hz = cutoff_for(value);
                    self.filter.set_cutoff_frequency(hz);
                    debug!("CC{} = {} -> filter cutoff {:.1} Hz", route.controller, value, hz);
                }
            }
            applied += 1;
        }
        applied
    }

    pub fn delay(&self) -> &DelayControl {
        &self.delay
    }

    pub fn filter(&self) -> &FilterControl {
        &self.filter
    }
}
