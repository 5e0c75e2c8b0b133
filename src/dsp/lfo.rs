//! Low-frequency oscillator for control-rate modulation.
//!
//! Same waveform math as [`crate::dsp::oscillator`], but the output is scaled
//! by a depth in [0, 1] and the phase runs free: note retriggers never reset
//! it, so every note catches the LFO wherever it happens to be.

use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LfoShape {
    Sine,
    Triangle,
    Square,
    Saw,
}

pub struct Lfo {
    sample_rate: f32,
    phase: f32,
    phase_inc: f32,
    depth: f32,
    shape: LfoShape,
}

impl Lfo {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            phase: 0.0,
            phase_inc: 0.0,
            depth: 0.0,
            shape: LfoShape::Sine,
        }
    }

    pub fn set_rate(&mut self, hz: f32) {
        if self.sample_rate > 0.0 {
            self.phase_inc = hz.max(0.0) / self.sample_rate;
        }
    }

    pub fn set_depth(&mut self, depth: f32) {
        self.depth = depth.clamp(0.0, 1.0);
    }

    pub fn set_shape(&mut self, shape: LfoShape) {
        self.shape = shape;
    }

    /// Render one bipolar sample scaled by depth: range [-depth, depth].
    #[inline]
    pub fn process(&mut self) -> f32 {
        let out = match self.shape {
            LfoShape::Sine => (TAU * self.phase).sin(),
            LfoShape::Triangle => 4.0 * (self.phase - 0.5).abs() - 1.0,
            LfoShape::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            LfoShape::Saw => 2.0 * self.phase - 1.0,
        };

        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        out * self.depth
    }
}
