use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Saw,
    Square,
    Triangle,
    Sine,
}

/// Naive (non-band-limited) phase-accumulator oscillator.
///
/// Phase lives in [0, 1) and wraps after every sample:
///   saw      = 2*phase - 1
///   square   = +1 below the pulse width, -1 above
///   triangle = 4*|phase - 0.5| - 1
///   sine     = sin(2*pi*phase)
pub struct Oscillator {
    sample_rate: f32,
    phase: f32,
    phase_inc: f32,
    pulse_width: f32,
    waveform: Waveform,
}

impl Oscillator {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            phase: 0.0,
            phase_inc: 0.0,
            pulse_width: 0.5,
            waveform: Waveform::Saw,
        }
    }

    pub fn set_frequency(&mut self, freq: f32) {
        if self.sample_rate > 0.0 {
            self.phase_inc = freq / self.sample_rate;
        }
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Pulse width for the square wave, clamped to (0.01, 0.99) so the
    /// output never collapses to DC.
    pub fn set_pulse_width(&mut self, pw: f32) {
        self.pulse_width = pw.clamp(0.01, 0.99);
    }

    pub fn pulse_width(&self) -> f32 {
        self.pulse_width
    }

    /// Reset phase to zero (hard retrigger).
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Render one sample in [-1, 1] and advance the phase.
    #[inline]
    pub fn process(&mut self) -> f32 {
        let out = match self.waveform {
            Waveform::Saw => 2.0 * self.phase - 1.0,
            Waveform::Square => {
                if self.phase < self.pulse_width {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => 4.0 * (self.phase - 0.5).abs() - 1.0,
            Waveform::Sine => (TAU * self.phase).sin(),
        };

        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        out
    }
}
