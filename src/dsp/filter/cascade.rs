use crate::dsp::filter::svf::Svf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which stage the cascade's output (and feedback) is tapped from.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slope {
    Db12,
    Db24,
}

/// Prophet-style cascade: two identical SVF low-pass stages in series with a
/// saturated global feedback loop.
///
/// The feedback is taken from the selected tap's previous output (one sample
/// of delay in the loop, unlike the ZDF ladder) and folded into the input
/// through tanh, which is what gives this topology its growl when pushed.
pub struct CascadeFilter {
    cutoff: f32,
    resonance: f32,
    feedback_gain: f32,
    slope: Slope,

    last_out_12: f32,
    last_out_24: f32,

    stage1: Svf,
    stage2: Svf,
}

impl CascadeFilter {
    pub fn new(sample_rate: f32) -> Self {
        let mut cascade = Self {
            cutoff: 1_000.0,
            resonance: 0.0,
            feedback_gain: 0.0,
            slope: Slope::Db24,
            last_out_12: 0.0,
            last_out_24: 0.0,
            stage1: Svf::new(sample_rate),
            stage2: Svf::new(sample_rate),
        };
        cascade.update_stages();
        cascade
    }

    pub fn reset(&mut self) {
        self.stage1.reset();
        self.stage2.reset();
        self.last_out_12 = 0.0;
        self.last_out_24 = 0.0;
    }

    /// Cutoff clamps to the audible band, resonance to [0, 1].
    pub fn set_params(&mut self, cutoff: f32, resonance: f32, slope: Slope) {
        self.cutoff = cutoff.clamp(20.0, 20_000.0);
        self.resonance = resonance.clamp(0.0, 1.0);
        self.slope = slope;
        self.update_stages();
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let feedback = match self.slope {
            Slope::Db24 => self.last_out_24,
            Slope::Db12 => self.last_out_12,
        };
        let driven = (input - feedback * self.feedback_gain).tanh();

        let out1 = self.stage1.process_lp(driven);
        let out2 = self.stage2.process_lp(out1);

        self.last_out_12 = out1;
        self.last_out_24 = out2;

        match self.slope {
            Slope::Db24 => out2,
            Slope::Db12 => out1,
        }
    }

    fn update_stages(&mut self) {
        let q = (0.5 + self.resonance * 9.5).clamp(0.5, 12.0);
        self.stage1.set_params(self.cutoff, q);
        self.stage2.set_params(self.cutoff, q);
        self.feedback_gain = self.resonance * 1.6;
    }
}
