use crate::dsp::filter::clamp_cutoff;
use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiquadType {
    LowPass,
    HighPass,
    BandPass,
    Notch,
}

/// RBJ cookbook biquad in direct-form-II-transposed: two state registers,
/// coefficients recomputed only when parameters change.
pub struct Biquad {
    sample_rate: f32,
    filter_type: BiquadType,
    cutoff: f32,
    q: f32,

    // Normalized coefficients (a* feedforward, b* feedback)
    a0: f32,
    a1: f32,
    a2: f32,
    b1: f32,
    b2: f32,

    z1: f32,
    z2: f32,
}

impl Biquad {
    pub fn new(sample_rate: f32) -> Self {
        let mut bq = Self {
            sample_rate,
            filter_type: BiquadType::LowPass,
            cutoff: 1_000.0,
            q: 0.707,
            a0: 0.0,
            a1: 0.0,
            a2: 0.0,
            b1: 0.0,
            b2: 0.0,
            z1: 0.0,
            z2: 0.0,
        };
        bq.calculate_coefficients();
        bq
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    pub fn set_params(&mut self, filter_type: BiquadType, cutoff: f32, q: f32) {
        self.filter_type = filter_type;
        self.cutoff = clamp_cutoff(cutoff, self.sample_rate);
        self.q = q.max(0.01);
        self.calculate_coefficients();
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let out = input * self.a0 + self.z1;
        self.z1 = input * self.a1 + self.z2 - self.b1 * out;
        self.z2 = input * self.a2 - self.b2 * out;
        out
    }

    fn calculate_coefficients(&mut self) {
        if self.sample_rate <= 0.0 {
            return;
        }

        let omega = TAU * self.cutoff / self.sample_rate;
        let sn = omega.sin();
        let cs = omega.cos();
        let alpha = sn / (2.0 * self.q);

        let (b0, b1, b2, a0, a1, a2) = match self.filter_type {
            BiquadType::LowPass => (
                (1.0 - cs) / 2.0,
                1.0 - cs,
                (1.0 - cs) / 2.0,
                1.0 + alpha,
                -2.0 * cs,
                1.0 - alpha,
            ),
            BiquadType::HighPass => (
                (1.0 + cs) / 2.0,
                -(1.0 + cs),
                (1.0 + cs) / 2.0,
                1.0 + alpha,
                -2.0 * cs,
                1.0 - alpha,
            ),
            BiquadType::BandPass => (alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cs, 1.0 - alpha),
            BiquadType::Notch => (1.0, -2.0 * cs, 1.0, 1.0 + alpha, -2.0 * cs, 1.0 - alpha),
        };

        let inv_a0 = 1.0 / a0;
        self.a0 = b0 * inv_a0;
        self.a1 = b1 * inv_a0;
        self.a2 = b2 * inv_a0;
        self.b1 = a1 * inv_a0;
        self.b2 = a2 * inv_a0;
    }
}
