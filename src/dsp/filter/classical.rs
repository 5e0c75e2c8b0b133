use crate::dsp::filter::svf::Svf;
use std::f32::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const MAX_PAIRS: usize = 4;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassicalType {
    Butterworth,
    /// Equiripple passband; steeper knee at the cost of ripple.
    Chebyshev1,
}

/// Textbook even-order low-pass built as a cascade of second-order SVF
/// sections, each tuned to the Q its pole pair demands.
///
/// Orders 2..=8. Stage storage is a fixed array so reconfiguring never
/// allocates; only the first `order/2` sections run.
pub struct ClassicalFilter {
    sample_rate: f32,
    filter_type: ClassicalType,
    order: usize,
    ripple_db: f32,
    cutoff: f32,

    q_factors: [f32; MAX_PAIRS],
    stages: [Svf; MAX_PAIRS],
    active_pairs: usize,
}

impl ClassicalFilter {
    pub fn new(sample_rate: f32) -> Self {
        let mut filter = Self {
            sample_rate,
            filter_type: ClassicalType::Butterworth,
            order: 4,
            ripple_db: 1.0,
            cutoff: 1_000.0,
            q_factors: [0.707; MAX_PAIRS],
            stages: [
                Svf::new(sample_rate),
                Svf::new(sample_rate),
                Svf::new(sample_rate),
                Svf::new(sample_rate),
            ],
            active_pairs: 2,
        };
        filter.calculate_poles();
        filter
    }

    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }

    /// Order is forced even and clamped to 2..=8; ripple (Chebyshev only)
    /// floors at 0.01 dB.
    pub fn set_config(&mut self, filter_type: ClassicalType, order: usize, ripple_db: f32) {
        self.filter_type = filter_type;
        let mut order = order.max(2);
        if order % 2 != 0 {
            order += 1;
        }
        self.order = order.min(2 * MAX_PAIRS);
        self.ripple_db = ripple_db.max(0.01);
        self.calculate_poles();
    }

    pub fn set_cutoff(&mut self, cutoff: f32) {
        self.cutoff = super::clamp_cutoff(cutoff, self.sample_rate);
        for i in 0..self.active_pairs {
            self.stages[i].set_params(self.cutoff, self.q_factors[i]);
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let mut out = input;
        for stage in &mut self.stages[..self.active_pairs] {
            out = stage.process_lp(out);
        }
        out
    }

    fn calculate_poles(&mut self) {
        self.active_pairs = self.order / 2;
        let order = self.order as f32;

        match self.filter_type {
            ClassicalType::Butterworth => {
                for k in 1..=self.active_pairs {
                    let angle = (2.0 * k as f32 + order - 1.0) * PI / (2.0 * order);
                    self.q_factors[k - 1] = -1.0 / (2.0 * angle.cos());
                }
            }
            ClassicalType::Chebyshev1 => {
                let eps = (10.0f32.powf(self.ripple_db / 10.0) - 1.0).sqrt();
                let a = (1.0 / eps).asinh() / order;
                let sinh_a = a.sinh();
                let cosh_a = a.cosh();

                for k in 1..=self.active_pairs {
                    let theta = (2.0 * k as f32 - 1.0) * PI / (2.0 * order);
                    let re = -sinh_a * theta.sin();
                    let im = cosh_a * theta.cos();
                    let mag = (re * re + im * im).sqrt();
                    self.q_factors[k - 1] = mag / (-2.0 * re);
                }
            }
        }

        for i in 0..self.active_pairs {
            self.stages[i].set_params(self.cutoff, self.q_factors[i]);
        }
    }
}
