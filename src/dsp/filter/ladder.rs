use crate::dsp::filter::{clamp_cutoff, integrator::TptIntegrator};
use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LadderModel {
    Transistor,
    /// Stand-in: routes through the transistor solve until a true
    /// coupled-stage diode model lands.
    Diode,
}

/// 4-pole transistor-ladder low-pass with tanh saturation at the input and
/// at every stage output.
///
/// The global feedback loop (k = resonance * 4) is solved in closed form
/// before any stage state advances. With per-stage instantaneous gain
/// G = g/(1+g) and state terms S_i = s_i/(1+g):
///
///   u = (tanh(x) - k * (G^3*S_1 + G^2*S_2 + G*S_3 + S_4)) / (1 + k * G^4)
///
/// then u is driven through the four saturated one-pole sections.
pub struct LadderFilter {
    sample_rate: f32,
    model: LadderModel,
    cutoff: f32,
    resonance: f32,
    g: f32,
    stages: [TptIntegrator; 4],
}

impl LadderFilter {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            model: LadderModel::Transistor,
            cutoff: 1_000.0,
            resonance: 0.0,
            g: 0.0,
            stages: [
                TptIntegrator::new(sample_rate),
                TptIntegrator::new(sample_rate),
                TptIntegrator::new(sample_rate),
                TptIntegrator::new(sample_rate),
            ],
        }
    }

    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }

    /// Cutoff in Hz, resonance in [0, 1.2] (self-oscillation territory above
    /// 1.0).
    pub fn set_params(&mut self, model: LadderModel, cutoff: f32, resonance: f32) {
        self.model = model;
        self.cutoff = clamp_cutoff(cutoff, self.sample_rate);
        self.resonance = resonance.clamp(0.0, 1.2);

        if self.sample_rate <= 0.0 {
            self.g = 0.0;
            return;
        }
        let wd = TAU * self.cutoff;
        let t = 1.0 / self.sample_rate;
        let wa = (2.0 / t) * (wd * t / 2.0).tan();
        self.g = wa * t / 2.0;

        for stage in &mut self.stages {
            stage.prepare(self.cutoff);
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        match self.model {
            LadderModel::Transistor => self.process_transistor(input),
            // Falls back to the transistor topology, see LadderModel::Diode.
            LadderModel::Diode => self.process_transistor(input),
        }
    }

    #[inline]
    fn process_transistor(&mut self, input: f32) -> f32 {
        let g = self.g;
        let g_lpf = g / (1.0 + g);
        let beta = g_lpf * g_lpf * g_lpf * g_lpf;

        let s = [
            self.stages[0].state() / (1.0 + g),
            self.stages[1].state() / (1.0 + g),
            self.stages[2].state() / (1.0 + g),
            self.stages[3].state() / (1.0 + g),
        ];
        let s_total = g_lpf * g_lpf * g_lpf * s[0] + g_lpf * g_lpf * s[1] + g_lpf * s[2] + s[3];

        let k = self.resonance * 4.0;
        let u = (input.tanh() - k * s_total) / (1.0 + k * beta);

        let mut v = u.tanh();
        for stage in &mut self.stages {
            let s_i = stage.state();
            let v_out = ((g * v + s_i) / (1.0 + g)).tanh();
            stage.set_state(2.0 * v_out - s_i);
            v = v_out;
        }

        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    #[test]
    fn passes_dc_with_no_resonance() {
        let mut ladder = LadderFilter::new(48_000.0);
        ladder.set_params(LadderModel::Transistor, 5_000.0, 0.0);
        let mut last = 0.0;
        for _ in 0..4000 {
            last = ladder.process(0.5);
        }
        // Four tanh stages compress a 0.5 input down toward ~0.25, still far
        // above the stopband.
        assert!(last > 0.2, "settled to {last}");
    }

    #[test]
    fn attenuates_far_above_cutoff() {
        let sr = 48_000.0;
        let mut ladder = LadderFilter::new(sr);
        ladder.set_params(LadderModel::Transistor, 200.0, 0.0);
        let mut peak = 0.0f32;
        for i in 0..8192 {
            let x = (TAU * 8_000.0 * i as f32 / sr).sin();
            let y = ladder.process(x);
            if i > 2048 {
                peak = peak.max(y.abs());
            }
        }
        // 4-pole rolloff over >5 octaves leaves essentially nothing.
        assert!(peak < 0.01, "stopband peak {peak}");
    }

    #[test]
    fn stays_finite_at_max_resonance() {
        let sr = 48_000.0;
        let mut ladder = LadderFilter::new(sr);
        ladder.set_params(LadderModel::Transistor, 1_000.0, 1.2);
        for i in 0..48_000 {
            let x = (TAU * 1_000.0 * i as f32 / sr).sin();
            assert!(ladder.process(x).is_finite());
        }
    }

    #[test]
    fn output_is_bounded_by_saturation() {
        let mut ladder = LadderFilter::new(48_000.0);
        ladder.set_params(LadderModel::Transistor, 10_000.0, 1.0);
        for i in 0..10_000 {
            let x = if i % 2 == 0 { 10.0 } else { -10.0 };
            let y = ladder.process(x);
            assert!(y.abs() <= 1.0, "tanh stages bound the output, got {y}");
        }
    }

    #[test]
    fn diode_model_matches_transistor_for_now() {
        let sr = 48_000.0;
        let mut a = LadderFilter::new(sr);
        let mut b = LadderFilter::new(sr);
        a.set_params(LadderModel::Transistor, 1_500.0, 0.5);
        b.set_params(LadderModel::Diode, 1_500.0, 0.5);
        for i in 0..1024 {
            let x = (TAU * 440.0 * i as f32 / sr).sin();
            assert_eq!(a.process(x), b.process(x));
        }
    }
}
