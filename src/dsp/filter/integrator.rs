use crate::dsp::filter::clamp_cutoff;
use std::f32::consts::TAU;

/// Trapezoidal (TPT) one-pole integrator, the zero-delay-feedback building
/// block shared by the SVF, ladder, cascade and classical filters.
///
/// With the pre-warped gain `g = tan(pi * fc / fs)`:
///
///   y  = g*x + s
///   s' = g*x + y        (equivalently 2y - s)
///
/// The instantaneous gain G = g/(1+g) and the raw state `s` are exposed so
/// enclosing topologies can solve their feedback loops algebraically before
/// advancing the state.
pub struct TptIntegrator {
    sample_rate: f32,
    s: f32,
    g: f32,
}

impl TptIntegrator {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            s: 0.0,
            g: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.s = 0.0;
    }

    /// Recompute `g` for a new cutoff. Bilinear pre-warp keeps the analog
    /// and digital cutoffs aligned right up to the clamp.
    pub fn prepare(&mut self, cutoff: f32) {
        if self.sample_rate <= 0.0 {
            self.g = 0.0;
            return;
        }
        let cutoff = clamp_cutoff(cutoff, self.sample_rate);
        let wd = TAU * cutoff;
        let t = 1.0 / self.sample_rate;
        let wa = (2.0 / t) * (wd * t / 2.0).tan();
        self.g = wa * t / 2.0;
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let y = self.g * input + self.s;
        self.s = self.g * input + y;
        y
    }

    #[inline]
    pub fn g(&self) -> f32 {
        self.g
    }

    #[inline]
    pub fn state(&self) -> f32 {
        self.s
    }

    #[inline]
    pub fn set_state(&mut self, s: f32) {
        self.s = s;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_matches_prewarp_formula() {
        let sr = 48_000.0;
        let mut int = TptIntegrator::new(sr);
        int.prepare(1_000.0);
        let expected = (std::f32::consts::PI * 1_000.0 / sr).tan();
        assert!((int.g() - expected).abs() < 1e-5);
    }

    #[test]
    fn cutoff_clamps_below_nyquist() {
        let sr = 48_000.0;
        let mut int = TptIntegrator::new(sr);
        int.prepare(1_000_000.0);
        let expected = (std::f32::consts::PI * 0.49 * 0.5 * sr / sr).tan();
        assert!((int.g() - expected).abs() < 1e-3);
        assert!(int.g().is_finite());
    }

    #[test]
    fn integrates_a_constant() {
        let mut int = TptIntegrator::new(48_000.0);
        int.prepare(100.0);
        let mut prev = 0.0;
        for _ in 0..100 {
            let y = int.process(1.0);
            assert!(y > prev);
            prev = y;
        }
    }

    #[test]
    fn state_update_is_two_y_minus_s() {
        let mut int = TptIntegrator::new(48_000.0);
        int.prepare(500.0);
        int.set_state(0.3);
        let s_before = int.state();
        let y = int.process(0.7);
        assert!((int.state() - (2.0 * y - s_before)).abs() < 1e-6);
    }
}
