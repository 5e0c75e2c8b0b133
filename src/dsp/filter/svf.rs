use crate::dsp::filter::{clamp_cutoff, integrator::TptIntegrator};

/// Simultaneous outputs of one SVF pass.
pub struct SvfOutputs {
    pub lp: f32,
    pub bp: f32,
    pub hp: f32,
}

/// Zero-delay-feedback state-variable filter: two TPT integrators in a
/// feedback loop.
///
/// The high-pass output is solved algebraically from the integrators' stored
/// state each sample, closing the loop without a unit delay:
///
///   hp = (x - (2R + g)*s1 - s2) / (1 + 2Rg + g^2),   R = 1/(2Q)
///
/// then bp = integrate(hp), lp = integrate(bp).
pub struct Svf {
    sample_rate: f32,
    cutoff: f32,
    q: f32,
    integrator1: TptIntegrator,
    integrator2: TptIntegrator,
}

impl Svf {
    pub fn new(sample_rate: f32) -> Self {
        let mut svf = Self {
            sample_rate,
            cutoff: 1_000.0,
            q: 0.707,
            integrator1: TptIntegrator::new(sample_rate),
            integrator2: TptIntegrator::new(sample_rate),
        };
        svf.prepare();
        svf
    }

    pub fn reset(&mut self) {
        self.integrator1.reset();
        self.integrator2.reset();
    }

    /// Cutoff in Hz (clamped below Nyquist), Q floored at 0.05.
    pub fn set_params(&mut self, cutoff: f32, q: f32) {
        self.cutoff = clamp_cutoff(cutoff, self.sample_rate);
        self.q = q.max(0.05);
        self.prepare();
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> SvfOutputs {
        let g = self.integrator1.g();
        let r = 1.0 / (2.0 * self.q);
        let s1 = self.integrator1.state();
        let s2 = self.integrator2.state();

        let denominator = 1.0 + 2.0 * r * g + g * g;
        let hp = (input - (2.0 * r + g) * s1 - s2) / denominator;

        let bp = self.integrator1.process(hp);
        let lp = self.integrator2.process(bp);

        SvfOutputs { lp, bp, hp }
    }

    #[inline]
    pub fn process_lp(&mut self, input: f32) -> f32 {
        self.process(input).lp
    }

    fn prepare(&mut self) {
        self.integrator1.prepare(self.cutoff);
        self.integrator2.prepare(self.cutoff);
    }
}
