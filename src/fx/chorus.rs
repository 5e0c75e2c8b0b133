use crate::dsp::delay_line::DelayLine;
use std::f32::consts::{FRAC_PI_2, TAU};

/// Base delay the modulation swings around.
const BASE_DELAY_MS: f32 = 15.0;
/// Maximum modulation depth on top of the base delay.
const DEPTH_MS: f32 = 8.0;
/// Buffer headroom: base + depth never exceeds this.
const MAX_DELAY_MS: f32 = 50.0;

/// Stereo chorus: one modulated delay line per channel, swept by a shared
/// sine LFO read in quadrature (the right channel trails by 90 degrees), so
/// the two channels never peak together.
///
/// The wet signal is fed back through the buffer (the mixed output is what
/// gets written), which thickens the tail the way the classic bucket-brigade
/// units did.
pub struct Chorus {
    sample_rate: f32,
    rate_hz: f32,
    depth: f32,
    mix: f32,
    phase: f32,
    line_l: DelayLine,
    line_r: DelayLine,
}

impl Chorus {
    pub fn new(sample_rate: f32) -> Self {
        let capacity = (sample_rate * MAX_DELAY_MS * 0.001) as usize + 1;
        Self {
            sample_rate,
            rate_hz: 0.25,
            depth: 0.5,
            mix: 0.0,
            phase: 0.0,
            line_l: DelayLine::new(capacity),
            line_r: DelayLine::new(capacity),
        }
    }

    pub fn reset(&mut self) {
        self.line_l.reset();
        self.line_r.reset();
        self.phase = 0.0;
    }

    pub fn set_params(&mut self, rate_hz: f32, depth: f32, mix: f32) {
        self.rate_hz = rate_hz.max(0.0);
        self.depth = depth.clamp(0.0, 1.0);
        self.mix = mix.clamp(0.0, 1.0);
    }

    #[inline]
    pub fn process(&mut self, left: &mut f32, right: &mut f32) {
        let depth_ms = DEPTH_MS * self.depth;

        let lfo_l = self.phase.sin();
        let lfo_r = (self.phase + FRAC_PI_2).sin();

        // Unipolar LFO: delay sweeps [base, base + depth].
        let delay_l =
            (BASE_DELAY_MS + depth_ms * 0.5 * (1.0 + lfo_l)) * 0.001 * self.sample_rate;
        let delay_r =
            (BASE_DELAY_MS + depth_ms * 0.5 * (1.0 + lfo_r)) * 0.001 * self.sample_rate;

        let delayed_l = self.line_l.read(delay_l);
        let delayed_r = self.line_r.read(delay_r);

        let dry = 1.0 - self.mix;
        *left = *left * dry + delayed_l * self.mix;
        *right = *right * dry + delayed_r * self.mix;

        self.line_l.push(*left);
        self.line_r.push(*right);

        self.phase += TAU * self.rate_hz / self.sample_rate;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    #[test]
    fn zero_mix_passes_dry_signal() {
        let mut chorus = Chorus::new(SR);
        chorus.set_params(1.0, 0.5, 0.0);
        let (mut l, mut r) = (0.7, -0.3);
        for _ in 0..1000 {
            chorus.process(&mut l, &mut r);
        }
        assert_eq!(l, 0.7);
        assert_eq!(r, -0.3);
    }

    #[test]
    fn wet_echo_arrives_after_base_delay() {
        let mut chorus = Chorus::new(SR);
        chorus.set_params(0.0, 0.0, 0.5); // no modulation, half wet
        let base_samples = (0.015 * SR) as usize;

        // Impulse in: the dry half passes now, the wet half echoes later.
        let (mut l, mut r) = (1.0, 1.0);
        chorus.process(&mut l, &mut r);
        assert!((l - 0.5).abs() < 1e-6);

        let mut first_hit = None;
        for i in 1..2 * base_samples {
            let (mut l, mut r) = (0.0, 0.0);
            chorus.process(&mut l, &mut r);
            if l.abs() > 0.2 && first_hit.is_none() {
                first_hit = Some(i);
            }
        }
        let hit = first_hit.expect("echo never arrived");
        assert!(
            (hit as i32 - base_samples as i32).abs() <= 2,
            "echo at {hit}, expected near {base_samples}"
        );
    }

    #[test]
    fn channels_are_modulated_in_quadrature() {
        let mut chorus = Chorus::new(SR);
        chorus.set_params(2.0, 1.0, 0.5);
        // Drive with noise-ish input; the channels must decorrelate.
        let mut diff = 0.0f32;
        let mut state = 0x12345678u32;
        for _ in 0..48_000 {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            let x = (state >> 16) as f32 / 32768.0 - 1.0;
            let (mut l, mut r) = (x, x);
            chorus.process(&mut l, &mut r);
            diff += (l - r).abs();
        }
        assert!(diff > 1.0, "identical channels, diff {diff}");
    }

    #[test]
    fn output_stays_finite_with_feedback() {
        let mut chorus = Chorus::new(SR);
        chorus.set_params(5.0, 1.0, 0.9);
        for i in 0..96_000 {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            let (mut l, mut r) = (x, x);
            chorus.process(&mut l, &mut r);
            assert!(l.is_finite() && r.is_finite());
        }
    }
}
