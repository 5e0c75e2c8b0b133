//! Stereo post-processing chain, independent of the voice engine: it
//! consumes whatever stereo pair it is handed.

pub mod chorus;
pub mod delay;
pub mod limiter;

pub use chorus::Chorus;
pub use delay::StereoDelay;
pub use limiter::LookaheadLimiter;

/// Chorus → delay → limiter, processed in place.
pub struct FxChain {
    chorus: Chorus,
    delay: StereoDelay,
    limiter: LookaheadLimiter,
}

impl FxChain {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            chorus: Chorus::new(sample_rate),
            delay: StereoDelay::new(sample_rate),
            limiter: LookaheadLimiter::new(sample_rate),
        }
    }

    pub fn reset(&mut self) {
        self.chorus.reset();
        self.delay.reset();
        self.limiter.reset();
    }

    pub fn set_chorus(&mut self, rate_hz: f32, depth: f32, mix: f32) {
        self.chorus.set_params(rate_hz, depth, mix);
    }

    pub fn set_delay(&mut self, delay_secs: f32, feedback: f32, mix: f32) {
        self.delay.set_params(delay_secs, feedback, mix);
    }

    pub fn set_delay_tempo(&mut self, bpm: f32, division: f32) {
        self.delay.set_tempo_sync(bpm, division);
    }

    pub fn set_limiter(&mut self, threshold: f32, lookahead_ms: f32, release_ms: f32) {
        self.limiter.set_params(threshold, lookahead_ms, release_ms);
    }

    #[inline]
    pub fn process(&mut self, left: &mut f32, right: &mut f32) {
        self.chorus.process(left, right);
        self.delay.process(left, right);
        self.limiter.process(left, right);
    }
}
