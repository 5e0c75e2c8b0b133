use crate::dsp::delay_line::DelayLine;

const MAX_DELAY_SECS: f32 = 2.0;

/// Feedback delay with independent per-channel buffers and a single shared
/// delay time, optionally derived from a tempo.
pub struct StereoDelay {
    sample_rate: f32,
    delay_secs: f32,
    feedback: f32,
    mix: f32,
    line_l: DelayLine,
    line_r: DelayLine,
}

impl StereoDelay {
    pub fn new(sample_rate: f32) -> Self {
        let capacity = (sample_rate * MAX_DELAY_SECS) as usize + 1;
        Self {
            sample_rate,
            delay_secs: 0.35,
            feedback: 0.35,
            mix: 0.0,
            line_l: DelayLine::new(capacity),
            line_r: DelayLine::new(capacity),
        }
    }

    pub fn reset(&mut self) {
        self.line_l.reset();
        self.line_r.reset();
    }

    /// Time clamps to [0.01, 2.0] s; feedback stays strictly below unity so
    /// the tail always decays.
    pub fn set_params(&mut self, delay_secs: f32, feedback: f32, mix: f32) {
        self.delay_secs = delay_secs.clamp(0.01, MAX_DELAY_SECS);
        self.feedback = feedback.clamp(0.0, 0.95);
        self.mix = mix.clamp(0.0, 1.0);
    }

    /// Derive the delay time from a tempo: `division` is in beats (1.0 = a
    /// quarter note at the given BPM). Non-positive BPM is ignored.
    pub fn set_tempo_sync(&mut self, bpm: f32, division: f32) {
        if bpm <= 0.0 {
            return;
        }
        let beat_secs = 60.0 / bpm;
        self.set_params(beat_secs * division, self.feedback, self.mix);
    }

    #[inline]
    pub fn process(&mut self, left: &mut f32, right: &mut f32) {
        let delay_samples = (self.delay_secs * self.sample_rate) as usize;

        let delayed_l = self.line_l.read_int(delay_samples);
        let delayed_r = self.line_r.read_int(delay_samples);

        self.line_l.push(*left + delayed_l * self.feedback);
        self.line_r.push(*right + delayed_r * self.feedback);

        let dry = 1.0 - self.mix;
        *left = *left * dry + delayed_l * self.mix;
        *right = *right * dry + delayed_r * self.mix;
    }
}
