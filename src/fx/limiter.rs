use crate::dsp::delay_line::DelayLine;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy)]
struct PeakEntry {
    index: i64,
    value: f32,
}

/// Look-ahead brickwall limiter.
///
/// The signal is delayed by the look-ahead window while a monotonic
/// decreasing deque tracks the true peak over that window, so the gain can
/// come down before a transient reaches the output. Reduction is applied
/// instantly; recovery follows a one-pole release toward unity.
///
/// The deque is bounded by the window length and preallocated, so the render
/// path stays allocation-free.
pub struct LookaheadLimiter {
    sample_rate: f32,
    threshold: f32,
    lookahead_ms: f32,
    release_coeff: f32,

    window: usize,
    gain: f32,
    sample_index: i64,
    peaks: VecDeque<PeakEntry>,
    line_l: DelayLine,
    line_r: DelayLine,
}

impl LookaheadLimiter {
    pub fn new(sample_rate: f32) -> Self {
        let mut limiter = Self {
            sample_rate,
            threshold: 0.95,
            lookahead_ms: 5.0,
            release_coeff: 0.0,
            window: 1,
            gain: 1.0,
            sample_index: 0,
            peaks: VecDeque::new(),
            line_l: DelayLine::new(1),
            line_r: DelayLine::new(1),
        };
        limiter.set_release(50.0);
        limiter.rebuild_window();
        limiter
    }

    pub fn reset(&mut self) {
        self.line_l.reset();
        self.line_r.reset();
        self.peaks.clear();
        self.gain = 1.0;
        self.sample_index = 0;
    }

    pub fn set_params(&mut self, threshold: f32, lookahead_ms: f32, release_ms: f32) {
        self.threshold = threshold.clamp(0.01, 1.0);
        self.set_release(release_ms);

        let lookahead = lookahead_ms.clamp(0.0, 50.0);
        if lookahead != self.lookahead_ms {
            self.lookahead_ms = lookahead;
            self.rebuild_window();
        }
    }

    /// Latency introduced by the look-ahead, in samples.
    pub fn latency(&self) -> usize {
        self.window - 1
    }

    #[inline]
    pub fn process(&mut self, left: &mut f32, right: &mut f32) {
        let peak = left.abs().max(right.abs());

        // Monotonic window maximum: drop entries this peak supersedes, then
        // expire entries older than the window.
        while matches!(self.peaks.back(), Some(back) if back.value <= peak) {
            self.peaks.pop_back();
        }
        self.peaks.push_back(PeakEntry {
            index: self.sample_index,
            value: peak,
        });
        let min_index = self.sample_index - (self.window as i64 - 1);
        while matches!(self.peaks.front(), Some(front) if front.index < min_index) {
            self.peaks.pop_front();
        }

        let max_peak = self.peaks.front().map_or(0.0, |p| p.value);
        let target_gain = if max_peak > self.threshold {
            self.threshold / max_peak
        } else {
            1.0
        };

        if target_gain < self.gain {
            self.gain = target_gain;
        } else {
            self.gain += (target_gain - self.gain) * self.release_coeff;
        }

        self.line_l.push(*left);
        self.line_r.push(*right);
        *left = self.line_l.read_int(self.window - 1) * self.gain;
        *right = self.line_r.read_int(self.window - 1) * self.gain;

        self.sample_index += 1;
    }

    fn set_release(&mut self, release_ms: f32) {
        let release_ms = release_ms.clamp(1.0, 500.0);
        self.release_coeff = 1.0 - (-1.0 / (release_ms * 0.001 * self.sample_rate)).exp();
    }

    fn rebuild_window(&mut self) {
        self.window = ((self.lookahead_ms * 0.001 * self.sample_rate) as usize).max(1);
        self.line_l = DelayLine::new(self.window);
        self.line_r = DelayLine::new(self.window);
        self.peaks = VecDeque::with_capacity(self.window + 1);
        self.gain = 1.0;
        self.sample_index = 0;
    }
}
