/// Fixed-capacity circular delay buffer with linear-interpolated reads.
///
/// Capacity is set once at construction and never grows, so `push`/`read`
/// are safe in the render path.
pub struct DelayLine {
    buffer: Vec<f32>,
    write_head: usize,
}

impl DelayLine {
    pub fn new(max_delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; max_delay_samples.max(1)],
            write_head: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.buffer[self.write_head] = sample;
        self.write_head = (self.write_head + 1) % self.buffer.len();
    }

    /// Read `delay_samples` behind the most recent write, with linear
    /// interpolation on the fractional part. Delay 0 reads the sample just
    /// pushed; delays past capacity clamp to the oldest sample.
    #[inline]
    pub fn read(&self, delay_samples: f32) -> f32 {
        let capacity = self.buffer.len();
        let delay = delay_samples.clamp(0.0, (capacity - 1) as f32);

        let mut read_pos = self.write_head as f32 - 1.0 - delay;
        while read_pos < 0.0 {
            read_pos += capacity as f32;
        }

        let idx0 = read_pos as usize % capacity;
        let idx1 = (idx0 + 1) % capacity;
        let frac = read_pos - read_pos.floor();

        self.buffer[idx0] * (1.0 - frac) + self.buffer[idx1] * frac
    }

    /// Read at an integer delay, no interpolation.
    #[inline]
    pub fn read_int(&self, delay_samples: usize) -> f32 {
        let capacity = self.buffer.len();
        let delay = delay_samples.min(capacity - 1);
        let read_pos = (self.write_head + capacity - 1 - delay) % capacity;
        self.buffer[read_pos]
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_head = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_delay_round_trips() {
        let mut line = DelayLine::new(64);
        for i in 0..64 {
            line.push(i as f32);
        }
        // Most recent write was 63; a delay of 10 reads 53.
        assert_eq!(line.read(10.0), 53.0);
        assert_eq!(line.read_int(10), 53.0);
    }

    #[test]
    fn fractional_delay_interpolates() {
        let mut line = DelayLine::new(16);
        line.push(0.0);
        line.push(1.0);
        // Halfway between the two pushed samples
        let v = line.read(0.5);
        assert!((v - 0.5).abs() < 1e-6);
    }

    #[test]
    fn delay_zero_reads_last_write() {
        let mut line = DelayLine::new(8);
        line.push(0.25);
        assert_eq!(line.read(0.0), 0.25);
    }

    #[test]
    fn oversized_delay_clamps() {
        let mut line = DelayLine::new(4);
        for v in [1.0, 2.0, 3.0, 4.0] {
            line.push(v);
        }
        // Delay beyond capacity reads the oldest retrievable sample.
        assert_eq!(line.read(100.0), line.read(3.0));
    }

    #[test]
    fn reset_clears_contents() {
        let mut line = DelayLine::new(8);
        line.push(1.0);
        line.reset();
        assert_eq!(line.read(0.0), 0.0);
    }
}
