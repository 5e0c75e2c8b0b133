/*
ADSR Envelope
=============

Linear-segment ADSR with per-segment increments precomputed at set_params
time, so the per-sample path is a branch and an add.

  Level
    1.0 ┐     ╱╲
        │    ╱  ╲___________
    S   │   ╱               ╲
        │  ╱                 ╲
    0.0 └─╱───────────────────╲──→ Time
        Attack Decay  Sustain  Release

State machine: Idle →(note_on)→ Attack →(level=1)→ Decay →(level=S)→ Sustain
→(note_off)→ Release →(level=0)→ Idle. note_off triggers Release from ANY
non-idle stage, starting from the CURRENT level.

Zero-length segments are snapped rather than divided through:
  attack=0            note_on lands directly in Decay (or Sustain if decay=0,
                      with level snapped to the sustain value)
  release=0           note_off drops straight to Idle at level 0

Retriggering note_on while the envelope is running re-enters Attack from the
current level (legato-friendly: no click from a level reset).

The release increment is captured at note_off as level * (1/(R*sr)) so the
ramp hits exactly 0 after R seconds regardless of where release began.
*/

/// The current stage of the envelope state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

pub struct AdsrEnvelope {
    sample_rate: f32,

    attack: f32,
    decay: f32,
    sustain: f32,
    release: f32,

    stage: EnvelopeStage,
    level: f32,

    attack_inc: f32,
    decay_inc: f32,
    release_inc: f32,
    release_recip: f32, // 1/(R*sr), cached so note_off avoids a division
}

impl AdsrEnvelope {
    pub fn new(sample_rate: f32) -> Self {
        let mut env = Self {
            sample_rate,
            attack: 0.01,
            decay: 0.1,
            sustain: 0.5,
            release: 0.2,
            stage: EnvelopeStage::Idle,
            level: 0.0,
            attack_inc: 0.0,
            decay_inc: 0.0,
            release_inc: 0.0,
            release_recip: 0.0,
        };
        env.calculate_increments();
        env
    }

    /// Set attack/decay/release in seconds and sustain level in [0, 1].
    /// Negative times clamp to zero, sustain clamps into range.
    pub fn set_params(&mut self, attack: f32, decay: f32, sustain: f32, release: f32) {
        self.attack = attack.max(0.0);
        self.decay = decay.max(0.0);
        self.sustain = sustain.clamp(0.0, 1.0);
        self.release = release.max(0.0);
        self.calculate_increments();
    }

    pub fn note_on(&mut self) {
        if self.attack == 0.0 {
            // Skip straight past the attack ramp.
            self.level = 1.0;
            if self.decay == 0.0 {
                self.level = self.sustain;
                self.stage = EnvelopeStage::Sustain;
            } else {
                self.stage = EnvelopeStage::Decay;
            }
        } else {
            // Retrigger ramps from the current level, not from zero.
            self.stage = EnvelopeStage::Attack;
        }
    }

    pub fn note_off(&mut self) {
        if self.stage == EnvelopeStage::Idle {
            return;
        }
        if self.release == 0.0 {
            self.level = 0.0;
            self.stage = EnvelopeStage::Idle;
        } else {
            self.release_inc = self.level * self.release_recip;
            self.stage = EnvelopeStage::Release;
        }
    }

    /// Advance one sample and return the new level.
    #[inline]
    pub fn process(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => return 0.0,
            EnvelopeStage::Attack => {
                if self.attack_inc <= 0.0 {
                    self.level = 1.0;
                    self.enter_post_attack();
                } else {
                    self.level += self.attack_inc;
                    if self.level >= 1.0 {
                        self.level = 1.0;
                        self.enter_post_attack();
                    }
                }
            }
            EnvelopeStage::Decay => {
                if self.decay_inc <= 0.0 {
                    self.level = self.sustain;
                    self.stage = EnvelopeStage::Sustain;
                } else {
                    self.level -= self.decay_inc;
                    if self.level <= self.sustain {
                        self.level = self.sustain;
                        self.stage = EnvelopeStage::Sustain;
                    }
                }
            }
            EnvelopeStage::Sustain => {
                self.level = self.sustain;
            }
            EnvelopeStage::Release => {
                if self.release_inc <= 0.0 {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Idle;
                } else {
                    self.level -= self.release_inc;
                    if self.level <= 0.0 {
                        self.level = 0.0;
                        self.stage = EnvelopeStage::Idle;
                    }
                }
            }
        }

        debug_assert!((0.0..=1.0).contains(&self.level));
        self.level
    }

    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.level = 0.0;
    }

    fn enter_post_attack(&mut self) {
        if self.decay == 0.0 {
            self.level = self.sustain;
            self.stage = EnvelopeStage::Sustain;
        } else {
            self.stage = EnvelopeStage::Decay;
        }
    }

    fn calculate_increments(&mut self) {
        if self.sample_rate <= 0.0 {
            return;
        }
        self.attack_inc = if self.attack > 0.0 {
            1.0 / (self.attack * self.sample_rate)
        } else {
            0.0
        };
        self.decay_inc = if self.decay > 0.0 {
            (1.0 - self.sustain) / (self.decay * self.sample_rate)
        } else {
            0.0
        };
        self.release_recip = if self.release > 0.0 {
            1.0 / (self.release * self.sample_rate)
        } else {
            0.0
        };
        self.release_inc = self.sustain * self.release_recip;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 1_000.0;

    fn run(env: &mut AdsrEnvelope, samples: usize) {
        for _ in 0..samples {
            env.process();
        }
    }

    #[test]
    fn attack_reaches_full_level() {
        let mut env = AdsrEnvelope::new(SAMPLE_RATE);
        env.set_params(0.01, 0.1, 0.7, 0.2);
        env.note_on();
        run(&mut env, (0.01 * SAMPLE_RATE) as usize + 1);

        assert!(env.level() > 0.69, "attack+decay should be past peak");
        assert_ne!(env.stage(), EnvelopeStage::Attack);
    }

    #[test]
    fn zero_attack_skips_to_decay() {
        let mut env = AdsrEnvelope::new(SAMPLE_RATE);
        env.set_params(0.0, 0.1, 0.5, 0.0);
        env.note_on();

        // Never visits Attack
        assert_eq!(env.stage(), EnvelopeStage::Decay);
        assert!((env.level() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_attack_zero_decay_snaps_to_sustain() {
        let mut env = AdsrEnvelope::new(SAMPLE_RATE);
        env.set_params(0.0, 0.0, 0.6, 0.1);
        env.note_on();

        assert_eq!(env.stage(), EnvelopeStage::Sustain);
        assert!((env.level() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn zero_release_snaps_to_idle() {
        let mut env = AdsrEnvelope::new(SAMPLE_RATE);
        env.set_params(0.01, 0.05, 0.5, 0.0);
        env.note_on();
        run(&mut env, 100);

        env.note_off();
        assert_eq!(env.stage(), EnvelopeStage::Idle);
        assert_eq!(env.level(), 0.0);
    }

    #[test]
    fn sustain_holds_target_level() {
        let sustain = 0.6;
        let mut env = AdsrEnvelope::new(SAMPLE_RATE);
        env.set_params(0.01, 0.05, sustain, 0.2);
        env.note_on();
        run(&mut env, ((0.01 + 0.05) * SAMPLE_RATE) as usize + 5);

        assert_eq!(env.stage(), EnvelopeStage::Sustain);
        assert!((env.level() - sustain).abs() < 1e-4);
    }

    #[test]
    fn release_from_any_stage_reaches_zero() {
        for cut_at in [2usize, 8, 40, 200] {
            let mut env = AdsrEnvelope::new(SAMPLE_RATE);
            env.set_params(0.02, 0.05, 0.5, 0.03);
            env.note_on();
            run(&mut env, cut_at);

            env.note_off();
            run(&mut env, (0.03 * SAMPLE_RATE) as usize + 2);

            assert_eq!(env.stage(), EnvelopeStage::Idle, "cut at {cut_at}");
            assert_eq!(env.level(), 0.0);
        }
    }

    #[test]
    fn level_stays_in_unit_range_for_random_params() {
        // A few deliberately awkward parameter sets, including negatives
        // (which the setter clamps) and zero-length segments.
        let params = [
            (0.0, 0.0, 1.5, 0.0),
            (-1.0, 0.001, -0.5, 0.001),
            (0.003, 0.0, 0.9, 0.5),
            (0.5, 0.5, 0.0, 0.5),
        ];
        for (a, d, s, r) in params {
            let mut env = AdsrEnvelope::new(SAMPLE_RATE);
            env.set_params(a, d, s, r);
            env.note_on();
            for i in 0..4000 {
                if i == 2000 {
                    env.note_off();
                }
                let level = env.process();
                assert!((0.0..=1.0).contains(&level));
            }
        }
    }

    #[test]
    fn retrigger_resumes_from_current_level() {
        let mut env = AdsrEnvelope::new(SAMPLE_RATE);
        env.set_params(0.1, 0.1, 0.5, 0.1);
        env.note_on();
        run(&mut env, 50);
        let mid = env.level();
        assert!(mid > 0.0 && mid < 1.0);

        env.note_on();
        assert_eq!(env.stage(), EnvelopeStage::Attack);
        // Level untouched by the retrigger itself
        assert!((env.level() - mid).abs() < 1e-6);
    }
}
