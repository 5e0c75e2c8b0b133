use crate::dsp::envelope::AdsrEnvelope;
use crate::dsp::filter::{FilterModel, VoiceFilter};
use crate::dsp::lfo::{Lfo, LfoShape};
use crate::dsp::oscillator::{Oscillator, Waveform};
use crate::synth::allocator::VoiceSlot;
use crate::{cents_to_ratio, midi_note_to_freq};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Voice lifecycle. Distinct from the envelope stages: `Attack` here just
/// means "sounding", and `Stolen` means the steal fade is running.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,
    Attack,
    Release,
    Stolen,
}

/// Snapshot of one voice for UI/visualization readers.
#[derive(Debug, Clone, Copy)]
pub struct VoiceRenderState {
    pub voice_id: u8,
    pub state: VoiceState,
    pub note: Option<u8>,
    pub velocity: f32,
    pub pitch: f32,
    pub pan: f32,
    pub amplitude: f32,
}

/// Duration of the linear fade applied to a stolen voice. Long enough to be
/// click-free, short enough that the slot frees up within a couple of blocks.
const STEAL_FADE_SECS: f32 = 0.020;

/// Frequencies closer than this to the glide target snap to it.
const GLIDE_SNAP_HZ: f32 = 0.01;

/// One complete subtractive-synthesis voice: two oscillators, two envelopes,
/// a switchable filter, one LFO with per-destination routing, poly-mod,
/// portamento and a steal fade.
///
/// Everything here is sized at construction; `process` never allocates.
pub struct Voice {
    sample_rate: f32,
    voice_id: u8,

    osc_a: Oscillator,
    osc_b: Oscillator,
    amp_env: AdsrEnvelope,
    filter_env: AdsrEnvelope,
    filter: VoiceFilter,
    lfo: Lfo,

    state: VoiceState,
    note: Option<u8>,
    velocity: f32,
    timestamp: u64,

    // Pitch / portamento
    current_freq: f32,
    target_freq: f32,
    glide_time: f32,
    glide_coeff: f32,

    // Mixer
    mix_a: f32,
    mix_b: f32,
    osc_b_detune_ratio: f32,
    pulse_width_a: f32,
    pulse_width_b: f32,

    // Filter
    base_cutoff: f32,
    resonance: f32,
    filter_env_amount: f32,

    // LFO routing depths
    lfo_to_pitch: f32,
    lfo_to_filter: f32,
    lfo_to_amp: f32,
    lfo_to_pan: f32,

    // Poly-mod amounts
    pm_osc_b_to_freq_a: f32,
    pm_osc_b_to_pw: f32,
    pm_osc_b_to_filter: f32,
    pm_filter_env_to_freq_a: f32,
    pm_filter_env_to_pw: f32,
    pm_filter_env_to_filter: f32,

    // Stereo placement
    base_pan: f32,
    effective_pan: f32,

    // Steal fade
    stolen_fade: f32,
    stolen_fade_delta: f32,

    last_amplitude: f32,
}

impl Voice {
    pub fn new(sample_rate: f32, voice_id: u8) -> Self {
        let mut voice = Self {
            sample_rate,
            voice_id,
            osc_a: Oscillator::new(sample_rate),
            osc_b: Oscillator::new(sample_rate),
            amp_env: AdsrEnvelope::new(sample_rate),
            filter_env: AdsrEnvelope::new(sample_rate),
            filter: VoiceFilter::new(sample_rate),
            lfo: Lfo::new(sample_rate),
            state: VoiceState::Idle,
            note: None,
            velocity: 0.0,
            timestamp: 0,
            current_freq: 440.0,
            target_freq: 440.0,
            glide_time: 0.0,
            glide_coeff: 1.0,
            mix_a: 1.0,
            mix_b: 0.0,
            osc_b_detune_ratio: 1.0,
            pulse_width_a: 0.5,
            pulse_width_b: 0.5,
            base_cutoff: 2_000.0,
            resonance: 0.0,
            filter_env_amount: 0.0,
            lfo_to_pitch: 0.0,
            lfo_to_filter: 0.0,
            lfo_to_amp: 0.0,
            lfo_to_pan: 0.0,
            pm_osc_b_to_freq_a: 0.0,
            pm_osc_b_to_pw: 0.0,
            pm_osc_b_to_filter: 0.0,
            pm_filter_env_to_freq_a: 0.0,
            pm_filter_env_to_pw: 0.0,
            pm_filter_env_to_filter: 0.0,
            base_pan: 0.0,
            effective_pan: 0.0,
            stolen_fade: 1.0,
            stolen_fade_delta: 1.0 / (STEAL_FADE_SECS * sample_rate.max(1.0)),
            last_amplitude: 0.0,
        };
        voice.filter.set_params(voice.base_cutoff, voice.resonance);
        voice
    }

    /// Trigger the voice. `detune_cents`/`pan` come from the allocator's
    /// unison layout; `timestamp` is the manager's global counter.
    pub fn note_on(&mut self, note: u8, velocity: u8, timestamp: u64, detune_cents: f32, pan: f32) {
        let target = midi_note_to_freq(note) * cents_to_ratio(detune_cents);

        if self.state == VoiceState::Idle || self.glide_time <= 0.0 {
            // Snap: fresh voice or no portamento.
            self.current_freq = target;
            self.osc_a.reset();
            self.osc_b.reset();
        }
        // Glide always re-aims at the base note frequency, so retriggering
        // mid-glide never compounds a previous glide's detune.
        self.target_freq = target;

        self.note = Some(note);
        self.velocity = f32::from(velocity) / 127.0;
        self.timestamp = timestamp;
        self.base_pan = pan.clamp(-1.0, 1.0);
        self.effective_pan = self.base_pan;
        self.stolen_fade = 1.0;
        self.state = VoiceState::Attack;

        self.amp_env.note_on();
        self.filter_env.note_on();
    }

    pub fn note_off(&mut self) {
        if self.state == VoiceState::Idle || self.state == VoiceState::Stolen {
            return;
        }
        self.amp_env.note_off();
        self.filter_env.note_off();
        self.state = VoiceState::Release;
    }

    /// Begin the steal fade. The voice keeps sounding (and keeps its slot)
    /// until the fade hits zero.
    pub fn start_steal(&mut self) {
        if self.state != VoiceState::Idle && self.state != VoiceState::Stolen {
            self.state = VoiceState::Stolen;
        }
    }

    /// Render one mono sample.
    #[inline]
    pub fn process(&mut self) -> f32 {
        if self.state == VoiceState::Idle {
            return 0.0;
        }

        self.advance_glide();

        // Modulators advance once per sample, shared by every destination.
        let lfo = self.lfo.process();
        let fenv = self.filter_env.process();

        // Oscillator B renders first: it is the poly-mod source.
        self.osc_b
            .set_frequency(self.current_freq * self.osc_b_detune_ratio);
        self.osc_b.set_pulse_width(self.pulse_width_b);
        let b = self.osc_b.process();

        // Pitch modulation as a ratio offset around the glided base, so
        // vibrato and poly-mod never accumulate into the glide state.
        let pitch_mod = lfo * self.lfo_to_pitch
            + b * self.pm_osc_b_to_freq_a
            + fenv * self.pm_filter_env_to_freq_a;
        self.osc_a
            .set_frequency((self.current_freq * (1.0 + pitch_mod)).max(0.0));

        let pw = self.pulse_width_a + b * self.pm_osc_b_to_pw + fenv * self.pm_filter_env_to_pw;
        self.osc_a.set_pulse_width(pw);
        let a = self.osc_a.process();

        let mixed = a * self.mix_a + b * self.mix_b;

        // Cutoff: base plus envelope sweep, LFO wobble scaled by the base
        // (musically proportional), and the audio-rate poly-mod routes.
        let cutoff = self.base_cutoff
            + fenv * self.filter_env_amount * 9_000.0
            + lfo * self.lfo_to_filter * self.base_cutoff
            + b * self.pm_osc_b_to_filter * 4_000.0
            + fenv * self.pm_filter_env_to_filter * 4_000.0;
        self.filter
            .set_params(cutoff.clamp(20.0, 20_000.0), self.resonance);
        let filtered = self.filter.process(mixed);

        let amp = self.amp_env.process();
        let amp_mod = (1.0 + lfo * self.lfo_to_amp).clamp(0.0, 2.0);
        self.effective_pan = (self.base_pan + lfo * self.lfo_to_pan).clamp(-1.0, 1.0);

        let mut out = filtered * amp * self.velocity * amp_mod;
        self.last_amplitude = amp;

        if self.state == VoiceState::Stolen {
            out *= self.stolen_fade.max(0.0);
            self.stolen_fade -= self.stolen_fade_delta;
            if self.stolen_fade <= 0.0 {
                self.go_idle();
                return 0.0;
            }
        }

        // Natural end of note: both envelopes done.
        if !self.amp_env.is_active() && !self.filter_env.is_active() {
            self.go_idle();
        }

        out
    }

    fn advance_glide(&mut self) {
        if self.current_freq != self.target_freq {
            self.current_freq +=
                (self.target_freq - self.current_freq) * self.glide_coeff;
            if (self.target_freq - self.current_freq).abs() < GLIDE_SNAP_HZ {
                self.current_freq = self.target_freq;
            }
        }
    }

    fn go_idle(&mut self) {
        self.state = VoiceState::Idle;
        self.note = None;
        self.stolen_fade = 1.0;
        self.last_amplitude = 0.0;
        self.amp_env.reset();
        self.filter_env.reset();
        self.filter.reset();
    }

    // --- Parameters ---

    /// Portamento time in seconds; 0 disables glide.
    pub fn set_glide_time(&mut self, seconds: f32) {
        self.glide_time = seconds.max(0.0);
        self.glide_coeff = if self.glide_time > 0.0 && self.sample_rate > 0.0 {
            1.0 - (-3.0 / (self.glide_time * self.sample_rate)).exp()
        } else {
            1.0
        };
    }

    pub fn set_amp_adsr(&mut self, attack: f32, decay: f32, sustain: f32, release: f32) {
        self.amp_env.set_params(attack, decay, sustain, release);
    }

    pub fn set_filter_adsr(&mut self, attack: f32, decay: f32, sustain: f32, release: f32) {
        self.filter_env.set_params(attack, decay, sustain, release);
    }

    pub fn set_filter(&mut self, cutoff: f32, resonance: f32, env_amount: f32) {
        self.base_cutoff = cutoff.clamp(20.0, 20_000.0);
        self.resonance = resonance.clamp(0.0, 1.0);
        self.filter_env_amount = env_amount.clamp(0.0, 1.0);
        self.filter.set_params(self.base_cutoff, self.resonance);
    }

    pub fn set_filter_model(&mut self, model: FilterModel) {
        self.filter.set_model(model);
        self.filter.set_params(self.base_cutoff, self.resonance);
    }

    pub fn set_waveform_a(&mut self, waveform: Waveform) {
        self.osc_a.set_waveform(waveform);
    }

    pub fn set_waveform_b(&mut self, waveform: Waveform) {
        self.osc_b.set_waveform(waveform);
    }

    pub fn set_pulse_width_a(&mut self, pw: f32) {
        self.pulse_width_a = pw.clamp(0.01, 0.99);
    }

    pub fn set_pulse_width_b(&mut self, pw: f32) {
        self.pulse_width_b = pw.clamp(0.01, 0.99);
    }

    /// Oscillator mix levels in [0, 1] and oscillator B's detune in cents.
    pub fn set_mixer(&mut self, mix_a: f32, mix_b: f32, detune_b_cents: f32) {
        self.mix_a = mix_a.clamp(0.0, 1.0);
        self.mix_b = mix_b.clamp(0.0, 1.0);
        self.osc_b_detune_ratio = cents_to_ratio(detune_b_cents);
    }

    pub fn set_lfo(&mut self, shape: LfoShape, rate_hz: f32, depth: f32) {
        self.lfo.set_shape(shape);
        self.lfo.set_rate(rate_hz);
        self.lfo.set_depth(depth);
    }

    pub fn set_lfo_routing(&mut self, pitch: f32, filter: f32, amp: f32, pan: f32) {
        self.lfo_to_pitch = pitch.clamp(0.0, 1.0);
        self.lfo_to_filter = filter.clamp(0.0, 1.0);
        self.lfo_to_amp = amp.clamp(0.0, 1.0);
        self.lfo_to_pan = pan.clamp(0.0, 1.0);
    }

    pub fn set_poly_mod_osc_b_to_freq_a(&mut self, amount: f32) {
        self.pm_osc_b_to_freq_a = amount.clamp(0.0, 1.0);
    }

    pub fn set_poly_mod_osc_b_to_pw(&mut self, amount: f32) {
        self.pm_osc_b_to_pw = amount.clamp(0.0, 1.0);
    }

    pub fn set_poly_mod_osc_b_to_filter(&mut self, amount: f32) {
        self.pm_osc_b_to_filter = amount.clamp(0.0, 1.0);
    }

    pub fn set_poly_mod_filter_env_to_freq_a(&mut self, amount: f32) {
        self.pm_filter_env_to_freq_a = amount.clamp(0.0, 1.0);
    }

    pub fn set_poly_mod_filter_env_to_pw(&mut self, amount: f32) {
        self.pm_filter_env_to_pw = amount.clamp(0.0, 1.0);
    }

    pub fn set_poly_mod_filter_env_to_filter(&mut self, amount: f32) {
        self.pm_filter_env_to_filter = amount.clamp(0.0, 1.0);
    }

    // --- Accessors ---

    pub fn is_active(&self) -> bool {
        self.state != VoiceState::Idle
    }

    pub fn note(&self) -> Option<u8> {
        self.note
    }

    pub fn voice_state(&self) -> VoiceState {
        self.state
    }

    /// Pan the manager's stereo mixer should place this voice at, including
    /// any LFO pan wobble.
    pub fn pan_position(&self) -> f32 {
        self.effective_pan
    }

    pub fn current_pitch(&self) -> f32 {
        self.current_freq
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn render_state(&self) -> VoiceRenderState {
        VoiceRenderState {
            voice_id: self.voice_id,
            state: self.state,
            note: self.note,
            velocity: self.velocity,
            pitch: self.current_freq,
            pan: self.effective_pan,
            amplitude: self.last_amplitude,
        }
    }
}

impl VoiceSlot for Voice {
    fn is_active(&self) -> bool {
        Voice::is_active(self)
    }

    fn timestamp(&self) -> u64 {
        Voice::timestamp(self)
    }

    fn pitch(&self) -> f32 {
        Voice::current_pitch(self)
    }

    fn start_steal(&mut self) {
        Voice::start_steal(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    fn sounding_voice() -> Voice {
        let mut v = Voice::new(SR, 0);
        v.set_amp_adsr(0.0, 0.1, 1.0, 0.05);
        v.note_on(69, 100, 1, 0.0, 0.0);
        v
    }

    #[test]
    fn note_on_resolves_midi_pitch() {
        let v = sounding_voice();
        assert!((v.current_pitch() - 440.0).abs() < 1e-3);
        assert_eq!(v.note(), Some(69));
        assert_eq!(v.voice_state(), VoiceState::Attack);
    }

    #[test]
    fn detune_cents_scale_the_pitch() {
        let mut v = Voice::new(SR, 0);
        v.note_on(69, 100, 1, 50.0, 0.0);
        let expected = 440.0 * 2.0f32.powf(50.0 / 1200.0);
        assert!((v.current_pitch() - expected).abs() < 0.01);
    }

    #[test]
    fn glide_approaches_target_without_overshoot() {
        let mut v = sounding_voice();
        v.set_glide_time(0.05);
        v.note_on(81, 100, 2, 0.0, 0.0); // octave up, voice already sounding

        let target = 880.0;
        let mut prev = v.current_pitch();
        assert!(prev < target);
        for _ in 0..(SR * 0.2) as usize {
            v.process();
            let p = v.current_pitch();
            assert!(p >= prev - 1e-3 && p <= target + 1e-3);
            prev = p;
        }
        assert!((prev - target).abs() < 1e-2);
    }

    #[test]
    fn retrigger_mid_glide_does_not_compound() {
        let mut v = sounding_voice();
        v.set_glide_time(0.1);
        v.note_on(81, 100, 2, 0.0, 0.0);
        for _ in 0..100 {
            v.process();
        }
        // Retrigger the same note mid-glide: target must stay 880, not drift.
        v.note_on(81, 100, 3, 0.0, 0.0);
        for _ in 0..(SR as usize) {
            v.process();
        }
        assert!((v.current_pitch() - 880.0).abs() < 0.05);
    }

    #[test]
    fn zero_glide_snaps_immediately() {
        let mut v = sounding_voice();
        v.note_on(81, 100, 2, 0.0, 0.0);
        assert!((v.current_pitch() - 880.0).abs() < 1e-3);
    }

    #[test]
    fn voice_goes_idle_after_release() {
        let mut v = Voice::new(SR, 0);
        v.set_amp_adsr(0.0, 0.01, 0.5, 0.01);
        v.set_filter_adsr(0.0, 0.01, 0.5, 0.01);
        v.note_on(60, 100, 1, 0.0, 0.0);
        v.note_off();
        assert_eq!(v.voice_state(), VoiceState::Release);
        for _ in 0..(SR * 0.1) as usize {
            v.process();
        }
        assert_eq!(v.voice_state(), VoiceState::Idle);
        assert_eq!(v.note(), None);
    }

    #[test]
    fn steal_fade_is_non_increasing_and_terminates() {
        let mut v = sounding_voice();
        // Let the attack settle so output is steady.
        for _ in 0..4800 {
            v.process();
        }
        v.start_steal();
        assert_eq!(v.voice_state(), VoiceState::Stolen);

        let fade_samples = (0.020 * SR) as usize;
        let mut peak_envelope = f32::MAX;
        let mut window_peak = 0.0f32;
        let mut samples = 0usize;
        while v.is_active() {
            let out = v.process().abs();
            window_peak = window_peak.max(out);
            samples += 1;
            // Compare peaks over 5 ms windows (a few full waveform cycles)
            // so the oscillation itself does not trip the monotonicity check.
            if samples % 240 == 0 {
                assert!(window_peak <= peak_envelope + 1e-4);
                peak_envelope = window_peak;
                window_peak = 0.0;
            }
            assert!(samples <= fade_samples + 2, "fade never terminated");
        }
        assert_eq!(v.voice_state(), VoiceState::Idle);
    }

    #[test]
    fn stolen_voice_stays_active_through_the_fade() {
        let mut v = sounding_voice();
        v.process();
        v.start_steal();
        // 10 ms in, a 20 ms fade is still running.
        for _ in 0..(SR * 0.010) as usize {
            v.process();
        }
        assert_eq!(v.voice_state(), VoiceState::Stolen);
        assert!(v.is_active());
    }

    #[test]
    fn amp_lfo_modulation_stays_in_bounds() {
        let mut v = sounding_voice();
        v.set_lfo(LfoShape::Sine, 10.0, 1.0);
        v.set_lfo_routing(0.0, 0.0, 1.0, 0.0);
        for _ in 0..48_000 {
            let out = v.process();
            assert!(out.is_finite());
            assert!(out.abs() <= 2.5);
        }
    }

    #[test]
    fn lfo_pan_routing_moves_effective_pan() {
        let mut v = sounding_voice();
        v.set_lfo(LfoShape::Sine, 5.0, 1.0);
        v.set_lfo_routing(0.0, 0.0, 0.0, 1.0);
        let mut min_pan = 1.0f32;
        let mut max_pan = -1.0f32;
        for _ in 0..48_000 {
            v.process();
            min_pan = min_pan.min(v.pan_position());
            max_pan = max_pan.max(v.pan_position());
        }
        assert!(max_pan > 0.5);
        assert!(min_pan < -0.5);
    }

    #[test]
    fn idle_voice_is_silent() {
        let mut v = Voice::new(SR, 0);
        for _ in 0..64 {
            assert_eq!(v.process(), 0.0);
        }
    }

    #[test]
    fn render_state_reflects_the_note() {
        let mut v = sounding_voice();
        v.process();
        let rs = v.render_state();
        assert_eq!(rs.note, Some(69));
        assert_eq!(rs.state, VoiceState::Attack);
        assert!(rs.amplitude > 0.0);
        assert!((rs.velocity - 100.0 / 127.0).abs() < 1e-6);
    }

    #[test]
    fn poly_mod_filter_route_changes_the_output() {
        let run = |amount: f32| -> f32 {
            let mut v = Voice::new(SR, 0);
            v.set_amp_adsr(0.0, 0.1, 1.0, 0.05);
            v.set_filter(400.0, 0.2, 0.0);
            v.set_mixer(1.0, 0.0, 0.0);
            v.set_poly_mod_osc_b_to_filter(amount);
            v.note_on(60, 100, 1, 0.0, 0.0);
            let mut energy = 0.0;
            for _ in 0..4800 {
                let s = v.process();
                energy += s * s;
            }
            energy
        };
        // Audio-rate cutoff modulation audibly changes the spectrum/energy.
        let dry = run(0.0);
        let modded = run(1.0);
        assert!((dry - modded).abs() > dry * 0.01);
    }
}
