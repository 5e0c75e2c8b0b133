use std::f32::consts::FRAC_PI_4;

use crate::dsp::filter::FilterModel;
use crate::dsp::lfo::LfoShape;
use crate::dsp::oscillator::Waveform;
use crate::synth::allocator::{AllocationMode, StealPriority, VoiceAllocator};
use crate::synth::voice::{Voice, VoiceRenderState};

/// Orchestrates a fixed arena of voices and one allocator: the sole entry
/// point for note/sustain events and parameter fan-out, and the final mono or
/// constant-power stereo mix.
///
/// The voice arena and scratch buffers are sized once in `new`; nothing in
/// the event or render paths allocates.
pub struct VoiceManager {
    voices: Vec<Voice>,
    allocator: VoiceAllocator,
    global_timestamp: u64,
    headroom: f32,

    kill_scratch: Vec<usize>,
    sustain_scratch: [u8; 128],
}

impl VoiceManager {
    pub fn new(sample_rate: f32, max_voices: usize) -> Self {
        let max_voices = max_voices.max(1);
        let voices = (0..max_voices)
            .map(|id| Voice::new(sample_rate, id as u8))
            .collect();

        Self {
            voices,
            allocator: VoiceAllocator::new(max_voices),
            global_timestamp: 0,
            headroom: 1.0 / (max_voices as f32).sqrt(),
            kill_scratch: vec![0; max_voices],
            sustain_scratch: [0; 128],
        }
    }

    // --- Events ---

    /// Trigger `unison_count` sub-voices for one note. Falls back to stealing
    /// when no slot is free; drops the sub-voice when neither is available.
    pub fn on_note_on(&mut self, note: u8, velocity: u8) {
        let unison = self.allocator.unison_count();
        for i in 0..unison {
            let idx = match self.allocator.allocate_slot(&self.voices) {
                Some(idx) => idx,
                None => match self.allocator.find_steal_victim(&self.voices) {
                    Some(idx) => idx,
                    None => continue,
                },
            };

            let (detune_cents, pan) = if unison > 1 {
                let info = self.allocator.unison_voice_info(i);
                (info.detune_cents, info.pan)
            } else if self.allocator.stereo_spread() > 0.0 {
                // Non-unison width: alternate sides by slot parity.
                let spread = self.allocator.stereo_spread();
                (0.0, if idx % 2 == 0 { -spread } else { spread })
            } else {
                (0.0, 0.0)
            };

            self.global_timestamp += 1;
            self.voices[idx].note_on(note, velocity, self.global_timestamp, detune_cents, pan);
        }
    }

    /// Release every voice playing `note`, or park the note on the sustain
    /// pedal if it is down.
    pub fn on_note_off(&mut self, note: u8) {
        if self.allocator.should_hold(note) {
            self.allocator.mark_sustained(note);
            return;
        }
        self.release_note(note);
    }

    pub fn on_sustain_pedal(&mut self, down: bool) {
        self.allocator.on_sustain_pedal(down);
        if !down {
            let count = self
                .allocator
                .release_sustained_notes(&mut self.sustain_scratch);
            for i in 0..count {
                let note = self.sustain_scratch[i];
                self.release_note(note);
            }
        }
    }

    fn release_note(&mut self, note: u8) {
        for voice in &mut self.voices {
            if voice.note() == Some(note) && voice.is_active() {
                voice.note_off();
            }
        }
    }

    // --- Mixing ---

    /// Mono sum of every voice, scaled by `1/sqrt(voice count)` for headroom.
    #[inline]
    pub fn process(&mut self) -> f32 {
        let mut sum = 0.0;
        for voice in &mut self.voices {
            sum += voice.process();
        }
        sum * self.headroom
    }

    /// Constant-power stereo sum: each voice is placed by
    /// `theta = (pan + 1) * pi/4`, left scaled by cos, right by sin, so total
    /// power is pan-invariant.
    #[inline]
    pub fn process_stereo(&mut self, left: &mut f32, right: &mut f32) {
        let mut l = 0.0;
        let mut r = 0.0;
        for voice in &mut self.voices {
            let mono = voice.process();
            let theta = (voice.pan_position() + 1.0) * FRAC_PI_4;
            l += mono * theta.cos();
            r += mono * theta.sin();
        }
        *left = l * self.headroom;
        *right = r * self.headroom;
    }

    /// Fill a mono block.
    pub fn render(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.process();
        }
    }

    /// Fill a stereo block pair. Channels must be the same length.
    pub fn render_stereo(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len());
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            self.process_stereo(l, r);
        }
    }

    // --- Allocator configuration ---

    /// Lowering the limit immediately puts the excess voices into their steal
    /// fade; it never hard-kills them.
    pub fn set_polyphony_limit(&mut self, limit: usize) {
        self.allocator.set_polyphony_limit(limit);
        self.allocator
            .enforce_polyphony_limit(&mut self.voices, &mut self.kill_scratch);
    }

    pub fn set_allocation_mode(&mut self, mode: AllocationMode) {
        self.allocator.set_allocation_mode(mode);
    }

    pub fn set_steal_priority(&mut self, priority: StealPriority) {
        self.allocator.set_steal_priority(priority);
    }

    pub fn set_unison_count(&mut self, count: usize) {
        self.allocator.set_unison_count(count);
    }

    pub fn set_unison_spread(&mut self, spread: f32) {
        self.allocator.set_unison_spread(spread);
    }

    pub fn set_stereo_spread(&mut self, spread: f32) {
        self.allocator.set_stereo_spread(spread);
    }

    // --- Voice parameter fan-out ---

    pub fn set_glide_time(&mut self, seconds: f32) {
        for voice in &mut self.voices {
            voice.set_glide_time(seconds);
        }
    }

    pub fn set_amp_adsr(&mut self, a: f32, d: f32, s: f32, r: f32) {
        for voice in &mut self.voices {
            voice.set_amp_adsr(a, d, s, r);
        }
    }

    pub fn set_filter_adsr(&mut self, a: f32, d: f32, s: f32, r: f32) {
        for voice in &mut self.voices {
            voice.set_filter_adsr(a, d, s, r);
        }
    }

    pub fn set_filter(&mut self, cutoff: f32, resonance: f32, env_amount: f32) {
        for voice in &mut self.voices {
            voice.set_filter(cutoff, resonance, env_amount);
        }
    }

    pub fn set_filter_model(&mut self, model: FilterModel) {
        for voice in &mut self.voices {
            voice.set_filter_model(model);
        }
    }

    pub fn set_waveform_a(&mut self, waveform: Waveform) {
        for voice in &mut self.voices {
            voice.set_waveform_a(waveform);
        }
    }

    pub fn set_waveform_b(&mut self, waveform: Waveform) {
        for voice in &mut self.voices {
            voice.set_waveform_b(waveform);
        }
    }

    pub fn set_pulse_width_a(&mut self, pw: f32) {
        for voice in &mut self.voices {
            voice.set_pulse_width_a(pw);
        }
    }

    pub fn set_pulse_width_b(&mut self, pw: f32) {
        for voice in &mut self.voices {
            voice.set_pulse_width_b(pw);
        }
    }

    pub fn set_mixer(&mut self, mix_a: f32, mix_b: f32, detune_b_cents: f32) {
        for voice in &mut self.voices {
            voice.set_mixer(mix_a, mix_b, detune_b_cents);
        }
    }

    pub fn set_lfo(&mut self, shape: LfoShape, rate_hz: f32, depth: f32) {
        for voice in &mut self.voices {
            voice.set_lfo(shape, rate_hz, depth);
        }
    }

    pub fn set_lfo_routing(&mut self, pitch: f32, filter: f32, amp: f32, pan: f32) {
        for voice in &mut self.voices {
            voice.set_lfo_routing(pitch, filter, amp, pan);
        }
    }

    pub fn set_poly_mod_osc_b_to_freq_a(&mut self, amount: f32) {
        for voice in &mut self.voices {
            voice.set_poly_mod_osc_b_to_freq_a(amount);
        }
    }

    pub fn set_poly_mod_osc_b_to_pw(&mut self, amount: f32) {
        for voice in &mut self.voices {
            voice.set_poly_mod_osc_b_to_pw(amount);
        }
    }

    pub fn set_poly_mod_osc_b_to_filter(&mut self, amount: f32) {
        for voice in &mut self.voices {
            voice.set_poly_mod_osc_b_to_filter(amount);
        }
    }

    pub fn set_poly_mod_filter_env_to_freq_a(&mut self, amount: f32) {
        for voice in &mut self.voices {
            voice.set_poly_mod_filter_env_to_freq_a(amount);
        }
    }

    pub fn set_poly_mod_filter_env_to_pw(&mut self, amount: f32) {
        for voice in &mut self.voices {
            voice.set_poly_mod_filter_env_to_pw(amount);
        }
    }

    pub fn set_poly_mod_filter_env_to_filter(&mut self, amount: f32) {
        for voice in &mut self.voices {
            voice.set_poly_mod_filter_env_to_filter(amount);
        }
    }

    // --- Introspection ---

    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    pub fn is_note_active(&self, note: u8) -> bool {
        self.voices
            .iter()
            .any(|v| v.is_active() && v.note() == Some(note))
    }

    /// Distinct held notes across all voices (unison sub-voices collapse to
    /// one entry). Returns how many notes were written.
    pub fn held_notes(&self, out: &mut [u8]) -> usize {
        let mut count = 0;
        for voice in &self.voices {
            if let Some(note) = voice.note() {
                if voice.is_active() && !out[..count].contains(&note) {
                    if count >= out.len() {
                        break;
                    }
                    out[count] = note;
                    count += 1;
                }
            }
        }
        count
    }

    pub fn voice_states(&self) -> impl Iterator<Item = VoiceRenderState> + '_ {
        self.voices.iter().map(|v| v.render_state())
    }

    pub fn global_timestamp(&self) -> u64 {
        self.global_timestamp
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Release everything sounding, pedal or not.
    pub fn all_notes_off(&mut self) {
        self.allocator.on_sustain_pedal(false);
        self.allocator
            .release_sustained_notes(&mut self.sustain_scratch);
        for voice in &mut self.voices {
            if voice.is_active() {
                voice.note_off();
            }
        }
    }
}
