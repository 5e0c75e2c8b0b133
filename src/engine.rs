//! Top-level engine: voice manager, effects chain and master gain behind one
//! event/render surface.

use log::info;

use crate::dsp::filter::FilterModel;
use crate::dsp::lfo::LfoShape;
use crate::dsp::oscillator::Waveform;
use crate::fx::FxChain;
use crate::synth::allocator::{AllocationMode, StealPriority};
use crate::synth::manager::VoiceManager;
use crate::synth::message::EngineMessage;
use crate::synth::voice::VoiceRenderState;
use crate::MAX_BLOCK_SIZE;

#[cfg(feature = "rtrb")]
use rtrb::Consumer;

pub struct Engine {
    voices: VoiceManager,
    fx: FxChain,
    master_gain: f32,

    #[cfg(feature = "rtrb")]
    rx: Option<Consumer<EngineMessage>>,
}

impl Engine {
    /// Build the engine with every buffer sized up front. Everything after
    /// this call is allocation-free on the render path.
    pub fn new(sample_rate: f32, max_voices: usize) -> Self {
        info!("engine init: {sample_rate} Hz, {max_voices} voices");
        Self {
            voices: VoiceManager::new(sample_rate, max_voices),
            fx: FxChain::new(sample_rate),
            master_gain: 1.0,
            #[cfg(feature = "rtrb")]
            rx: None,
        }
    }

    /// Attach the consuming end of an SPSC control queue. Messages are
    /// drained at the top of each rendered block.
    #[cfg(feature = "rtrb")]
    pub fn attach_receiver(&mut self, rx: Consumer<EngineMessage>) {
        self.rx = Some(rx);
    }

    // --- Events ---

    pub fn on_note_on(&mut self, note: u8, velocity: u8) {
        self.voices.on_note_on(note, velocity);
    }

    pub fn on_note_off(&mut self, note: u8) {
        self.voices.on_note_off(note);
    }

    pub fn on_sustain_pedal(&mut self, down: bool) {
        self.voices.on_sustain_pedal(down);
    }

    pub fn all_notes_off(&mut self) {
        self.voices.all_notes_off();
    }

    /// Apply one control message. Hosts that pre-serialize their MIDI onto
    /// the audio thread can call this directly instead of going through a
    /// queue.
    pub fn handle_message(&mut self, msg: EngineMessage) {
        match msg {
            EngineMessage::NoteOn { note, velocity } => self.on_note_on(note, velocity),
            EngineMessage::NoteOff { note } => self.on_note_off(note),
            EngineMessage::SustainPedal { down } => self.on_sustain_pedal(down),
            EngineMessage::AllNotesOff => self.all_notes_off(),
        }
    }

    #[cfg(feature = "rtrb")]
    fn drain_messages(&mut self) {
        if let Some(mut rx) = self.rx.take() {
            while let Ok(msg) = rx.pop() {
                self.handle_message(msg);
            }
            self.rx = Some(rx);
        }
    }

    // --- Rendering ---

    /// Render one stereo sample pair.
    #[inline]
    pub fn process_stereo(&mut self, left: &mut f32, right: &mut f32) {
        self.voices.process_stereo(left, right);
        self.fx.process(left, right);
        *left *= self.master_gain;
        *right *= self.master_gain;
    }

    /// Render a stereo block, draining any queued control messages first.
    pub fn render_stereo(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len());
        debug_assert!(left.len() <= MAX_BLOCK_SIZE);

        #[cfg(feature = "rtrb")]
        self.drain_messages();

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            self.process_stereo(l, r);
        }
    }

    // --- Parameters ---

    pub fn set_master_gain(&mut self, gain: f32) {
        self.master_gain = gain.clamp(0.0, 2.0);
    }

    pub fn set_glide_time(&mut self, seconds: f32) {
        self.voices.set_glide_time(seconds);
    }

    pub fn set_amp_adsr(&mut self, a: f32, d: f32, s: f32, r: f32) {
        self.voices.set_amp_adsr(a, d, s, r);
    }

    pub fn set_filter_adsr(&mut self, a: f32, d: f32, s: f32, r: f32) {
        self.voices.set_filter_adsr(a, d, s, r);
    }

    pub fn set_filter(&mut self, cutoff: f32, resonance: f32, env_amount: f32) {
        self.voices.set_filter(cutoff, resonance, env_amount);
    }

    pub fn set_filter_model(&mut self, model: FilterModel) {
        self.voices.set_filter_model(model);
    }

    pub fn set_waveform_a(&mut self, waveform: Waveform) {
        self.voices.set_waveform_a(waveform);
    }

    pub fn set_waveform_b(&mut self, waveform: Waveform) {
        self.voices.set_waveform_b(waveform);
    }

    pub fn set_pulse_width_a(&mut self, pw: f32) {
        self.voices.set_pulse_width_a(pw);
    }

    pub fn set_pulse_width_b(&mut self, pw: f32) {
        self.voices.set_pulse_width_b(pw);
    }

    pub fn set_mixer(&mut self, mix_a: f32, mix_b: f32, detune_b_cents: f32) {
        self.voices.set_mixer(mix_a, mix_b, detune_b_cents);
    }

    pub fn set_lfo(&mut self, shape: LfoShape, rate_hz: f32, depth: f32) {
        self.voices.set_lfo(shape, rate_hz, depth);
    }

    pub fn set_lfo_routing(&mut self, pitch: f32, filter: f32, amp: f32, pan: f32) {
        self.voices.set_lfo_routing(pitch, filter, amp, pan);
    }

    pub fn set_poly_mod_osc_b_to_freq_a(&mut self, amount: f32) {
        self.voices.set_poly_mod_osc_b_to_freq_a(amount);
    }

    pub fn set_poly_mod_osc_b_to_pw(&mut self, amount: f32) {
        self.voices.set_poly_mod_osc_b_to_pw(amount);
    }

    pub fn set_poly_mod_osc_b_to_filter(&mut self, amount: f32) {
        self.voices.set_poly_mod_osc_b_to_filter(amount);
    }

    pub fn set_poly_mod_filter_env_to_freq_a(&mut self, amount: f32) {
        self.voices.set_poly_mod_filter_env_to_freq_a(amount);
    }

    pub fn set_poly_mod_filter_env_to_pw(&mut self, amount: f32) {
        self.voices.set_poly_mod_filter_env_to_pw(amount);
    }

    pub fn set_poly_mod_filter_env_to_filter(&mut self, amount: f32) {
        self.voices.set_poly_mod_filter_env_to_filter(amount);
    }

    pub fn set_polyphony_limit(&mut self, limit: usize) {
        self.voices.set_polyphony_limit(limit);
    }

    pub fn set_allocation_mode(&mut self, mode: AllocationMode) {
        self.voices.set_allocation_mode(mode);
    }

    pub fn set_steal_priority(&mut self, priority: StealPriority) {
        self.voices.set_steal_priority(priority);
    }

    pub fn set_unison_count(&mut self, count: usize) {
        self.voices.set_unison_count(count);
    }

    pub fn set_unison_spread(&mut self, spread: f32) {
        self.voices.set_unison_spread(spread);
    }

    pub fn set_stereo_spread(&mut self, spread: f32) {
        self.voices.set_stereo_spread(spread);
    }

    pub fn set_chorus(&mut self, rate_hz: f32, depth: f32, mix: f32) {
        self.fx.set_chorus(rate_hz, depth, mix);
    }

    pub fn set_delay(&mut self, delay_secs: f32, feedback: f32, mix: f32) {
        self.fx.set_delay(delay_secs, feedback, mix);
    }

    pub fn set_delay_tempo(&mut self, bpm: f32, division: f32) {
        self.fx.set_delay_tempo(bpm, division);
    }

    pub fn set_limiter(&mut self, threshold: f32, lookahead_ms: f32, release_ms: f32) {
        self.fx.set_limiter(threshold, lookahead_ms, release_ms);
    }

    // --- Introspection ---

    pub fn active_voice_count(&self) -> usize {
        self.voices.active_voice_count()
    }

    pub fn is_note_active(&self, note: u8) -> bool {
        self.voices.is_note_active(note)
    }

    pub fn held_notes(&self, out: &mut [u8]) -> usize {
        self.voices.held_notes(out)
    }

    pub fn voice_states(&self) -> impl Iterator<Item = VoiceRenderState> + '_ {
        self.voices.voice_states()
    }
}
