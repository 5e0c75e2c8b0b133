pub mod dsp;
pub mod engine;
pub mod fx; // Stereo post-processing chain
pub mod synth; // Voice management and polyphony

pub const MAX_BLOCK_SIZE: usize = 2048;

/// Default size of the voice arena. The manager can be built with fewer
/// slots but never grows past its construction size.
pub const DEFAULT_MAX_VOICES: usize = 16;

/// Convert MIDI note number to frequency in Hz.
/// A4 = 440 Hz = MIDI note 69
#[inline]
pub fn midi_note_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

/// Convert a detune in cents to a frequency ratio.
#[inline]
pub fn cents_to_ratio(cents: f32) -> f32 {
    2.0_f32.powf(cents / 1200.0)
}
