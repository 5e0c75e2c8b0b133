//! Low-level DSP primitives used by the voice and fx layers.
//!
//! These components are allocation-free and realtime-safe, making them safe to
//! embed directly inside voice structs. They intentionally stay focused on the
//! signal-processing math so the synth layer can handle orchestration and
//! modulation routing.

/// Fixed-capacity delay line with fractional-sample reads.
pub mod delay_line;
/// Attack/decay/sustain/release envelope generator.
pub mod envelope;
/// Virtual-analog filter family (biquad, ZDF integrator, SVF, ladder,
/// cascade, classical).
pub mod filter;
/// Free-running low-frequency oscillator.
pub mod lfo;
/// Audio-rate phase-accumulator oscillator.
pub mod oscillator;

pub use envelope::EnvelopeStage;
pub use oscillator::Waveform;
