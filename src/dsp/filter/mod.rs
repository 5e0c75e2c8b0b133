//! Virtual-analog filter family.
//!
//! Everything here shares the same contract: a constructor taking the sample
//! rate, a parameter setter that recomputes coefficients (never per sample),
//! `reset()`, and a per-sample `process()`. Cutoffs clamp to 0.49 x Nyquist
//! and resonance/Q floors keep every topology away from division by zero.
//!
//! The ZDF/TPT integrator is the shared building block: SVF, ladder, cascade
//! and classical filters are all built from it. The biquad stands alone as
//! the classic direct-form recursion.

pub mod biquad;
pub mod cascade;
pub mod classical;
pub mod integrator;
pub mod ladder;
pub mod svf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use cascade::{CascadeFilter, Slope};
use ladder::{LadderFilter, LadderModel};
use svf::Svf;

/// Clamp a cutoff to at most 0.49 x Nyquist. Shared by every filter in the
/// family.
#[inline]
pub(crate) fn clamp_cutoff(cutoff: f32, sample_rate: f32) -> f32 {
    if sample_rate <= 0.0 {
        return 0.0;
    }
    let max_cutoff = 0.5 * sample_rate * 0.49;
    cutoff.clamp(0.0, max_cutoff)
}

/// The filter models selectable per voice. A small closed set, so tagged
/// dispatch beats trait objects here.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterModel {
    /// Clean 12 dB/oct ZDF state-variable low-pass.
    Svf,
    /// Saturating 24 dB/oct transistor ladder.
    Ladder,
    /// Prophet-style cascade, 12 dB tap.
    Prophet12,
    /// Prophet-style cascade, 24 dB tap.
    Prophet24,
}

/// The voice's switchable filter bank. All models stay warm so switching is
/// just a tag change; only the selected model is advanced per sample.
pub struct VoiceFilter {
    model: FilterModel,
    svf: Svf,
    ladder: LadderFilter,
    cascade: CascadeFilter,
}

impl VoiceFilter {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            model: FilterModel::Svf,
            svf: Svf::new(sample_rate),
            ladder: LadderFilter::new(sample_rate),
            cascade: CascadeFilter::new(sample_rate),
        }
    }

    pub fn set_model(&mut self, model: FilterModel) {
        if model != self.model {
            self.model = model;
            // Stale state from another topology would click on switch.
            self.reset();
        }
    }

    pub fn model(&self) -> FilterModel {
        self.model
    }

    /// Update cutoff (Hz) and resonance (0..1) for the selected model,
    /// mapping resonance to each topology's own range.
    pub fn set_params(&mut self, cutoff: f32, resonance: f32) {
        match self.model {
            FilterModel::Svf => {
                // Map 0..1 resonance onto Q 0.5..~10
                let q = 0.5 + resonance.clamp(0.0, 1.0) * 9.5;
                self.svf.set_params(cutoff, q);
            }
            FilterModel::Ladder => {
                self.ladder
                    .set_params(LadderModel::Transistor, cutoff, resonance);
            }
            FilterModel::Prophet12 => {
                self.cascade.set_params(cutoff, resonance, Slope::Db12);
            }
            FilterModel::Prophet24 => {
                self.cascade.set_params(cutoff, resonance, Slope::Db24);
            }
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        match self.model {
            FilterModel::Svf => self.svf.process(input).lp,
            FilterModel::Ladder => self.ladder.process(input),
            FilterModel::Prophet12 | FilterModel::Prophet24 => self.cascade.process(input),
        }
    }

    pub fn reset(&mut self) {
        self.svf.reset();
        self.ladder.reset();
        self.cascade.reset();
    }
}
