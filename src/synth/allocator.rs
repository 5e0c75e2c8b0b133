#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What a slot must expose for the allocator to manage it. The allocator is
/// DSP-free; anything with activity, age, pitch and a steal trigger
/// qualifies, which keeps the policy testable against a bare mock.
pub trait VoiceSlot {
    fn is_active(&self) -> bool;
    fn timestamp(&self) -> u64;
    fn pitch(&self) -> f32;
    fn start_steal(&mut self);
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationMode {
    /// Always scan from slot 0 (lowest available index).
    Reset,
    /// Round-robin: continue from the slot after the last allocation.
    Cycle,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StealPriority {
    /// Steal the slot with the lowest timestamp.
    Oldest,
    /// Steal the slot with the lowest pitch.
    LowestPitch,
}

/// Detune and pan assigned to one sub-voice of a unison group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UnisonVoiceInfo {
    pub detune_cents: f32,
    pub pan: f32,
}

/// Polyphony/unison/stealing policy over a slice of voice slots. Owns no
/// voices; every query takes the slot slice so the policy can be exercised
/// without any audio machinery.
pub struct VoiceAllocator {
    max_slots: usize,
    polyphony_limit: usize,
    allocation_mode: AllocationMode,
    steal_priority: StealPriority,
    unison_count: usize,
    unison_spread: f32,
    stereo_spread: f32,
    round_robin: usize,

    sustain_down: bool,
    sustained_notes: [bool; 128],
}

impl VoiceAllocator {
    pub fn new(max_slots: usize) -> Self {
        Self {
            max_slots,
            polyphony_limit: max_slots,
            allocation_mode: AllocationMode::Reset,
            steal_priority: StealPriority::Oldest,
            unison_count: 1,
            unison_spread: 0.0,
            stereo_spread: 0.0,
            round_robin: 0,
            sustain_down: false,
            sustained_notes: [false; 128],
        }
    }

    pub fn set_polyphony_limit(&mut self, limit: usize) {
        self.polyphony_limit = limit.clamp(1, self.max_slots);
    }

    pub fn polyphony_limit(&self) -> usize {
        self.polyphony_limit
    }

    pub fn set_allocation_mode(&mut self, mode: AllocationMode) {
        self.allocation_mode = mode;
    }

    pub fn set_steal_priority(&mut self, priority: StealPriority) {
        self.steal_priority = priority;
    }

    pub fn set_unison_count(&mut self, count: usize) {
        self.unison_count = count.clamp(1, 8);
    }

    pub fn unison_count(&self) -> usize {
        self.unison_count
    }

    pub fn set_unison_spread(&mut self, spread: f32) {
        self.unison_spread = spread.clamp(0.0, 1.0);
    }

    pub fn set_stereo_spread(&mut self, spread: f32) {
        self.stereo_spread = spread.clamp(0.0, 1.0);
    }

    pub fn stereo_spread(&self) -> f32 {
        self.stereo_spread
    }

    /// Find a free slot within the polyphony window, or None if the window is
    /// full.
    ///
    /// Only activity inside the first `polyphony_limit` slots counts against
    /// the limit: voices still fading out beyond a lowered limit must not
    /// block fresh notes in the window they no longer belong to.
    pub fn allocate_slot<S: VoiceSlot>(&mut self, slots: &[S]) -> Option<usize> {
        let limit = self.polyphony_limit.min(slots.len());
        let active_in_window = slots[..limit].iter().filter(|s| s.is_active()).count();
        if active_in_window >= limit {
            return None;
        }

        match self.allocation_mode {
            AllocationMode::Reset => slots[..limit].iter().position(|s| !s.is_active()),
            AllocationMode::Cycle => {
                for i in 0..limit {
                    let idx = (self.round_robin + i) % limit;
                    if !slots[idx].is_active() {
                        self.round_robin = (idx + 1) % limit;
                        return Some(idx);
                    }
                }
                None
            }
        }
    }

    /// Best slot to steal by the configured priority, across every active
    /// slot. Does not call `start_steal` itself; the caller decides.
    pub fn find_steal_victim<S: VoiceSlot>(&self, slots: &[S]) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, slot) in slots.iter().enumerate() {
            if !slot.is_active() {
                continue;
            }
            best = match best {
                None => Some(i),
                Some(b) => {
                    if self.prefer_victim(slot, &slots[b]) {
                        Some(i)
                    } else {
                        Some(b)
                    }
                }
            };
        }
        best
    }

    /// After a limit reduction, put the excess active voices into their steal
    /// fade. Victim indices are written into `killed`; returns how many.
    ///
    /// Selection is repeated-minimum over the slice rather than a sort, so
    /// nothing is allocated and no scratch beyond the caller's buffer is
    /// needed.
    pub fn enforce_polyphony_limit<S: VoiceSlot>(
        &self,
        slots: &mut [S],
        killed: &mut [usize],
    ) -> usize {
        let active = slots.iter().filter(|s| s.is_active()).count();
        if active <= self.polyphony_limit {
            return 0;
        }

        let excess = (active - self.polyphony_limit).min(killed.len());
        let mut count = 0;
        while count < excess {
            let mut victim: Option<usize> = None;
            for (i, slot) in slots.iter().enumerate() {
                if !slot.is_active() || killed[..count].contains(&i) {
                    continue;
                }
                victim = match victim {
                    None => Some(i),
                    Some(v) => {
                        if self.prefer_victim(slot, &slots[v]) {
                            Some(i)
                        } else {
                            Some(v)
                        }
                    }
                };
            }
            match victim {
                Some(v) => {
                    slots[v].start_steal();
                    killed[count] = v;
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    fn prefer_victim<S: VoiceSlot>(&self, candidate: &S, current: &S) -> bool {
        match self.steal_priority {
            StealPriority::Oldest => candidate.timestamp() < current.timestamp(),
            StealPriority::LowestPitch => candidate.pitch() < current.pitch(),
        }
    }

    /// Detune/pan for sub-voice `i` of a unison group: indices map to a
    /// symmetric fraction in [-1, 1], so the center voice of an odd count
    /// lands exactly on zero.
    pub fn unison_voice_info(&self, unison_index: usize) -> UnisonVoiceInfo {
        if self.unison_count <= 1 {
            return UnisonVoiceInfo::default();
        }
        let fraction = 2.0 * unison_index as f32 / (self.unison_count - 1) as f32 - 1.0;
        UnisonVoiceInfo {
            detune_cents: fraction * self.unison_spread * 50.0,
            pan: fraction * self.stereo_spread,
        }
    }

    pub fn on_sustain_pedal(&mut self, down: bool) {
        self.sustain_down = down;
    }

    pub fn is_sustain_down(&self) -> bool {
        self.sustain_down
    }

    /// Whether a released note should be held instead. Note-agnostic: the
    /// pedal holds everything.
    pub fn should_hold(&self, _note: u8) -> bool {
        self.sustain_down
    }

    pub fn mark_sustained(&mut self, note: u8) {
        if (note as usize) < 128 {
            self.sustained_notes[note as usize] = true;
        }
    }

    /// Drain the held-note set into `released`, clearing it. Returns how many
    /// notes were written.
    pub fn release_sustained_notes(&mut self, released: &mut [u8]) -> usize {
        let mut count = 0;
        for note in 0..128u8 {
            if self.sustained_notes[note as usize] {
                if count < released.len() {
                    released[count] = note;
                    count += 1;
                }
                self.sustained_notes[note as usize] = false;
            }
        }
        count
    }
}
