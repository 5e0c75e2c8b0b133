//! Voice-level synthesis: the per-note signal chain, the polyphony policy
//! engine, and the manager that mixes a fixed arena of voices.

pub mod allocator;
pub mod manager;
pub mod message;
pub mod voice;

pub use allocator::{AllocationMode, StealPriority, UnisonVoiceInfo, VoiceAllocator, VoiceSlot};
pub use manager::VoiceManager;
pub use message::{EngineMessage, MessageReceiver};
pub use voice::{Voice, VoiceRenderState, VoiceState};
