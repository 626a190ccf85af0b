use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

use crate::parameter::SharedParam;

pub type VoiceId = usize;

/// One published voice slot.
///
/// Written only by the [`VoiceAllocator`](crate::voice_allocator::VoiceAllocator),
/// read by the audio pipeline at the start of each block.
#[derive(Debug)]
struct VoiceSlot {
    playing: AtomicBool,
    note: AtomicU8,
    amplitude: SharedParam,
    /// Bumped on every (re)trigger so the renderer can restart its envelope.
    trigger_count: AtomicU32,
}

impl VoiceSlot {
    fn new() -> Self {
        Self {
            playing: AtomicBool::new(false),
            note: AtomicU8::new(0),
            amplitude: SharedParam::new(0.0),
            trigger_count: AtomicU32::new(0),
        }
    }
}

/// What the audio pipeline sees of a voice for one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceSnapshot {
    pub id: VoiceId,
    pub playing: bool,
    pub note: u8,
    pub amplitude: f32,
    pub trigger_count: u32,
}

/// Fixed pool of voices, allocated once at startup.
///
/// Voices are never created or destroyed afterwards, only claimed and
/// released. Mutators are crate-private: only the allocator uses them.
#[derive(Debug)]
pub struct VoicePool {
    slots: Box<[VoiceSlot]>,
}

impl VoicePool {
    pub fn new(voices: usize) -> Self {
        Self {
            slots: (0..voices).map(|_| VoiceSlot::new()).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Read one voice.
    ///
    /// `trigger_count` is loaded first, with acquire ordering: the note and
    /// amplitude read after it are at least as new as that trigger.
    #[inline]
    pub fn snapshot(&self, id: VoiceId) -> Option<VoiceSnapshot> {
        let slot = self.slots.get(id)?;
        let trigger_count = slot.trigger_count.load(Ordering::Acquire);
        Some(VoiceSnapshot {
            id,
            note: slot.note.load(Ordering::Relaxed),
            amplitude: slot.amplitude.get(),
            playing: slot.playing.load(Ordering::Acquire),
            trigger_count,
        })
    }

    pub fn playing_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.playing.load(Ordering::Relaxed))
            .count()
    }

    #[inline]
    pub(crate) fn is_playing(&self, id: VoiceId) -> bool {
        self.slots[id].playing.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn note(&self, id: VoiceId) -> u8 {
        self.slots[id].note.load(Ordering::Relaxed)
    }

    /// Start (or restart) a voice on `note`.
    pub(crate) fn start(&self, id: VoiceId, note: u8, amplitude: f32) {
        let slot = &self.slots[id];
        slot.note.store(note, Ordering::Relaxed);
        slot.amplitude.set(amplitude);
        slot.playing.store(true, Ordering::Relaxed);
        // Publishes everything above.
        slot.trigger_count.fetch_add(1, Ordering::Release);
    }

    pub(crate) fn stop(&self, id: VoiceId) {
        self.slots[id].playing.store(false, Ordering::Release);
    }
}
