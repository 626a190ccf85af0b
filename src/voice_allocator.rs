// src/voice_allocator.rs

use std::sync::Arc;

use log::debug;

use crate::config::VoiceStealing;
use crate::voice::{VoiceId, VoicePool};

/// Allocates and releases voices of the fixed pool.
///
/// Responsibilities:
/// - map note velocity transitions to voice claims and releases
/// - keep at most one playing voice per note
///
/// Does NOT:
/// - own DSP state
/// - allocate after construction
///
/// Searches always run from voice 0 upwards, so identical input produces
/// identical assignments.
pub struct VoiceAllocator {
    pool: Arc<VoicePool>,
    stealing: VoiceStealing,

    /// Claim sequence number per voice, for oldest-first stealing.
    claimed_at: Box<[u64]>,
    claims: u64,
}

impl VoiceAllocator {
    pub fn new(pool: Arc<VoicePool>, stealing: VoiceStealing) -> Self {
        let claimed_at = vec![0; pool.len()].into_boxed_slice();
        Self {
            pool,
            stealing,
            claimed_at,
            claims: 0,
        }
    }

    /// React to one observed velocity transition.
    #[inline]
    pub fn apply(&mut self, note: u8, velocity: u8) -> Option<VoiceId> {
        if velocity == 0 {
            self.note_off(note)
        } else {
            self.note_on(note, velocity)
        }
    }

    /// Claim a voice for a pressed note. Amplitude is `velocity / 128`.
    ///
    /// If the note already owns a voice, that voice is retriggered. If the
    /// pool is exhausted and stealing is disabled the note is dropped.
    pub fn note_on(&mut self, note: u8, velocity: u8) -> Option<VoiceId> {
        let amplitude = velocity as f32 * (1.0 / 128.0);

        if let Some(id) = self.voice_for_note(note) {
            debug!("Retrigger note {} on voice {}", note, id);
            self.claim(id, note, amplitude);
            return Some(id);
        }

        if let Some(id) = (0..self.pool.len()).find(|&id| !self.pool.is_playing(id)) {
            debug!("Note {} -> voice {}", note, id);
            self.claim(id, note, amplitude);
            return Some(id);
        }

        match self.stealing {
            VoiceStealing::Disabled => {
                debug!("Voice pool exhausted, dropping note {}", note);
                None
            }
            VoiceStealing::OldestFirst => {
                let id = (0..self.pool.len()).min_by_key(|&id| self.claimed_at[id])?;
                debug!(
                    "Stealing voice {} (note {}) for note {}",
                    id,
                    self.pool.note(id),
                    note
                );
                self.claim(id, note, amplitude);
                Some(id)
            }
        }
    }

    /// Release the voice playing `note`, if any.
    ///
    /// A note with no voice (dropped, or already released) is a no-op.
    pub fn note_off(&mut self, note: u8) -> Option<VoiceId> {
        let id = self.voice_for_note(note)?;
        debug!("Release note {} on voice {}", note, id);
        self.pool.stop(id);
        Some(id)
    }

    /// First playing voice assigned to `note`.
    pub fn voice_for_note(&self, note: u8) -> Option<VoiceId> {
        (0..self.pool.len()).find(|&id| self.pool.is_playing(id) && self.pool.note(id) == note)
    }

    pub fn playing_count(&self) -> usize {
        self.pool.playing_count()
    }

    pub fn pool(&self) -> &VoicePool {
        &self.pool
    }

    fn claim(&mut self, id: VoiceId, note: u8, amplitude: f32) {
        self.claims += 1;
        self.claimed_at[id] = self.claims;
        self.pool.start(id, note, amplitude);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocator(voices: usize, stealing: VoiceStealing) -> VoiceAllocator {
        VoiceAllocator::new(Arc::new(VoicePool::new(voices)), stealing)
    }

    fn assert_unique_notes(alloc: &VoiceAllocator) {
        let mut notes: Vec<u8> = (0..alloc.pool().len())
            .filter_map(|id| alloc.pool().snapshot(id))
            .filter(|s| s.playing)
            .map(|s| s.note)
            .collect();
        let playing = notes.len();
        notes.sort_unstable();
        notes.dedup();
        assert_eq!(notes.len(), playing, "a note owns more than one voice");
        assert!(playing <= alloc.pool().len());
    }

    #[test]
    fn test_claims_lowest_free_voice() {
        let mut alloc = allocator(4, VoiceStealing::Disabled);
        assert_eq!(alloc.note_on(60, 100), Some(0));
        assert_eq!(alloc.note_on(62, 100), Some(1));
        alloc.note_off(60);
        assert_eq!(alloc.note_on(64, 100), Some(0));
    }

    #[test]
    fn test_amplitude_is_velocity_over_128() {
        let mut alloc = allocator(1, VoiceStealing::Disabled);
        let id = alloc.note_on(60, 64).unwrap();
        assert_eq!(alloc.pool().snapshot(id).unwrap().amplitude, 0.5);
    }

    #[test]
    fn test_exhaustion_drops_note() {
        let mut alloc = allocator(16, VoiceStealing::Disabled);
        for note in 0..16 {
            assert!(alloc.note_on(note, 100).is_some());
        }
        assert_eq!(alloc.note_on(16, 100), None);
        assert_eq!(alloc.playing_count(), 16);
        assert_eq!(alloc.voice_for_note(16), None);
        assert_unique_notes(&alloc);
    }

    #[test]
    fn test_release_of_unknown_note_is_noop() {
        let mut alloc = allocator(2, VoiceStealing::Disabled);
        alloc.note_on(60, 100);
        assert_eq!(alloc.note_off(61), None);
        assert_eq!(alloc.playing_count(), 1);
        assert_eq!(alloc.note_off(60), Some(0));
        assert_eq!(alloc.note_off(60), None);
    }

    #[test]
    fn test_same_note_retriggers_its_voice() {
        let mut alloc = allocator(4, VoiceStealing::Disabled);
        let first = alloc.note_on(60, 100).unwrap();
        let second = alloc.note_on(60, 50).unwrap();
        assert_eq!(first, second);
        assert_eq!(alloc.playing_count(), 1);

        let snap = alloc.pool().snapshot(first).unwrap();
        assert_eq!(snap.amplitude, 50.0 / 128.0);
        assert_eq!(snap.trigger_count, 2);
    }

    #[test]
    fn test_oldest_first_stealing() {
        let mut alloc = allocator(2, VoiceStealing::OldestFirst);
        alloc.note_on(60, 100);
        alloc.note_on(61, 100);
        assert_eq!(alloc.note_on(62, 100), Some(0));
        assert_eq!(alloc.voice_for_note(60), None);
        assert_eq!(alloc.note_on(63, 100), Some(1));
        assert_unique_notes(&alloc);
    }

    #[test]
    fn test_identical_sequences_allocate_identically() {
        let sequence = [(60, 100), (61, 90), (60, 0), (62, 80), (63, 70), (61, 0), (64, 1)];
        let run = || {
            let mut alloc = allocator(3, VoiceStealing::Disabled);
            sequence
                .iter()
                .map(|&(n, v)| alloc.apply(n, v))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
        assert_eq!(
            run(),
            vec![Some(0), Some(1), Some(0), Some(0), Some(2), Some(1), Some(1)]
        );
    }
}
