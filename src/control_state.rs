// src/control_state.rs
//
// Shared control state between MIDI ingestion and the control-rate loops.
//
// One region holds the current velocity of every note and the current value
// of every controller. Exactly one `ControlWriter` stores into it; exactly
// one `NoteEdges` and one `ControllerEdges` read from it, each keeping its own
// shadow of the last value it reacted to. The handles are not `Clone`, so the
// single-writer / single-reader rule holds by construction and no lock is
// needed. A write becomes visible to a reader no later than its next scan.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::midi::{MidiEvent, MidiEventKind};

pub const NOTE_COUNT: usize = 128;
pub const CONTROLLER_COUNT: usize = 128;

/// Process-wide note and controller values, zeroed at startup.
#[derive(Debug)]
pub struct SharedControlState {
    velocities: [AtomicU8; NOTE_COUNT],
    controllers: [AtomicU8; CONTROLLER_COUNT],
}

impl SharedControlState {
    fn new() -> Self {
        Self {
            velocities: std::array::from_fn(|_| AtomicU8::new(0)),
            controllers: std::array::from_fn(|_| AtomicU8::new(0)),
        }
    }

    /// Current velocity of a note (0 = released).
    #[inline]
    pub fn velocity(&self, note: u8) -> u8 {
        self.velocities[note as usize & 0x7F].load(Ordering::Relaxed)
    }

    /// Current value of a controller.
    #[inline]
    pub fn controller(&self, controller: u8) -> u8 {
        self.controllers[controller as usize & 0x7F].load(Ordering::Relaxed)
    }
}

/// Create the shared region and its three access handles.
pub fn control_state() -> (ControlWriter, NoteEdges, ControllerEdges) {
    let state = Arc::new(SharedControlState::new());

    let writer = ControlWriter {
        state: Arc::clone(&state),
    };
    let notes = NoteEdges {
        state: Arc::clone(&state),
        previous: [0; NOTE_COUNT],
    };
    let controllers = ControllerEdges {
        state,
        previous: [0; CONTROLLER_COUNT],
    };

    (writer, notes, controllers)
}

// ═══════════════════════════════════════════════════════════════════
// Writer (MIDI ingestion context)
// ═══════════════════════════════════════════════════════════════════

/// The only handle that stores note velocities and controller values.
#[derive(Debug)]
pub struct ControlWriter {
    state: Arc<SharedControlState>,
}

impl ControlWriter {
    /// Record a decoded event. O(1), never blocks.
    ///
    /// Channels are merged: every channel writes the same slots.
    #[inline]
    pub fn apply(&self, event: &MidiEvent) {
        match event.kind {
            MidiEventKind::NoteOff { note, .. } => self.store_velocity(note, 0),
            MidiEventKind::NoteOn { note, velocity } => self.store_velocity(note, velocity),
            MidiEventKind::ControllerChange { controller, value } => {
                self.state.controllers[controller as usize & 0x7F].store(value, Ordering::Relaxed);
            }
        }
    }

    #[inline]
    fn store_velocity(&self, note: u8, velocity: u8) {
        self.state.velocities[note as usize & 0x7F].store(velocity, Ordering::Relaxed);
    }

    pub fn state(&self) -> &SharedControlState {
        &self.state
    }
}

// ═══════════════════════════════════════════════════════════════════
// Edge-detecting readers (control-rate context)
// ═══════════════════════════════════════════════════════════════════

/// Detects note velocity changes for the voice allocator.
#[derive(Debug)]
pub struct NoteEdges {
    state: Arc<SharedControlState>,
    previous: [u8; NOTE_COUNT],
}

impl NoteEdges {
    /// Scan every note slot once, yielding `(note, velocity)` for each slot
    /// whose velocity differs from the last one observed.
    ///
    /// The shadow copy is updated as each change is yielded, so a change is
    /// reported exactly once.
    pub fn changes(&mut self) -> NoteChanges<'_> {
        NoteChanges {
            edges: self,
            next: 0,
        }
    }

    pub fn state(&self) -> &SharedControlState {
        &self.state
    }
}

/// Iterator returned by [`NoteEdges::changes`].
pub struct NoteChanges<'a> {
    edges: &'a mut NoteEdges,
    next: usize,
}

impl Iterator for NoteChanges<'_> {
    type Item = (u8, u8);

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < NOTE_COUNT {
            let note = self.next;
            self.next += 1;

            let current = self.edges.state.velocities[note].load(Ordering::Relaxed);
            if current != self.edges.previous[note] {
                self.edges.previous[note] = current;
                return Some((note as u8, current));
            }
        }
        None
    }
}

/// Detects controller value changes for the modulation loop.
#[derive(Debug)]
pub struct ControllerEdges {
    state: Arc<SharedControlState>,
    previous: [u8; CONTROLLER_COUNT],
}

impl ControllerEdges {
    /// Returns the new value if `controller` changed since the last poll.
    #[inline]
    pub fn poll(&mut self, controller: u8) -> Option<u8> {
        let slot = controller as usize & 0x7F;
        let current = self.state.controllers[slot].load(Ordering::Relaxed);
        if current == self.previous[slot] {
            return None;
        }
        self.previous[slot] = current;
        Some(current)
    }

    pub fn state(&self) -> &SharedControlState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: MidiEventKind) -> MidiEvent {
        MidiEvent { channel: 0, kind }
    }

    #[test]
    fn test_starts_zeroed() {
        let (writer, mut notes, _) = control_state();
        assert_eq!(writer.state().velocity(60), 0);
        assert_eq!(notes.changes().count(), 0);
    }

    #[test]
    fn test_note_edges_report_once() {
        let (writer, mut notes, _) = control_state();
        writer.apply(&event(MidiEventKind::NoteOn { note: 60, velocity: 100 }));
        writer.apply(&event(MidiEventKind::NoteOn { note: 10, velocity: 5 }));

        let changes: Vec<_> = notes.changes().collect();
        assert_eq!(changes, vec![(10, 5), (60, 100)]);
        assert_eq!(notes.changes().count(), 0);
    }

    #[test]
    fn test_note_off_writes_zero() {
        let (writer, mut notes, _) = control_state();
        writer.apply(&event(MidiEventKind::NoteOn { note: 60, velocity: 100 }));
        notes.changes().for_each(drop);

        writer.apply(&event(MidiEventKind::NoteOff { note: 60, velocity: 64 }));
        assert_eq!(notes.changes().collect::<Vec<_>>(), vec![(60, 0)]);
    }

    #[test]
    fn test_press_and_release_between_scans_is_invisible() {
        let (writer, mut notes, _) = control_state();
        writer.apply(&event(MidiEventKind::NoteOn { note: 60, velocity: 100 }));
        writer.apply(&event(MidiEventKind::NoteOff { note: 60, velocity: 0 }));
        assert_eq!(notes.changes().count(), 0);
    }

    #[test]
    fn test_partial_scan_keeps_remaining_changes() {
        let (writer, mut notes, _) = control_state();
        writer.apply(&event(MidiEventKind::NoteOn { note: 1, velocity: 1 }));
        writer.apply(&event(MidiEventKind::NoteOn { note: 2, velocity: 2 }));

        assert_eq!(notes.changes().next(), Some((1, 1)));
        assert_eq!(notes.changes().collect::<Vec<_>>(), vec![(2, 2)]);
    }

    #[test]
    fn test_controller_poll() {
        let (writer, _, mut controllers) = control_state();
        assert_eq!(controllers.poll(5), None);

        writer.apply(&event(MidiEventKind::ControllerChange {
            controller: 5,
            value: 64,
        }));
        assert_eq!(controllers.poll(4), None);
        assert_eq!(controllers.poll(5), Some(64));
        assert_eq!(controllers.poll(5), None);
        assert_eq!(controllers.state().controller(5), 64);
    }
}
