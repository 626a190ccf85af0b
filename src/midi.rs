// src/midi.rs
//
// Byte-level MIDI parser with running status.
//
// The parser consumes bytes that have already been framed by the transport
// and turns them into note and controller events. It keeps one pending data
// byte at most, never blocks and cannot fail: a malformed stream is
// resynchronised by the next status byte.

use log::{info, warn};

const STATUS_BIT: u8 = 0x80;

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const CONTROL_CHANGE: u8 = 0xB0;

/// A decoded channel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent {
    /// MIDI channel (0-15)
    pub channel: u8,
    pub kind: MidiEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEventKind {
    /// Emitted on the note byte; the release velocity is not waited for.
    NoteOff { note: u8, velocity: u8 },
    /// A velocity of 0 is reported as-is.
    NoteOn { note: u8, velocity: u8 },
    ControllerChange { controller: u8, value: u8 },
}

/// Message type selected by the last status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    NoteOff,
    NoteOn,
    ControllerChange,
    /// Any other status byte; its data bytes are skipped.
    Unrecognized(u8),
}

impl Status {
    fn from_byte(byte: u8) -> Self {
        match byte & 0xF0 {
            NOTE_OFF => Status::NoteOff,
            NOTE_ON => Status::NoteOn,
            CONTROL_CHANGE => Status::ControllerChange,
            _ => Status::Unrecognized(byte),
        }
    }
}

/// Running-status MIDI parser.
#[derive(Debug, Clone, Default)]
pub struct MidiParser {
    /// Current status and its channel; `None` until the first status byte.
    status: Option<(Status, u8)>,
    /// Which data byte of the current message is expected next.
    data_index: u8,
    /// First data byte of a two-byte message.
    pending: u8,
}

impl MidiParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// The running status and channel, if a status byte has been seen.
    pub fn status(&self) -> Option<(Status, u8)> {
        self.status
    }

    /// Consume one received byte.
    ///
    /// Returns at most one event, and only on the data byte that completes a
    /// message.
    #[inline]
    pub fn feed(&mut self, byte: u8) -> Option<MidiEvent> {
        if byte & STATUS_BIT != 0 {
            self.begin_status(byte);
            return None;
        }

        let (status, channel) = self.status?;
        let index = self.data_index;
        self.data_index = self.data_index.saturating_add(1);

        let kind = match (status, index) {
            (Status::NoteOff, 0) => MidiEventKind::NoteOff {
                note: byte,
                velocity: 0,
            },
            // Release velocity: consumed, then the next byte starts a new message.
            (Status::NoteOff, _) => {
                self.data_index = 0;
                return None;
            }
            (Status::NoteOn | Status::ControllerChange, 0) => {
                self.pending = byte;
                return None;
            }
            (Status::NoteOn, _) => {
                self.data_index = 0;
                MidiEventKind::NoteOn {
                    note: self.pending,
                    velocity: byte,
                }
            }
            (Status::ControllerChange, _) => {
                self.data_index = 0;
                MidiEventKind::ControllerChange {
                    controller: self.pending,
                    value: byte,
                }
            }
            (Status::Unrecognized(_), _) => return None,
        };

        Some(MidiEvent { channel, kind })
    }

    fn begin_status(&mut self, byte: u8) {
        let status = Status::from_byte(byte);
        let channel = byte & 0x0F;

        match status {
            Status::Unrecognized(b) => warn!("Unrecognized MIDI status byte {:#04x}", b),
            _ => info!("MIDI status {:?} on channel {}", status, channel),
        }

        self.status = Some((status, channel));
        self.data_index = 0;
        self.pending = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(bytes: &[u8]) -> Vec<MidiEvent> {
        let mut parser = MidiParser::new();
        bytes.iter().filter_map(|&b| parser.feed(b)).collect()
    }

    fn note_on(channel: u8, note: u8, velocity: u8) -> MidiEvent {
        MidiEvent {
            channel,
            kind: MidiEventKind::NoteOn { note, velocity },
        }
    }

    #[test]
    fn test_note_on_needs_both_data_bytes() {
        let mut parser = MidiParser::new();
        assert_eq!(parser.feed(0x93), None);
        assert_eq!(parser.feed(60), None);
        assert_eq!(parser.feed(100), Some(note_on(3, 60, 100)));
    }

    #[test]
    fn test_note_off_emits_on_note_byte() {
        let mut parser = MidiParser::new();
        parser.feed(0x80);
        assert_eq!(
            parser.feed(60),
            Some(MidiEvent {
                channel: 0,
                kind: MidiEventKind::NoteOff { note: 60, velocity: 0 },
            })
        );
        // Release velocity is swallowed
        assert_eq!(parser.feed(64), None);
    }

    #[test]
    fn test_running_status_note_on() {
        let events = parse(&[0x90, 60, 100, 61, 110, 62, 0]);
        assert_eq!(
            events,
            vec![note_on(0, 60, 100), note_on(0, 61, 110), note_on(0, 62, 0)]
        );
    }

    #[test]
    fn test_running_status_note_off_pairs() {
        let events = parse(&[0x81, 60, 64, 61, 64]);
        let notes: Vec<_> = events
            .iter()
            .map(|e| match e.kind {
                MidiEventKind::NoteOff { note, .. } => note,
                _ => panic!("unexpected event {:?}", e),
            })
            .collect();
        assert_eq!(notes, vec![60, 61]);
    }

    #[test]
    fn test_controller_change() {
        let events = parse(&[0xB2, 5, 64]);
        assert_eq!(
            events,
            vec![MidiEvent {
                channel: 2,
                kind: MidiEventKind::ControllerChange {
                    controller: 5,
                    value: 64,
                },
            }]
        );
    }

    #[test]
    fn test_data_before_any_status_is_ignored() {
        assert!(parse(&[60, 100, 0x7F]).is_empty());
    }

    #[test]
    fn test_status_byte_discards_pending_note() {
        // 0x90 60 is interrupted; the CC message must not see note 60.
        let events = parse(&[0x90, 60, 0xB0, 7, 100]);
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].kind,
            MidiEventKind::ControllerChange {
                controller: 7,
                value: 100,
            }
        );
    }

    #[test]
    fn test_unrecognized_status_skips_data_until_resync() {
        let mut parser = MidiParser::new();
        parser.feed(0xE0); // pitch bend
        assert_eq!(parser.status(), Some((Status::Unrecognized(0xE0), 0)));
        for b in [0, 64, 1, 2, 3] {
            assert_eq!(parser.feed(b), None);
        }
        parser.feed(0x90);
        parser.feed(40);
        assert_eq!(parser.feed(1), Some(note_on(0, 40, 1)));
    }

    #[test]
    fn test_long_unrecognized_run_does_not_overflow() {
        let mut parser = MidiParser::new();
        parser.feed(0xF0);
        for _ in 0..1000 {
            assert_eq!(parser.feed(0x11), None);
        }
    }

    #[test]
    fn test_arbitrary_stream_emits_only_on_data_bytes() {
        // Small LCG so the sequence is reproducible.
        let mut seed: u32 = 0x1234_5678;
        let mut parser = MidiParser::new();
        let mut data_bytes_since_status = 0usize;

        for _ in 0..10_000 {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let byte = (seed >> 24) as u8;
            let event = parser.feed(byte);

            if byte & 0x80 != 0 {
                assert!(event.is_none());
                data_bytes_since_status = 0;
                continue;
            }

            data_bytes_since_status += 1;
            if let Some(event) = event {
                match event.kind {
                    MidiEventKind::NoteOff { note, .. } => assert_eq!(note, byte),
                    MidiEventKind::NoteOn { velocity, .. } => {
                        assert_eq!(velocity, byte);
                        assert!(data_bytes_since_status >= 2);
                    }
                    MidiEventKind::ControllerChange { value, .. } => {
                        assert_eq!(value, byte);
                        assert!(data_bytes_since_status >= 2);
                    }
                }
            }
        }
    }
}
