// src/ingest.rs
//
// Entry point for received MIDI bytes: parse, then record in the shared
// control state. Called once per byte, in arrival order, from the transport's
// receive path.

use crate::control_state::ControlWriter;
use crate::midi::{MidiEvent, MidiParser};

pub struct MidiInput {
    parser: MidiParser,
    writer: ControlWriter,
}

impl MidiInput {
    pub fn new(writer: ControlWriter) -> Self {
        Self {
            parser: MidiParser::new(),
            writer,
        }
    }

    /// Consume one byte; returns the event it completed, already applied.
    #[inline]
    pub fn feed(&mut self, byte: u8) -> Option<MidiEvent> {
        let event = self.parser.feed(byte)?;
        self.writer.apply(&event);
        Some(event)
    }

    /// Drain a receive FIFO. Returns the number of events applied.
    pub fn feed_all(&mut self, bytes: &[u8]) -> usize {
        bytes.iter().filter(|&&b| self.feed(b).is_some()).count()
    }

    pub fn writer(&self) -> &ControlWriter {
        &self.writer
    }
}
