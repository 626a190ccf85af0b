use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// A single `f32` parameter shared between a control-rate writer and an
/// audio-rate reader.
///
/// The value is stored as its bit pattern in an `AtomicU32`, so every write
/// is one scalar store and a reader never observes a torn value.
#[derive(Debug)]
pub struct SharedParam {
    bits: AtomicU32,
}

impl SharedParam {
    pub fn new(value: f32) -> Self {
        Self {
            bits: AtomicU32::new(value.to_bits()),
        }
    }

    #[inline]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Integer counterpart of [`SharedParam`] (delay lengths, sample counts).
#[derive(Debug)]
pub struct SharedCount {
    value: AtomicUsize,
}

impl SharedCount {
    pub fn new(value: usize) -> Self {
        Self {
            value: AtomicUsize::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> usize {
        self.value.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set(&self, value: usize) {
        self.value.store(value, Ordering::Relaxed);
    }
}
