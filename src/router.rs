// src/router.rs
//
// Block-synchronous fan-out of audio between named channel buffers.
//
// Used where a core redistributes audio it did not generate, e.g. sending the
// effects core's output to both the codec and the S/PDIF transmitter. Samples
// are copied untouched; nothing is kept across blocks.

use crate::error::{ConfigError, Result};

/// Index handle for a channel in a [`ChannelBank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(usize);

/// Named, fixed-size sample buffers, one block per channel, stored planar in
/// a single allocation.
#[derive(Debug)]
pub struct ChannelBank {
    names: Vec<String>,
    block_size: usize,
    data: Vec<f32>,
}

impl ChannelBank {
    pub fn new(block_size: usize) -> Self {
        Self {
            names: Vec::new(),
            block_size,
            data: Vec::new(),
        }
    }

    /// Register a channel (startup only). Re-adding a name returns its id.
    pub fn add_channel(&mut self, name: &str) -> ChannelId {
        if let Some(id) = self.id(name) {
            return id;
        }
        self.names.push(name.to_owned());
        self.data.resize(self.data.len() + self.block_size, 0.0);
        ChannelId(self.names.len() - 1)
    }

    pub fn id(&self, name: &str) -> Option<ChannelId> {
        self.names.iter().position(|n| n == name).map(ChannelId)
    }

    pub fn name(&self, id: ChannelId) -> &str {
        &self.names[id.0]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn channel(&self, id: ChannelId) -> &[f32] {
        let start = id.0 * self.block_size;
        &self.data[start..start + self.block_size]
    }

    #[inline]
    pub fn channel_mut(&mut self, id: ChannelId) -> &mut [f32] {
        let start = id.0 * self.block_size;
        &mut self.data[start..start + self.block_size]
    }

    #[inline]
    fn copy(&mut self, from: ChannelId, to: ChannelId) {
        let start = from.0 * self.block_size;
        self.data
            .copy_within(start..start + self.block_size, to.0 * self.block_size);
    }
}

/// One source broadcast to one or more destinations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub from: ChannelId,
    pub to: Vec<ChannelId>,
}

/// Fixed routing table, resolved against a bank at startup.
#[derive(Debug, Default)]
pub struct AudioRouter {
    routes: Vec<Route>,
}

impl AudioRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route by channel name.
    pub fn route(&mut self, bank: &ChannelBank, from: &str, to: &[&str]) -> Result<&mut Self> {
        let resolve = |name: &str| {
            bank.id(name)
                .ok_or_else(|| ConfigError::UnknownChannel(name.to_owned()))
        };

        let from = resolve(from)?;
        let to = to.iter().map(|n| resolve(n)).collect::<Result<Vec<_>>>()?;
        self.routes.push(Route { from, to });
        Ok(self)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Copy every routed source into its destinations for the current block.
    ///
    /// `bank` must be the bank the routes were resolved against.
    pub fn process(&self, bank: &mut ChannelBank) {
        for route in &self.routes {
            for &dest in &route.to {
                bank.copy(route.from, dest);
            }
        }
    }
}
