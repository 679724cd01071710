//! # Pooled RESP Allocator
//!
//! Purpose: Hand out `Resp` nodes and child arrays while decoding, without one
//! heap allocation per value.
//!
//! ## Design Principles
//! 1. **Bump Batches**: Nodes come from fixed-size batches, arrays from a
//!    shared slot batch; a cursor walks each batch and never rewinds.
//! 2. **Large Arrays Bypass**: Arrays at or above `array_threshold` get their
//!    own exact allocation so they cannot drain the shared slot batch.
//! 3. **Exact Spans**: Arrays are returned as `&mut [RespRef]`, which cannot
//!    grow, so a caller can never spill into the next request's slots.
//! 4. **Bulk Reclaim**: Storage lives in `RespArena` and is freed when the
//!    arena drops; the borrow checker keeps every handed-out reference inside
//!    that lifetime.
//!
//! ## Structure Overview
//!
//! ```text
//! RespArena<'a>                     (owns storage, !Sync)
//!   ├── nodes: Arena<Resp>          node batches
//!   ├── slots: Arena<RespRef>       pooled slot batches
//!   └── large: Arena<RespRef>       dedicated large arrays
//!
//! RespAlloc<'a>                     (cursors, borrows the arena)
//!   ├── nodes: &mut [Resp]          unused tail of current node batch
//!   └── slots: &mut [RespRef]       unused tail of current slot batch
//! ```
//!
//! A batch is a contiguous `alloc_extend` carve inside typed-arena's own
//! growing chunks, so consecutive batches may sit back to back in one chunk.
//! Typed-arena's chunk doubling does the physical heap amortization;
//! `node_batch` and `array_batch` control cursor grouping (how many slots a
//! refill reserves and how much tail a large request can abandon), not how
//! often the heap is hit.
//!
//! ## Usage
//!
//! ```rust
//! use proxy_resp::{Resp, RespArena};
//!
//! let arena = RespArena::new();
//! let mut alloc = arena.allocator();
//!
//! let slots = alloc.alloc_array(2);
//! slots[0] = Some(alloc.alloc(Resp::new_bulk_bytes("foo")));
//! slots[1] = Some(alloc.alloc(Resp::new_int("42")));
//! let array = alloc.alloc(Resp::new_array(slots));
//!
//! assert_eq!(array.len(), 2);
//! ```

use std::{fmt, iter, mem};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use typed_arena::Arena;

use crate::error::{RespError, RespResult};
use crate::resp::{Resp, RespRef};

/// Nodes per node batch.
pub const DEFAULT_NODE_BATCH: usize = 16;

/// Slots per pooled array batch.
pub const DEFAULT_ARRAY_BATCH: usize = 512;

/// Arrays with at least this many elements skip the pool.
pub const DEFAULT_ARRAY_THRESHOLD: usize = 32;

/// Batch sizing for [`RespArena`].
///
/// The defaults are tuning knobs, not protocol limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocConfig {
    /// Nodes allocated per node batch.
    pub node_batch: usize,
    /// Slots allocated per pooled array batch.
    pub array_batch: usize,
    /// Arrays of this length or longer are allocated on their own.
    pub array_threshold: usize,
}

impl Default for AllocConfig {
    fn default() -> Self {
        AllocConfig {
            node_batch: DEFAULT_NODE_BATCH,
            array_batch: DEFAULT_ARRAY_BATCH,
            array_threshold: DEFAULT_ARRAY_THRESHOLD,
        }
    }
}

impl AllocConfig {
    /// Checks that every pooled request fits in a fresh batch.
    ///
    /// # Errors
    /// Returns `RespError::InvalidConfig` for an empty batch or a threshold
    /// larger than the slot batch.
    pub fn validate(&self) -> RespResult<()> {
        if self.node_batch == 0 {
            return Err(RespError::InvalidConfig("node_batch must be at least 1"));
        }
        if self.array_batch == 0 {
            return Err(RespError::InvalidConfig("array_batch must be at least 1"));
        }
        if self.array_threshold > self.array_batch {
            return Err(RespError::InvalidConfig(
                "array_threshold must not exceed array_batch",
            ));
        }
        Ok(())
    }
}

/// Allocation counters for one [`RespAlloc`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocStats {
    /// Nodes handed out.
    pub nodes: u64,
    /// Node batches allocated.
    pub node_batches: u64,
    /// Arrays carved from a slot batch.
    pub pooled_arrays: u64,
    /// Slot batches allocated.
    pub array_batches: u64,
    /// Arrays allocated outside the pool.
    pub direct_arrays: u64,
    /// Slots left unused when a slot batch was replaced.
    pub abandoned_slots: u64,
}

/// Backing storage for decoded values.
///
/// Everything allocated through [`RespArena::allocator`] borrows the arena and
/// is freed together when it drops. There is no per-value free.
///
/// The arena is not `Sync`, so allocators cannot be handed out from two
/// threads at once:
///
/// ```compile_fail
/// use proxy_resp::RespArena;
///
/// fn shared<T: Sync>(_: &T) {}
///
/// let arena = RespArena::new();
/// shared(&arena);
/// ```
pub struct RespArena<'a> {
    config: AllocConfig,
    nodes: Arena<Resp<'a>>,
    slots: Arena<RespRef<'a>>,
    large: Arena<RespRef<'a>>,
}

impl<'a> RespArena<'a> {
    /// Creates an arena with the default batch sizes.
    pub fn new() -> Self {
        Self::build(AllocConfig::default())
    }

    /// Creates an arena with custom batch sizes.
    ///
    /// # Errors
    /// Returns `RespError::InvalidConfig` when `config` fails validation.
    pub fn with_config(config: AllocConfig) -> RespResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: AllocConfig) -> Self {
        RespArena {
            config,
            nodes: Arena::new(),
            slots: Arena::new(),
            large: Arena::new(),
        }
    }

    /// Batch sizing this arena was built with.
    pub fn config(&self) -> &AllocConfig {
        &self.config
    }

    /// Returns a fresh allocator drawing from this arena.
    ///
    /// Each allocator keeps its own cursors; batches are never shared between
    /// allocators.
    pub fn allocator(&'a self) -> RespAlloc<'a> {
        RespAlloc {
            arena: self,
            nodes: Default::default(),
            slots: Default::default(),
            stats: AllocStats::default(),
        }
    }
}

impl Default for RespArena<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RespArena<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RespArena")
            .field("config", &self.config)
            .field("nodes", &self.nodes.len())
            .field("slots", &self.slots.len())
            .field("large", &self.large.len())
            .finish()
    }
}

/// Bump allocator over a [`RespArena`].
///
/// Not thread-safe: it is neither `Send` nor `Sync`, so each connection or
/// parse cycle owns its own.
///
/// Moving an allocator to another thread does not compile:
///
/// ```compile_fail
/// use proxy_resp::RespArena;
///
/// let arena = RespArena::new();
/// let mut alloc = arena.allocator();
/// std::thread::scope(|s| {
///     s.spawn(move || alloc.alloc_node().is_null());
/// });
/// ```
///
/// Nor does sharing one by reference:
///
/// ```compile_fail
/// use proxy_resp::RespArena;
///
/// fn shared<T: Sync>(_: &T) {}
///
/// let arena = RespArena::new();
/// let alloc = arena.allocator();
/// shared(&alloc);
/// ```
///
/// Each thread builds its own arena instead:
///
/// ```rust
/// use proxy_resp::{Resp, RespArena};
///
/// std::thread::scope(|s| {
///     for _ in 0..2 {
///         s.spawn(|| {
///             let arena = RespArena::new();
///             let mut alloc = arena.allocator();
///             let ok = alloc.alloc(Resp::new_string("OK")).is_string();
///             ok
///         });
///     }
/// });
/// ```
pub struct RespAlloc<'a> {
    arena: &'a RespArena<'a>,
    // Unused tail of the current node batch.
    nodes: &'a mut [Resp<'a>],
    // Unused tail of the current slot batch.
    slots: &'a mut [RespRef<'a>],
    stats: AllocStats,
}

impl<'a> RespAlloc<'a> {
    /// Returns an empty node for the caller to fill.
    ///
    /// The node reads as a null bulk string until overwritten.
    ///
    /// **Logic**:
    /// 1. If the current batch is used up, allocate `node_batch` fresh nodes.
    /// 2. Split the first node off the batch and keep the rest as the cursor.
    pub fn alloc_node(&mut self) -> &'a mut Resp<'a> {
        if self.nodes.is_empty() {
            let batch = self.arena.config.node_batch;
            self.nodes = self
                .arena
                .nodes
                .alloc_extend(iter::repeat_with(Resp::default).take(batch));
            self.stats.node_batches += 1;
            trace!(batch, "resp node batch allocated");
        }

        let (node, rest) = mem::take(&mut self.nodes).split_at_mut(1);
        self.nodes = rest;
        self.stats.nodes += 1;
        &mut node[0]
    }

    /// Stores a fully built value and returns a shared reference to it.
    pub fn alloc(&mut self, value: Resp<'a>) -> &'a Resp<'a> {
        let node = self.alloc_node();
        *node = value;
        node
    }

    /// Returns `n` empty child slots.
    ///
    /// **Logic**:
    /// 1. `n >= array_threshold`: allocate exactly `n` slots outside the pool.
    /// 2. Otherwise, if fewer than `n` slots remain, start a fresh batch and
    ///    abandon the old tail.
    /// 3. Split `n` slots off the batch.
    ///
    /// The returned slice cannot grow; `alloc_array(0)` is an empty slice, not
    /// a null array.
    pub fn alloc_array(&mut self, n: usize) -> &'a mut [RespRef<'a>] {
        let config = self.arena.config;
        if n >= config.array_threshold {
            self.stats.direct_arrays += 1;
            debug!(len = n, threshold = config.array_threshold, "resp array bypasses pool");
            return self.arena.large.alloc_extend(iter::repeat(None).take(n));
        }

        if self.slots.len() < n {
            let abandoned = self.slots.len();
            self.stats.abandoned_slots += abandoned as u64;
            self.slots = self
                .arena
                .slots
                .alloc_extend(iter::repeat(None).take(config.array_batch));
            self.stats.array_batches += 1;
            trace!(batch = config.array_batch, abandoned, "resp array batch allocated");
        }

        let (array, rest) = mem::take(&mut self.slots).split_at_mut(n);
        self.slots = rest;
        self.stats.pooled_arrays += 1;
        array
    }

    /// Nodes left in the current batch.
    pub fn remaining_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Slots left in the current slot batch.
    pub fn remaining_slots(&self) -> usize {
        self.slots.len()
    }

    /// Counters since this allocator was created.
    pub fn stats(&self) -> AllocStats {
        self.stats
    }
}

impl fmt::Debug for RespAlloc<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RespAlloc")
            .field("config", &self.arena.config)
            .field("remaining_nodes", &self.nodes.len())
            .field("remaining_slots", &self.slots.len())
            .field("stats", &self.stats)
            .finish()
    }
}
