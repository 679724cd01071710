//! # Proxy RESP Core
//!
//! Purpose: In-memory RESP2 values for a Redis-compatible proxy, plus a pooled
//! allocator that keeps per-value allocation off the request hot path.
//!
//! ## Design Principles
//! 1. **Closed Value Set**: `Resp` is an enum over the five RESP2 types.
//! 2. **Arena Lifetimes**: Nodes and child arrays borrow a `RespArena` and are
//!    reclaimed together when it drops.
//! 3. **Single Owner**: One allocator per connection or parse cycle; the types
//!    are not `Sync`, so sharing is rejected at compile time.
//! 4. **No I/O**: Decoding and encoding belong to the codec built on top.

#![deny(missing_docs)]

mod alloc;
mod error;
mod resp;

pub use alloc::{
    AllocConfig, AllocStats, RespAlloc, RespArena, DEFAULT_ARRAY_BATCH, DEFAULT_ARRAY_THRESHOLD,
    DEFAULT_NODE_BATCH,
};
pub use error::{RespError, RespResult};
pub use resp::{type_label, Resp, RespRef, RespType};
