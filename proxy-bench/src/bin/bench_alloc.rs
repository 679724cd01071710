//! # Allocation Benchmark Harness
//!
//! Purpose: Compare building decoded RESP arrays through `RespAlloc` against
//! one heap allocation per value, so batch sizes can be retuned with numbers.
//!
//! ## Design Principles
//! 1. **Deterministic Workload**: Payloads are pre-built from a fixed seed.
//! 2. **Allocation Control**: Payloads are shared `Bytes`, so only node and
//!    array storage is measured.
//! 3. **Arena Per Message**: Each message gets a fresh arena, matching a
//!    parse-and-respond cycle in the proxy.
//!
//! Usage: `bench_alloc [messages] [elements] [value_size]`, with `RUST_LOG`
//! controlling allocator tracing.

use std::env;
use std::hint::black_box;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::info;
use tracing_subscriber::EnvFilter;

use proxy_resp::{AllocConfig, Resp, RespArena, RespResult};

const DEFAULT_MESSAGES: usize = 200_000;
const DEFAULT_ELEMENTS: usize = 8;
const DEFAULT_VALUE_SIZE: usize = 32;

struct BenchConfig {
    messages: usize,
    elements: usize,
    value_size: usize,
}

impl BenchConfig {
    fn from_args() -> Self {
        let mut args = env::args().skip(1);
        BenchConfig {
            messages: parse_usize(args.next(), DEFAULT_MESSAGES),
            elements: parse_usize(args.next(), DEFAULT_ELEMENTS),
            value_size: parse_usize(args.next(), DEFAULT_VALUE_SIZE),
        }
    }
}

fn parse_usize(value: Option<String>, fallback: usize) -> usize {
    value.and_then(|raw| raw.parse().ok()).unwrap_or(fallback)
}

fn build_payloads(count: usize, size: usize, seed: u64) -> Vec<Bytes> {
    (0..count)
        .map(|i| {
            let mut buffer = vec![0u8; size];
            let bytes = (seed ^ i as u64).to_le_bytes();
            let copy_len = size.min(bytes.len());
            buffer[..copy_len].copy_from_slice(&bytes[..copy_len]);
            Bytes::from(buffer)
        })
        .collect()
}

fn report(label: &str, ops: usize, elapsed: Duration) {
    let secs = elapsed.as_secs_f64();
    let ops_per_sec = (ops as f64) / secs;
    let nanos_per_op = (secs * 1e9) / (ops as f64);
    println!("{label}: {ops} msgs in {secs:.3}s ({ops_per_sec:.0} msgs/s, {nanos_per_op:.1} ns/msg)");
}

/// Heap-per-value baseline: one `Box` per node, one `Vec` per array.
#[allow(dead_code)]
enum Boxed {
    Bulk(Bytes),
    Array(Vec<Box<Boxed>>),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(err) = run() {
        eprintln!("bench_alloc failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> RespResult<()> {
    let config = BenchConfig::from_args();
    let alloc_config = AllocConfig::default();
    alloc_config.validate()?;

    let payloads = build_payloads(config.elements, config.value_size, 0xA5A5_A5A5_A5A5_A5A5);
    info!(
        messages = config.messages,
        elements = config.elements,
        value_size = config.value_size,
        ?alloc_config,
        "starting allocation benchmark"
    );

    let start = Instant::now();
    for _ in 0..config.messages {
        let arena = RespArena::with_config(alloc_config)?;
        let mut alloc = arena.allocator();
        let slots = alloc.alloc_array(payloads.len());
        for (slot, payload) in slots.iter_mut().zip(&payloads) {
            *slot = Some(alloc.alloc(Resp::BulkBytes(Some(payload.clone()))));
        }
        let array = alloc.alloc(Resp::new_array(slots));
        black_box(array.len());
    }
    report("arena", config.messages, start.elapsed());

    let start = Instant::now();
    for _ in 0..config.messages {
        let children = payloads
            .iter()
            .map(|payload| Box::new(Boxed::Bulk(payload.clone())))
            .collect();
        let array = Box::new(Boxed::Array(children));
        black_box(&array);
    }
    report("boxed", config.messages, start.elapsed());

    Ok(())
}
