//! # Core Benchmark Harness
//!
//! Purpose: a dependency-free, repeatable benchmark driver for the pieces of
//! `gcache-core` that sit on the hot path of a cache hit — the LRU, the
//! consistent-hash ring, and a `Group` with a warm local cache — so baseline
//! throughput can be compared over time.
//!
//! ## Design Principles
//! 1. **Deterministic Workload**: a fixed PRNG seed for stable comparisons.
//! 2. **Allocation Control**: keys and values are pre-built to keep setup
//!    costs off the timed loop.
//! 3. **Warm-Cache Focus**: the loader/getter is only ever consulted once
//!    per key, up front; every timed `Group::get` is a local cache hit.

use std::env;
use std::hint::black_box;
use std::sync::Arc;
use std::time::Instant;

use gcache_common::error::BoxError;
use gcache_common::ByteView;
use gcache_core::{Getter, Group, LruCache, Ring};

const DEFAULT_KEY_COUNT: usize = 1 << 14;
const DEFAULT_OP_COUNT: usize = 1_000_000;
const DEFAULT_KEY_SIZE: usize = 16;
const DEFAULT_VALUE_SIZE: usize = 128;
const DEFAULT_PEER_COUNT: usize = 16;

struct BenchConfig {
    requested_keys: usize,
    key_count: usize,
    key_mask: usize,
    op_count: usize,
    key_size: usize,
    value_size: usize,
    peer_count: usize,
}

impl BenchConfig {
    fn from_args() -> Self {
        let mut args = env::args().skip(1);
        let requested_keys = parse_usize(args.next(), DEFAULT_KEY_COUNT);
        let op_count = parse_usize(args.next(), DEFAULT_OP_COUNT);
        let key_size = parse_usize(args.next(), DEFAULT_KEY_SIZE);
        let value_size = parse_usize(args.next(), DEFAULT_VALUE_SIZE);
        let peer_count = parse_usize(args.next(), DEFAULT_PEER_COUNT);

        let key_count = normalize_power_of_two(requested_keys);
        let key_mask = key_count - 1;

        BenchConfig {
            requested_keys,
            key_count,
            key_mask,
            op_count,
            key_size,
            value_size,
            peer_count,
        }
    }
}

fn parse_usize(value: Option<String>, fallback: usize) -> usize {
    value.and_then(|raw| raw.parse().ok()).unwrap_or(fallback)
}

fn normalize_power_of_two(value: usize) -> usize {
    let value = value.max(1);
    if value.is_power_of_two() {
        value
    } else {
        value.next_power_of_two()
    }
}

/// Tiny deterministic PRNG used to avoid external dependencies in the
/// benchmark harness itself (the crate under test still uses real crates).
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    #[inline]
    fn next_index(&mut self, mask: usize) -> usize {
        (self.next_u64() as usize) & mask
    }
}

fn write_u64_le(value: u64, buffer: &mut [u8]) {
    let bytes = value.to_le_bytes();
    let copy_len = buffer.len().min(bytes.len());
    buffer[..copy_len].copy_from_slice(&bytes[..copy_len]);
}

fn build_strings(count: usize, size: usize, seed: u64) -> Vec<String> {
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let mut buffer = vec![0u8; size];
        write_u64_le(seed ^ (i as u64), &mut buffer);
        out.push(buffer.iter().map(|b| (b'a' + (b % 26)) as char).collect());
    }
    out
}

fn report(label: &str, ops: usize, elapsed: std::time::Duration) {
    let secs = elapsed.as_secs_f64();
    let ops_per_sec = (ops as f64) / secs;
    let nanos_per_op = (secs * 1e9) / (ops as f64);
    println!("{label}: {ops} ops in {secs:.3}s ({ops_per_sec:.0} ops/s, {nanos_per_op:.1} ns/op)");
}

fn main() {
    let config = BenchConfig::from_args();
    println!(
        "keys: requested={}, actual={}, ops={}, key_size={}, value_size={}",
        config.requested_keys, config.key_count, config.op_count, config.key_size, config.value_size
    );

    bench_lru(&config);
    bench_ring(&config);
    bench_group_hit(&config);
}

fn bench_lru(config: &BenchConfig) {
    let keys = build_strings(config.key_count, config.key_size, 0xA5A5_A5A5_A5A5_A5A5);
    let value = ByteView::from_vec(vec![0u8; config.value_size]);

    let mut cache = LruCache::new(0);
    for key in &keys {
        cache.add(key.clone(), value.clone());
    }

    let mut rng = XorShift64::new(0x1234_5678_9ABC_DEF0);
    let start = Instant::now();
    for _ in 0..config.op_count {
        let idx = rng.next_index(config.key_mask);
        let got = cache.get(&keys[idx]);
        black_box(got);
    }
    report("LRU get", config.op_count, start.elapsed());
}

fn bench_ring(config: &BenchConfig) {
    let peer_ids: Vec<String> = (0..config.peer_count).map(|i| format!("peer-{i}")).collect();
    let peer_refs: Vec<&str> = peer_ids.iter().map(String::as_str).collect();

    let mut ring = Ring::new(50, None);
    ring.add(&peer_refs).expect("fresh peer set");

    let keys = build_strings(config.key_count, config.key_size, 0x5A5A_5A5A_5A5A_5A5A);
    let mut rng = XorShift64::new(0x0FED_CBA9_8765_4321);
    let start = Instant::now();
    for _ in 0..config.op_count {
        let idx = rng.next_index(config.key_mask);
        let owner = ring.get(&keys[idx]);
        black_box(owner);
    }
    report("Ring get", config.op_count, start.elapsed());
}

fn bench_group_hit(config: &BenchConfig) {
    let keys = build_strings(config.key_count, config.key_size, 0x1111_2222_3333_4444);
    let values = build_strings(config.key_count, config.value_size, 0x4444_3333_2222_1111);

    let getter: Arc<dyn Getter> = Arc::new({
        let keys = keys.clone();
        let values = values.clone();
        move |key: &str| -> Result<Vec<u8>, BoxError> {
            let idx = keys.iter().position(|k| k == key).expect("bench key exists");
            Ok(values[idx].clone().into_bytes())
        }
    });
    let group = Group::new("bench", 0, getter);

    // Warm the group so every timed `get` is a local cache hit.
    for key in &keys {
        group.get(key).expect("warm load succeeds");
    }

    let mut rng = XorShift64::new(0x2468_ACE0_1357_9BDF);
    let start = Instant::now();
    for _ in 0..config.op_count {
        let idx = rng.next_index(config.key_mask);
        let value = group.get(&keys[idx]).expect("cache hit does not fail");
        black_box(value);
    }
    report("Group get (warm)", config.op_count, start.elapsed());
}
