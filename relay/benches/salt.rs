// Copyright (c) 2024 Botho Foundation

//! Performance benchmarks for the relay hot paths.
//!
//! Run with: cargo bench -p bth-relay
//!
//! Salt derivation runs once per registration; fanout selection runs for
//! every accepted transaction against every peer, so it is the path that
//! matters.

use bth_relay::{FanoutDestinations, SharedSalt, OUTBOUND_FANOUT_DESTINATIONS};
use bth_relay_common::{PeerId, TxHash};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};

fn bench_shared_salt_compute(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let local_salt = rng.next_u64();
    let remote_salt = rng.next_u64();

    c.bench_function("shared_salt_compute", |b| {
        b.iter(|| SharedSalt::compute(black_box(local_salt), black_box(remote_salt)))
    });
}

fn bench_fanout_should_flood(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(8);
    let mut destinations = FanoutDestinations::new(OUTBOUND_FANOUT_DESTINATIONS);
    for id in 0..8 {
        destinations.register(PeerId(id));
    }
    let wtxid = TxHash(rng.gen());

    c.bench_function("fanout_should_flood", |b| {
        b.iter(|| destinations.should_flood(black_box(&wtxid), black_box(PeerId(3))))
    });
}

criterion_group!(benches, bench_shared_salt_compute, bench_fanout_should_flood);
criterion_main!(benches);
