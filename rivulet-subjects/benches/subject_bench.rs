// Copyright 2025 The Rivulet Contributors
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rivulet_core::{Observer, RivuletError};
use rivulet_subjects::{PublishSubject, ReplaySubject};
use std::sync::Arc;

struct Sink;

impl Observer<u64> for Sink {
    fn on_subscribe(&self, _cancellable: rivulet_core::Cancellable) {}
    fn on_next(&self, value: u64) {
        std::hint::black_box(value);
    }
    fn on_error(&self, _error: RivuletError) {}
    fn on_complete(&self) {}
}

fn publish_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish_fan_out");
    for observers in [1usize, 4, 16] {
        group.bench_with_input(
            BenchmarkId::from_parameter(observers),
            &observers,
            |b, &observers| {
                let subject = PublishSubject::new();
                for _ in 0..observers {
                    subject.subscribe(Arc::new(Sink));
                }
                let mut value = 0u64;
                b.iter(|| {
                    subject.on_next(value);
                    value = value.wrapping_add(1);
                });
            },
        );
    }
    group.finish();
}

fn replay_append(c: &mut Criterion) {
    c.bench_function("replay_bounded_append", |b| {
        let subject = ReplaySubject::with_capacity(64);
        subject.subscribe(Arc::new(Sink));
        let mut value = 0u64;
        b.iter(|| {
            subject.on_next(value);
            value = value.wrapping_add(1);
        });
    });
}

criterion_group!(benches, publish_fan_out, replay_append);
criterion_main!(benches);
