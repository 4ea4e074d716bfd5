use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Duration;
use windowed_pipeline::RingBuffer;

fn benchmark_push_with_overflow(c: &mut Criterion) {
    let buffer = RingBuffer::new(64);
    c.bench_function("ring_buffer_push_overflowing", |b| {
        b.iter(|| {
            for i in 0..1024 {
                buffer.push(black_box(i));
            }
        });
    });
}

fn benchmark_push_then_flush(c: &mut Criterion) {
    let buffer = RingBuffer::new(1024);
    c.bench_function("ring_buffer_fill_and_flush_1024", |b| {
        b.iter(|| {
            for i in 0..1024 {
                buffer.push(black_box(i));
            }
            black_box(buffer.flush());
        });
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(5));
    targets = benchmark_push_with_overflow, benchmark_push_then_flush
);
criterion_main!(benches);
