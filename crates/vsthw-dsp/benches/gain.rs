use criterion::{criterion_group, criterion_main, Criterion};
use vsthw_dsp::apply_gain;

fn bench_gain(c: &mut Criterion) {
    let mut channels = vec![vec![0.5f32; 512]; 2];
    c.bench_function("apply_gain 2x512", |b| {
        b.iter(|| apply_gain(&mut channels, 2, -3.0))
    });
}

criterion_group!(benches, bench_gain);
criterion_main!(benches);
