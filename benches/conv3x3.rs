use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use grayscott::{
    Field, LAPLACIAN, Parameters, create,
    stencil::{conv3x3, conv3x3_vectorized},
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn bench_conv3x3(c: &mut Criterion) {
    let kernel = Field::new(LAPLACIAN).unwrap();
    let mut group = c.benchmark_group("conv3x3");

    for n in [128usize, 256, 512] {
        let input = Field::randu((n, n), &mut ChaCha8Rng::seed_from_u64(0x5eed)).unwrap();
        let mut output = input.similar().unwrap();
        group.throughput(Throughput::Elements((n * n) as u64));

        group.bench_with_input(BenchmarkId::new("scalar", n), &n, |b, _| {
            b.iter(|| conv3x3(black_box(&input), &kernel, &mut output).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("vectorized", n), &n, |b, _| {
            b.iter(|| conv3x3_vectorized(black_box(&input), &kernel, &mut output).unwrap());
        });
    }
    group.finish();
}

fn bench_step(c: &mut Criterion) {
    let params = Parameters {
        seed: Some(42),
        ..Parameters::default()
    };
    let mut group = c.benchmark_group("gray_scott_step");
    group.throughput(Throughput::Elements((params.nx * params.ny) as u64));

    for name in ["reference", "vectorized"] {
        let mut sim = create(name).unwrap();
        sim.initialize(&params).unwrap();
        group.bench_function(name, |b| b.iter(|| sim.step(black_box(params.dt)).unwrap()));
    }
    group.finish();
}

criterion_group!(benches, bench_conv3x3, bench_step);
criterion_main!(benches);
