//! Sorting, batching, and labelling cost for large instance lists.

#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use glam::{Mat4, Vec3, Vec4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rimrender::scene::batch::{batches, sort_for_drawing};
use rimrender::scene::label::{label_instances, Highlight};
use rimrender::{MeshId, MeshInstance};

fn random_instances(count: usize, meshes: u32) -> Vec<MeshInstance> {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    (0..count)
        .map(|_| {
            let alpha = if rng.random_bool(0.2) { 0.5 } else { 1.0 };
            let position = Vec3::new(
                rng.random_range(-50.0..50.0),
                rng.random_range(0.0..10.0),
                rng.random_range(-50.0..50.0),
            );
            MeshInstance::new(
                MeshId(rng.random_range(0..meshes)),
                Mat4::from_translation(position),
                Vec4::new(0.8, 0.8, 0.8, alpha),
            )
        })
        .collect()
}

fn sort_and_batch_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort_and_batch");
    for count in [100, 1_000, 10_000, 50_000] {
        let instances = random_instances(count, 16);
        group.bench_function(format!("{count}_instances"), |b| {
            b.iter_batched(
                || instances.clone(),
                |mut list| {
                    sort_for_drawing(&mut list);
                    black_box(batches(&list).count())
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn label_benchmark(c: &mut Criterion) {
    let instances = random_instances(10_000, 16);
    c.bench_function("label_10000_instances", |b| {
        b.iter_batched(
            || instances.clone(),
            |mut list| {
                label_instances(&mut list, |i| {
                    if i % 97 == 0 {
                        Highlight::Selected
                    } else {
                        Highlight::None
                    }
                })
                .map(|()| black_box(list.len()))
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, sort_and_batch_benchmark, label_benchmark);
criterion_main!(benches);
