use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::DynamicImage;
use nazr_media_bridge::db::BucketRow;
use nazr_media_bridge::pipeline::buckets::aggregate;
use nazr_media_bridge::pipeline::transform::{transform, Rotation, Sizing};

fn bucket_rows(items: usize, buckets: usize) -> Vec<BucketRow> {
    (0..items)
        .map(|i| BucketRow {
            bucket_id: format!("Bucket-{}", i % buckets),
            bucket_name: Some(format!("Album {}", i % buckets)),
        })
        .collect()
}

fn bench_aggregate(c: &mut Criterion) {
    let few = bucket_rows(10_000, 12);
    c.bench_function("aggregate_10k_items_12_buckets", |b| {
        b.iter(|| black_box(aggregate(few.iter().cloned())));
    });

    let many = bucket_rows(10_000, 2_000);
    c.bench_function("aggregate_10k_items_2k_buckets", |b| {
        b.iter(|| black_box(aggregate(many.iter().cloned())));
    });
}

fn bench_thumbnail_transform(c: &mut Criterion) {
    let img = DynamicImage::new_rgb8(512, 384);
    c.bench_function("transform_512_to_120_rot90", |b| {
        b.iter(|| black_box(transform(&img, Sizing::Proportional { target: 120 }, Rotation::Cw90, 80).unwrap()));
    });
}

criterion_group!(benches, bench_aggregate, bench_thumbnail_transform);
criterion_main!(benches);
