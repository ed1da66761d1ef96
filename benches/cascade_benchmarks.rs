use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tless_detect::core::types::Scalar;
use tless_detect::core::{Mat, MatDepth};
use tless_detect::detect::nms::non_max_suppression;
use tless_detect::detect::matcher::Detection;
use tless_detect::core::types::Rect;
use tless_detect::imgproc::quantized_normals;

fn flat_depth(size: usize, value: u16) -> Mat {
    let mut depth = Mat::new(size, size, 1, MatDepth::U16).unwrap();
    for y in 0..size {
        for x in 0..size {
            depth.set_u16(y, x, 0, value).unwrap();
        }
    }
    depth
}

fn bench_quantized_normals(c: &mut Criterion) {
    let mut group = c.benchmark_group("quantized_normals");

    for size in [128, 256, 512].iter() {
        let depth = flat_depth(*size, 1000);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                quantized_normals(black_box(&depth), 572.41, 573.57, 2000, 20).unwrap()
            })
        });
    }

    group.finish();
}

fn detections(count: usize) -> Vec<Detection> {
    (0..count)
        .map(|i| Detection {
            template_id: i as i32,
            bbox: Rect::new((i as i32 * 7) % 400, (i as i32 * 11) % 400, 40, 40),
            score: 1.0 / (1.0 + i as f32),
        })
        .collect()
}

fn bench_nms(c: &mut Criterion) {
    let mut group = c.benchmark_group("non_max_suppression");

    for count in [50, 200, 1000].iter() {
        let input = detections(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| non_max_suppression(black_box(input.clone()), 0.5))
        });
    }

    group.finish();
}

fn bench_mat_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Mat Creation");

    for size in [100, 500, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("new_with_default", size), size, |b, &size| {
            b.iter(|| {
                Mat::new_with_default(black_box(size), black_box(size), black_box(3), black_box(MatDepth::U8), black_box(Scalar::all(128.0)))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_quantized_normals, bench_nms, bench_mat_creation);
criterion_main!(benches);
