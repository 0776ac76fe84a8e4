use augmentation::rng::seed_rng;
use augmentation::{create_aug_transforms, Compose, Transform};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use image::{DynamicImage, Rgb, RgbImage};
use serde_json::{json, Value};

/// Benchmarks for compiled augmentation pipelines.
///
/// This measures:
/// 1. Compilation: config parsing + registry resolution
/// 2. Application: one image through a typical training pipeline
///
/// To run these, use:
/// ```bash
/// cargo bench -p augmentation
/// ```

/// Square input sizes swept by the application benchmark.
const SIZES: [u32; 3] = [64, 224, 512];

fn training_config() -> Value {
    json!({
        "pad2square": "no_params",
        "random_crop_and_resize": {"size": 224},
        "random_horizonflip": "no_params",
        "random_choice": [
            {"random_color_jitter": {"prob": 1.0, "brightness": 0.2, "contrast": 0.2}},
            {"random_cutout": {"length": 32}},
            {"random_gaussianblur": "no_params"},
        ],
        "to_tensor": "no_params",
        "normalize": "no_params",
    })
}

fn make_image(size: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(size, size, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
    }))
}

fn build(config: &Value) -> Compose {
    match create_aug_transforms(config) {
        Ok(pipeline) => pipeline,
        Err(e) => panic!("benchmark config failed to compile: {e:#}"),
    }
}

/// Measure config → pipeline compilation
fn bench_compile(c: &mut Criterion) {
    let config = training_config();
    c.bench_function("compile training pipeline", |b| {
        b.iter(|| black_box(build(black_box(&config))))
    });
}

/// Measure per-image application across input sizes
fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("Apply Pipeline");
    let pipeline = build(&training_config());
    seed_rng(0);

    for &size in &SIZES {
        let img = make_image(size);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(size), &img, |b, img| {
            b.iter(|| {
                let out = pipeline.apply(img.clone().into());
                black_box(out.is_ok());
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compile, bench_apply);
criterion_main!(benches);
