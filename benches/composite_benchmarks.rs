use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{Rgba, RgbaImage};
use imgly_composite::{
    composite, resize_foreground, synthesize_shadow, Placement, ShadowOffset, ShadowSpec,
};

fn background(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8, 255])
    })
}

/// Opaque disc on a transparent canvas, roughly what a segmented subject looks like
fn foreground(size: u32) -> RgbaImage {
    let center = f64::from(size) / 2.0;
    RgbaImage::from_fn(size, size, |x, y| {
        let dx = f64::from(x) - center;
        let dy = f64::from(y) - center;
        if (dx * dx + dy * dy).sqrt() < center * 0.8 {
            Rgba([220, 40, 40, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

fn benchmark_composite(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite");
    group.sample_size(20);

    let shadow = ShadowSpec::enabled();
    for (bg_size, fg_size) in [(512u32, 256u32), (1920, 800)] {
        let bg = background(bg_size, bg_size * 3 / 4);
        let fg = foreground(fg_size);
        let label = format!("{bg_size}_{fg_size}");

        group.bench_with_input(BenchmarkId::new("plain", &label), &(), |b, ()| {
            b.iter(|| {
                composite(
                    black_box(&bg),
                    black_box(&fg),
                    &Placement::default(),
                    None,
                )
            });
        });

        group.bench_with_input(BenchmarkId::new("shadow", &label), &(), |b, ()| {
            b.iter(|| {
                composite(
                    black_box(&bg),
                    black_box(&fg),
                    &Placement::default(),
                    Some(&shadow),
                )
            });
        });
    }

    group.finish();
}

fn benchmark_resize(c: &mut Criterion) {
    let mut group = c.benchmark_group("resize_foreground");
    group.sample_size(20);

    let fg = foreground(512);
    for scale in [0.5f32, 1.0, 1.5] {
        group.bench_with_input(BenchmarkId::from_parameter(scale), &scale, |b, &scale| {
            b.iter(|| resize_foreground(black_box(&fg), scale));
        });
    }

    group.finish();
}

fn benchmark_shadow(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthesize_shadow");
    group.sample_size(20);

    let fg = foreground(400);
    for radius in [5u32, 15, 30] {
        group.bench_with_input(BenchmarkId::from_parameter(radius), &radius, |b, &radius| {
            b.iter(|| synthesize_shadow(black_box(&fg), radius, ShadowOffset::default()));
        });
    }

    group.finish();
}

criterion_group!(
    composite_benches,
    benchmark_composite,
    benchmark_resize,
    benchmark_shadow
);
criterion_main!(composite_benches);
