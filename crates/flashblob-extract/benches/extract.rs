use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flashblob_core::{BitMask, Channel, DiffMask, DiffThreshold, RgbImage};
use flashblob_extract::{
    BoundingBoxExtractor, BoundingBoxParams, ContourTracer, ContourTracerParams, Region,
};

const W: usize = 640;
const H: usize = 480;

/// Flash-on/off pair with three lit targets on a noisy background.
fn frame_pair() -> (RgbImage, RgbImage) {
    let targets = [(80, 60, 150, 200), (300, 220, 360, 250), (480, 40, 600, 420)];
    let mut state = 0x9e37_79b9_u32;
    let mut noise = move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        (state % 24) as u8
    };
    let off = RgbImage::from_fn(W, H, |_, _| {
        let n = noise();
        [40 + n, 50 + n, 45 + n]
    });
    let mut on = off.clone();
    for &(x0, y0, x1, y1) in &targets {
        for y in y0..=y1 {
            for x in x0..=x1 {
                on.put_pixel(x, y, [60, 220, 70]);
            }
        }
    }
    (on, off)
}

fn bench_bounding_box(c: &mut Criterion) {
    let (on, off) = frame_pair();
    let threshold = DiffThreshold::new(Channel::Green, 70);
    let extractor = BoundingBoxExtractor::new(BoundingBoxParams::new(40).expect("params"));
    let region = Region::full(W, H);

    c.bench_function("bbox_diffmask_640x480", |b| {
        b.iter(|| {
            let mask = DiffMask::new(on.view(), off.view(), threshold);
            black_box(extractor.extract(black_box(&mask), region).len())
        })
    });

    let bits = BitMask::from_mask(&DiffMask::new(on.view(), off.view(), threshold), W, H);
    c.bench_function("bbox_bitmask_640x480", |b| {
        b.iter(|| black_box(extractor.extract(black_box(&bits), region).len()))
    });
}

fn bench_contour(c: &mut Criterion) {
    let (on, off) = frame_pair();
    let threshold = DiffThreshold::new(Channel::Green, 70).with_ceiling(Channel::Red, 70);
    let params = ContourTracerParams::new(20, 10, 10.0, 4.0, 1024).expect("params");
    let tracer = ContourTracer::new(params);
    let region = Region::full(W, H);

    c.bench_function("contour_diffmask_640x480", |b| {
        b.iter(|| {
            let mask = DiffMask::new(on.view(), off.view(), threshold);
            black_box(tracer.trace(black_box(&mask), region).len())
        })
    });
}

criterion_group!(extract, bench_bounding_box, bench_contour);
criterion_main!(extract);
