use flashblob_core::{BinaryMask, Channel, DiffMask, DiffThreshold, Rect, RgbImage};
use flashblob_extract::{
    sort_contours_by_area_desc, sort_rects_by_area_desc, BoundingBoxExtractor, BoundingBoxParams,
    ContourTracer, ContourTracerParams, Region,
};

const BACKGROUND: [u8; 3] = [30, 40, 35];
const LIT: [u8; 3] = [35, 200, 40];
const GLARE: [u8; 3] = [250, 250, 250];

type Patch = (usize, usize, usize, usize, [u8; 3]);

fn pair(width: usize, height: usize, lit: &[Patch]) -> (RgbImage, RgbImage) {
    let off = RgbImage::from_fn(width, height, |_, _| BACKGROUND);
    let mut on = off.clone();
    for &(x0, y0, x1, y1, rgb) in lit {
        for y in y0..=y1 {
            for x in x0..=x1 {
                on.put_pixel(x, y, rgb);
            }
        }
    }
    (on, off)
}

fn green() -> DiffThreshold {
    DiffThreshold::new(Channel::Green, 70)
}

#[test]
fn lit_square_in_small_frame_is_one_exact_box() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (on, off) = pair(20, 20, &[(5, 5, 14, 14, LIT)]);
    let mask = DiffMask::new(on.view(), off.view(), green());
    let ex = BoundingBoxExtractor::new(BoundingBoxParams::new(4).expect("params"));
    assert_eq!(
        ex.extract(&mask, Region::full(20, 20)),
        vec![Rect::new(5.0, 5.0, 10.0, 10.0)]
    );
}

#[test]
fn unchanged_frames_detect_nothing() {
    let (on, off) = pair(120, 90, &[]);
    let mask = DiffMask::new(on.view(), off.view(), green());
    let ex = BoundingBoxExtractor::new(BoundingBoxParams::new(8).expect("params"));
    assert!(ex.extract(&mask, Region::full(120, 90)).is_empty());

    let tracer = ContourTracer::new(ContourTracerParams::new(10, 10, 4.0, 1.0, 256).expect("params"));
    assert!(tracer.trace(&mask, Region::full(120, 90)).is_empty());
}

#[test]
fn two_targets_come_back_largest_first() {
    let (on, off) = pair(
        160,
        120,
        &[(10, 10, 39, 39, LIT), (90, 50, 149, 109, LIT)],
    );
    let mask = DiffMask::new(on.view(), off.view(), green());
    let ex = BoundingBoxExtractor::new(BoundingBoxParams::new(8).expect("params"));
    let mut boxes = ex.extract(&mask, Region::full(160, 120));
    sort_rects_by_area_desc(&mut boxes);
    assert_eq!(
        boxes,
        vec![
            Rect::new(90.0, 50.0, 60.0, 60.0),
            Rect::new(10.0, 10.0, 30.0, 30.0)
        ]
    );
}

#[test]
fn glare_is_ignored_only_with_a_ceiling() {
    let (on, off) = pair(
        160,
        120,
        &[(10, 10, 49, 49, LIT), (90, 30, 139, 89, GLARE)],
    );
    let region = Region::full(160, 120);
    let tracer = ContourTracer::new(ContourTracerParams::new(10, 10, 4.0, 1.0, 512).expect("params"));

    let plain = DiffMask::new(on.view(), off.view(), green());
    assert_eq!(tracer.trace(&plain, region).len(), 2);

    let capped = DiffMask::new(on.view(), off.view(), green().with_ceiling(Channel::Red, 70));
    let mut contours = tracer.trace(&capped, region);
    sort_contours_by_area_desc(&mut contours);
    assert_eq!(contours.len(), 1);
    let b = contours[0].bounds();
    assert_eq!((b.x(), b.y(), b.max_x(), b.max_y()), (10.0, 10.0, 50.0, 50.0));
}

#[test]
fn contour_vertices_lie_on_lit_pixels() {
    let (on, off) = pair(100, 100, &[(20, 30, 79, 69, LIT)]);
    let mask = DiffMask::new(on.view(), off.view(), green());
    let tracer = ContourTracer::new(ContourTracerParams::new(10, 10, 5.0, 1.0, 512).expect("params"));
    let contours = tracer.trace(&mask, Region::full(100, 100));
    assert_eq!(contours.len(), 1);
    for p in contours[0].points() {
        assert!(mask.test_f64(p.x, p.y), "vertex {p} is not lit");
    }
}
