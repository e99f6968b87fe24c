//! One-shot helpers on `image::RgbImage` frame pairs.

use flashblob_core::{BinaryMask, Contour, DiffMask, DiffThreshold, Rect, RgbImageView};
use flashblob_extract::{
    sort_contours_by_area_desc, sort_rects_by_area_desc, BoundingBoxExtractor, BoundingBoxParams,
    ContourTracer, ContourTracerParams, Region,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::coordinator::Frame;

/// Errors produced by the one-shot helpers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    #[error("flash-on frame is {on_width}x{on_height} but flash-off frame is {off_width}x{off_height}")]
    FrameSizeMismatch {
        on_width: u32,
        on_height: u32,
        off_width: u32,
        off_height: u32,
    },
}

/// Borrow an `image::RgbImage` as a core view.
pub fn rgb_view(img: &::image::RgbImage) -> RgbImageView<'_> {
    RgbImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Owned images are recycled by dropping them.
impl Frame for ::image::RgbImage {
    fn width(&self) -> usize {
        ::image::RgbImage::width(self) as usize
    }

    fn height(&self) -> usize {
        ::image::RgbImage::height(self) as usize
    }

    fn view(&self) -> RgbImageView<'_> {
        rgb_view(self)
    }

    fn recycle(self) {}
}

fn check_pair(on: &::image::RgbImage, off: &::image::RgbImage) -> Result<(), DetectError> {
    if on.dimensions() != off.dimensions() {
        return Err(DetectError::FrameSizeMismatch {
            on_width: on.width(),
            on_height: on.height(),
            off_width: off.width(),
            off_height: off.height(),
        });
    }
    Ok(())
}

/// Bounding boxes of the targets lit in `on` but not in `off`, largest first.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(on, off), fields(width = on.width(), height = on.height()))
)]
pub fn detect_boxes(
    on: &::image::RgbImage,
    off: &::image::RgbImage,
    threshold: DiffThreshold,
    params: BoundingBoxParams,
) -> Result<Vec<Rect>, DetectError> {
    check_pair(on, off)?;
    let mask = DiffMask::new(rgb_view(on), rgb_view(off), threshold);
    let region = Region::full(mask.width(), mask.height());
    let mut boxes = BoundingBoxExtractor::new(params).extract(&mask, region);
    sort_rects_by_area_desc(&mut boxes);
    Ok(boxes)
}

/// Contours of the targets lit in `on` but not in `off`, largest first.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(on, off), fields(width = on.width(), height = on.height()))
)]
pub fn detect_contours(
    on: &::image::RgbImage,
    off: &::image::RgbImage,
    threshold: DiffThreshold,
    params: ContourTracerParams,
) -> Result<Vec<Contour>, DetectError> {
    check_pair(on, off)?;
    let mask = DiffMask::new(rgb_view(on), rgb_view(off), threshold);
    let region = Region::full(mask.width(), mask.height());
    let mut contours = ContourTracer::new(params).trace(&mask, region);
    sort_contours_by_area_desc(&mut contours);
    Ok(contours)
}

/// Difference mask as a black/white image, for debugging thresholds.
pub fn render_mask(
    on: &::image::RgbImage,
    off: &::image::RgbImage,
    threshold: DiffThreshold,
) -> Result<::image::GrayImage, DetectError> {
    check_pair(on, off)?;
    let mask = DiffMask::new(rgb_view(on), rgb_view(off), threshold);
    Ok(::image::GrayImage::from_fn(on.width(), on.height(), |x, y| {
        ::image::Luma([if mask.test(x as i32, y as i32) { 255 } else { 0 }])
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashblob_core::Channel;

    fn pair() -> (::image::RgbImage, ::image::RgbImage) {
        let off = ::image::RgbImage::from_pixel(48, 32, ::image::Rgb([20, 30, 20]));
        let mut on = off.clone();
        for y in 6..=21 {
            for x in 10..=29 {
                on.put_pixel(x, y, ::image::Rgb([25, 190, 30]));
            }
        }
        (on, off)
    }

    #[test]
    fn boxes_from_image_pair() {
        let (on, off) = pair();
        let boxes = detect_boxes(
            &on,
            &off,
            DiffThreshold::new(Channel::Green, 70),
            BoundingBoxParams::new(4).expect("params"),
        )
        .expect("same size");
        assert_eq!(boxes, vec![Rect::new(10.0, 6.0, 20.0, 16.0)]);
    }

    #[test]
    fn contours_from_image_pair() {
        let (on, off) = pair();
        let params = ContourTracerParams::new(5, 5, 4.0, 1.0, 256).expect("params");
        let contours = detect_contours(&on, &off, DiffThreshold::new(Channel::Green, 70), params)
            .expect("same size");
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].bounds(), Rect::new(10.0, 6.0, 20.0, 16.0));
    }

    #[test]
    fn mismatched_pair_is_an_error() {
        let (on, _) = pair();
        let off = ::image::RgbImage::new(10, 10);
        let err = render_mask(&on, &off, DiffThreshold::new(Channel::Green, 70)).unwrap_err();
        assert!(matches!(err, DetectError::FrameSizeMismatch { off_width: 10, .. }));
    }

    #[test]
    fn rendered_mask_marks_lit_pixels() {
        let (on, off) = pair();
        let img = render_mask(&on, &off, DiffThreshold::new(Channel::Green, 70)).expect("same size");
        assert_eq!(img.get_pixel(10, 6).0, [255]);
        assert_eq!(img.get_pixel(9, 6).0, [0]);
        assert_eq!(img.pixels().filter(|p| p.0[0] == 255).count(), 20 * 16);
    }
}
