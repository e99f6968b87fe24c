use flashblob_core::{BinaryMask, Contour, Rect};
use flashblob_extract::{
    sort_contours_by_area_desc, sort_rects_by_area_desc, BoundingBoxExtractor, ContourTracer,
    Region,
};
use serde::{Deserialize, Serialize};

/// Detection strategy, fixed when the pipeline is built.
#[derive(Clone, Debug)]
pub enum Extractor {
    BoundingBox(BoundingBoxExtractor),
    ContourTrace(ContourTracer),
}

impl Extractor {
    /// Run over `region` and return detections sorted largest first.
    pub fn run<M: BinaryMask + ?Sized>(&self, mask: &M, region: Region) -> Detections {
        let mut out = match self {
            Extractor::BoundingBox(ex) => Detections::Boxes(ex.extract(mask, region)),
            Extractor::ContourTrace(tracer) => Detections::Contours(tracer.trace(mask, region)),
        };
        out.sort_by_area_desc();
        out
    }
}

/// Result of one detection cycle. An empty list means nothing was found.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum Detections {
    Boxes(Vec<Rect>),
    Contours(Vec<Contour>),
}

impl Detections {
    pub fn len(&self) -> usize {
        match self {
            Detections::Boxes(v) => v.len(),
            Detections::Contours(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sort_by_area_desc(&mut self) {
        match self {
            Detections::Boxes(v) => sort_rects_by_area_desc(v),
            Detections::Contours(v) => sort_contours_by_area_desc(v),
        }
    }

    /// Bounding rectangle of every detection, in order.
    pub fn bounds(&self) -> Vec<Rect> {
        match self {
            Detections::Boxes(v) => v.clone(),
            Detections::Contours(v) => v.iter().map(Contour::bounds).collect(),
        }
    }

    /// Rescale from pixels of a `width x height` frame to `[0, 1]`.
    pub fn normalized(&self, width: usize, height: usize) -> Self {
        match self {
            Detections::Boxes(v) => {
                Detections::Boxes(v.iter().map(|r| r.normalized(width, height)).collect())
            }
            Detections::Contours(v) => {
                Detections::Contours(v.iter().map(|c| c.normalized(width, height)).collect())
            }
        }
    }

    /// Keep detections whose bounds have `height / width` within
    /// `[1 / max_ratio, max_ratio]`.
    pub fn retain_aspect(&mut self, max_ratio: f64) {
        let keep = |r: &Rect| {
            let ar = r.aspect_ratio();
            ar >= 1.0 / max_ratio && ar <= max_ratio
        };
        match self {
            Detections::Boxes(v) => v.retain(keep),
            Detections::Contours(v) => v.retain(|c| keep(&c.bounds())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use flashblob_core::BitMask;
    use flashblob_extract::BoundingBoxParams;

    #[test]
    fn run_sorts_largest_first() {
        let mut mask = BitMask::new(80, 40);
        mask.fill_rect(4, 4, 13, 13);
        mask.fill_rect(40, 4, 69, 33);
        let ex = Extractor::BoundingBox(BoundingBoxExtractor::new(
            BoundingBoxParams::new(4).expect("params"),
        ));
        let d = ex.run(&mask, Region::full(80, 40));
        assert_eq!(
            d,
            Detections::Boxes(vec![
                Rect::new(40.0, 4.0, 30.0, 30.0),
                Rect::new(4.0, 4.0, 10.0, 10.0)
            ])
        );
    }

    #[test]
    fn aspect_filter_drops_slivers() {
        let mut d = Detections::Boxes(vec![
            Rect::new(0.0, 0.0, 100.0, 5.0),
            Rect::new(0.0, 0.0, 20.0, 30.0),
            Rect::new(0.0, 0.0, 4.0, 60.0),
        ]);
        d.retain_aspect(10.0);
        assert_eq!(d.bounds(), vec![Rect::new(0.0, 0.0, 20.0, 30.0)]);
    }

    #[test]
    fn normalized_boxes_are_frame_relative() {
        let d = Detections::Boxes(vec![Rect::new(160.0, 120.0, 320.0, 240.0)]).normalized(640, 480);
        let r = d.bounds()[0];
        assert_relative_eq!(r.x(), 0.25);
        assert_relative_eq!(r.y(), 0.25);
        assert_relative_eq!(r.width(), 0.5);
        assert_relative_eq!(r.height(), 0.5);
    }

    #[test]
    fn empty_result_serializes_with_kind() {
        let json = serde_json::to_string(&Detections::Contours(Vec::new())).expect("serialize");
        assert_eq!(json, r#"{"kind":"contours","items":[]}"#);
    }
}
