/// Class id of "person" in the COCO label space used by the YOLO models.
pub const PERSON_CLASS_ID: u32 = 0;

/// One detector output box in full-resolution pixel coordinates.
///
/// A plain value: boxes carry no identity across frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionBox {
    pub class_id: u32,
    pub confidence: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl DetectionBox {
    pub fn new(class_id: u32, confidence: f32, xyxy: (f32, f32, f32, f32)) -> Self {
        let (x1, y1, x2, y2) = xyxy;
        Self {
            class_id,
            confidence,
            x1,
            y1,
            x2,
            y2,
        }
    }

    pub fn is_person(&self) -> bool {
        self.class_id == PERSON_CLASS_ID
    }

    /// Integer corners, truncated toward zero.
    pub fn pixel_corners(&self) -> (i32, i32, i32, i32) {
        (
            self.x1 as i32,
            self.y1 as i32,
            self.x2 as i32,
            self.y2 as i32,
        )
    }

    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    pub fn iou(&self, other: &DetectionBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }
}

/// Detector output for one frame.
///
/// The box collection may be absent altogether, which is a valid
/// "nothing detected" state and distinct from an empty list only in
/// how the detector reported it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionResult {
    boxes: Option<Vec<DetectionBox>>,
}

impl DetectionResult {
    pub fn new(boxes: Vec<DetectionBox>) -> Self {
        Self { boxes: Some(boxes) }
    }

    /// A result that carries no box collection at all.
    pub fn without_boxes() -> Self {
        Self { boxes: None }
    }

    pub fn boxes(&self) -> Option<&[DetectionBox]> {
        self.boxes.as_deref()
    }

    /// Iterates over all boxes; yields nothing when the collection is absent.
    pub fn iter(&self) -> impl Iterator<Item = &DetectionBox> {
        self.boxes.iter().flatten()
    }

    pub fn person_boxes(&self) -> impl Iterator<Item = &DetectionBox> {
        self.iter().filter(|b| b.is_person())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bx(class_id: u32, x1: f32, y1: f32, x2: f32, y2: f32) -> DetectionBox {
        DetectionBox::new(class_id, 0.9, (x1, y1, x2, y2))
    }

    #[test]
    fn test_is_person() {
        assert!(bx(0, 0.0, 0.0, 1.0, 1.0).is_person());
        assert!(!bx(1, 0.0, 0.0, 1.0, 1.0).is_person());
        assert!(!bx(56, 0.0, 0.0, 1.0, 1.0).is_person());
    }

    #[test]
    fn test_pixel_corners_truncate() {
        let b = bx(0, 10.9, 10.1, 50.5, 49.99);
        assert_eq!(b.pixel_corners(), (10, 10, 50, 49));
    }

    #[test]
    fn test_iou_identical() {
        let b = bx(0, 0.0, 0.0, 10.0, 10.0);
        assert_relative_eq!(b.iou(&b), 1.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        let a = bx(0, 0.0, 0.0, 100.0, 100.0);
        let b = bx(0, 50.0, 0.0, 150.0, 100.0);
        assert_relative_eq!(a.iou(&b), 5000.0 / 15000.0);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = bx(0, 0.0, 0.0, 10.0, 10.0);
        let b = bx(0, 20.0, 20.0, 30.0, 30.0);
        assert_relative_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_result_without_boxes_yields_nothing() {
        let r = DetectionResult::without_boxes();
        assert!(r.boxes().is_none());
        assert_eq!(r.iter().count(), 0);
        assert_eq!(r.person_boxes().count(), 0);
    }

    #[test]
    fn test_person_boxes_filters_by_class() {
        let r = DetectionResult::new(vec![
            bx(2, 0.0, 0.0, 1.0, 1.0),
            bx(0, 5.0, 5.0, 9.0, 9.0),
            bx(0, 1.0, 1.0, 2.0, 2.0),
        ]);
        assert_eq!(r.iter().count(), 3);
        assert_eq!(r.person_boxes().count(), 2);
    }
}
