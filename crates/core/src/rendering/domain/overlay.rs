use crate::detection::domain::presence_classifier::PresenceStatus;
use crate::shared::detection_box::DetectionResult;

/// Top-left corner of the status text baseline, in full-resolution pixels.
pub const TEXT_ORIGIN: (i32, i32) = (30, 30);
pub const FONT_SCALE: f64 = 1.0;
/// Stroke width for both the status text and the box outlines.
pub const LINE_THICKNESS: i32 = 2;

/// An 8-bit RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const GREEN: Color = Color { r: 0, g: 255, b: 0 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0 };

    pub fn for_status(status: PresenceStatus) -> Self {
        match status {
            PresenceStatus::HumanAvailable => Color::GREEN,
            PresenceStatus::NoHuman => Color::RED,
        }
    }

    pub fn rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// Box outline in full-resolution pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverlayRect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl OverlayRect {
    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }
}

/// Everything a presenter draws on one camera image.
#[derive(Clone, Debug, PartialEq)]
pub struct Overlay {
    pub text: &'static str,
    pub text_origin: (i32, i32),
    pub font_scale: f64,
    pub thickness: i32,
    pub color: Color,
    pub rects: Vec<OverlayRect>,
}

impl Overlay {
    /// Status text plus one outline per person box, all in the status color.
    ///
    /// Person boxes are outlined whatever the combined status is, so a camera
    /// that sees someone still shows the box in red when the other does not.
    pub fn build(status: PresenceStatus, result: &DetectionResult) -> Self {
        let rects = result
            .person_boxes()
            .map(|b| {
                let (x1, y1, x2, y2) = b.pixel_corners();
                OverlayRect { x1, y1, x2, y2 }
            })
            .collect();

        Self {
            text: status.label(),
            text_origin: TEXT_ORIGIN,
            font_scale: FONT_SCALE,
            thickness: LINE_THICKNESS,
            color: Color::for_status(status),
            rects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::detection_box::DetectionBox;

    fn person(x1: f32, y1: f32, x2: f32, y2: f32) -> DetectionBox {
        DetectionBox::new(0, 0.9, (x1, y1, x2, y2))
    }

    #[test]
    fn test_person_on_left_only_is_red_with_one_rect() {
        let left = DetectionResult::new(vec![person(10.0, 10.0, 50.0, 50.0)]);
        let right = DetectionResult::without_boxes();
        let status = PresenceStatus::from_results(&left, &right);
        assert_eq!(status, PresenceStatus::NoHuman);

        let left_overlay = Overlay::build(status, &left);
        assert_eq!(left_overlay.color, Color::RED);
        assert_eq!(left_overlay.text, "NO HUMAN");
        assert_eq!(
            left_overlay.rects,
            vec![OverlayRect { x1: 10, y1: 10, x2: 50, y2: 50 }]
        );

        let right_overlay = Overlay::build(status, &right);
        assert_eq!(right_overlay.color, Color::RED);
        assert!(right_overlay.rects.is_empty());
    }

    #[test]
    fn test_person_on_both_is_green() {
        let left = DetectionResult::new(vec![person(10.0, 10.0, 50.0, 50.0)]);
        let right = DetectionResult::new(vec![person(100.0, 40.0, 180.0, 300.0)]);
        let status = PresenceStatus::from_results(&left, &right);

        for result in [&left, &right] {
            let overlay = Overlay::build(status, result);
            assert_eq!(overlay.color, Color::GREEN);
            assert_eq!(overlay.text, "HUMAN AVAILABLE");
            assert_eq!(overlay.rects.len(), 1);
        }
    }

    #[test]
    fn test_only_person_boxes_are_outlined() {
        let result = DetectionResult::new(vec![
            DetectionBox::new(2, 0.8, (0.0, 0.0, 20.0, 20.0)),
            person(5.5, 6.9, 30.2, 40.7),
            DetectionBox::new(16, 0.7, (50.0, 50.0, 60.0, 60.0)),
        ]);
        let overlay = Overlay::build(PresenceStatus::NoHuman, &result);
        assert_eq!(
            overlay.rects,
            vec![OverlayRect { x1: 5, y1: 6, x2: 30, y2: 40 }]
        );
    }

    #[test]
    fn test_fixed_text_placement() {
        let overlay = Overlay::build(PresenceStatus::NoHuman, &DetectionResult::default());
        assert_eq!(overlay.text_origin, (30, 30));
        assert_eq!(overlay.thickness, 2);
        assert!((overlay.font_scale - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rect_dimensions() {
        let rect = OverlayRect { x1: 10, y1: 20, x2: 50, y2: 80 };
        assert_eq!(rect.width(), 40);
        assert_eq!(rect.height(), 60);
    }
}
