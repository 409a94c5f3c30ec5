use crate::shared::detection_box::DetectionResult;
use crate::shared::frame::Frame;

/// Domain interface for object detection.
///
/// Implementations wrap a pretrained model and may hold inference state,
/// hence `&mut self`. Boxes are reported in the frame's own pixel space.
pub trait ObjectDetector {
    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult, Box<dyn std::error::Error>>;
}
