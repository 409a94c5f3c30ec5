/// YOLO object detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, per-anchor class selection
/// and class-aware NMS for COCO-style YOLO11 exports.
use std::path::Path;

use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::detection_box::{DetectionBox, DetectionResult};
use crate::shared::frame::Frame;

use super::execution_provider::preferred_execution_providers;

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f32 = 0.45;

/// Box geometry values (cx, cy, w, h) that precede the class scores.
const BOX_VALUES: usize = 4;

/// YOLO detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    confidence: f32,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path, confidence: f32) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);
        log::debug!(
            "Loaded YOLO model {} (input {input_size}x{input_size})",
            model_path.display()
        );

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

impl ObjectDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult, Box<dyn std::error::Error>> {
        let (input_tensor, geometry) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut boxes = parse_output(data, &shape, self.confidence, &geometry)?;
        boxes = nms(boxes, NMS_IOU_THRESH);
        log::trace!("frame {}: {} box(es) after NMS", frame.index(), boxes.len());
        Ok(DetectionResult::new(boxes))
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Mapping between letterboxed model space and the original frame.
#[derive(Clone, Copy, Debug, PartialEq)]
struct LetterboxGeometry {
    scale: f32,
    pad_x: u32,
    pad_y: u32,
    frame_width: u32,
    frame_height: u32,
}

impl LetterboxGeometry {
    /// Maps a model-space (cx, cy, w, h) box to clamped frame corners.
    fn to_frame(&self, cx: f32, cy: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
        let max_x = self.frame_width as f32;
        let max_y = self.frame_height as f32;
        let unmap_x = |v: f32| ((v - self.pad_x as f32) / self.scale).clamp(0.0, max_x);
        let unmap_y = |v: f32| ((v - self.pad_y as f32) / self.scale).clamp(0.0, max_y);
        (
            unmap_x(cx - w / 2.0),
            unmap_y(cy - h / 2.0),
            unmap_x(cx + w / 2.0),
            unmap_y(cy + h / 2.0),
        )
    }
}

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns the NCHW float32 tensor and the geometry needed to map boxes back.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, LetterboxGeometry) {
    let fw = frame.width() as f32;
    let fh = frame.height() as f32;
    let target = target_size as f32;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padded area uses 114/255 gray, YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.data();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let ch = frame.channels() as usize;

    // Nearest-neighbor resize + copy into padded region
    for y in 0..new_h as usize {
        let src_y = ((y as f32 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f32 / scale) as usize).min(src_w - 1);
            let offset = (src_y * src_w + src_x) * ch;
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[offset + c.min(ch - 1)] as f32 / 255.0;
            }
        }
    }

    let geometry = LetterboxGeometry {
        scale,
        pad_x,
        pad_y,
        frame_width: frame.width(),
        frame_height: frame.height(),
    };
    (tensor, geometry)
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

/// Decodes a `[1, 4 + classes, anchors]` (or transposed) YOLO output.
fn parse_output(
    data: &[f32],
    shape: &[usize],
    confidence: f32,
    geometry: &LetterboxGeometry,
) -> Result<Vec<DetectionBox>, String> {
    if shape.len() != 3 {
        return Err(format!("Unexpected YOLO output shape: {shape:?}"));
    }
    // Anchors outnumber features in every YOLO export, which tells the
    // two layouts apart.
    let transposed = shape[1] < shape[2];
    let (num_anchors, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats <= BOX_VALUES {
        return Err(format!("YOLO output has no class scores: {shape:?}"));
    }
    if data.len() < num_anchors * num_feats {
        return Err(format!(
            "YOLO output holds {} values, shape {shape:?} needs {}",
            data.len(),
            num_anchors * num_feats
        ));
    }

    let value = |anchor: usize, feat: usize| {
        if transposed {
            data[feat * num_anchors + anchor]
        } else {
            data[anchor * num_feats + feat]
        }
    };

    let mut boxes = Vec::new();
    for i in 0..num_anchors {
        let (class_id, score) = (BOX_VALUES..num_feats)
            .map(|f| (f - BOX_VALUES, value(i, f)))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
        if score < confidence {
            continue;
        }
        let xyxy = geometry.to_frame(value(i, 0), value(i, 1), value(i, 2), value(i, 3));
        boxes.push(DetectionBox::new(class_id as u32, score, xyxy));
    }
    Ok(boxes)
}

/// Greedy class-aware NMS: sort by confidence descending, suppress
/// overlapping boxes of the same class.
fn nms(mut boxes: Vec<DetectionBox>, iou_thresh: f32) -> Vec<DetectionBox> {
    boxes.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<DetectionBox> = Vec::new();
    for candidate in boxes {
        let suppressed = keep
            .iter()
            .any(|k| k.class_id == candidate.class_id && k.iou(&candidate) > iou_thresh);
        if !suppressed {
            keep.push(candidate);
        }
    }
    keep
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
