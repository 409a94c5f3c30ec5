use thiserror::Error;

use crate::shared::frame::Frame;

use super::frame_source::{PixelFormat, RawFrame};

#[derive(Error, Debug, PartialEq)]
pub enum ConvertError {
    #[error("frame has zero size ({width}x{height})")]
    Empty { width: u32, height: u32 },
    #[error("{format:?} frame of {width}x{height} needs {expected} bytes, got {actual}")]
    BufferSize {
        format: PixelFormat,
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Converts a raw sensor buffer into a packed RGB8 [`Frame`].
pub trait FrameConverter {
    fn convert(&self, raw: &RawFrame, index: usize) -> Result<Frame, ConvertError>;
}
