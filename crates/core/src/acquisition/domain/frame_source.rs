use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("camera with serial {serial} not found (available: {available:?})")]
    DeviceNotFound {
        serial: String,
        available: Vec<String>,
    },
    #[error("no frame from camera {serial} within {timeout:?}")]
    Timeout { serial: String, timeout: Duration },
    #[error("camera {serial}: {message}")]
    Device { serial: String, message: String },
}

/// Raw sensor pixel layouts the converter understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Mono8,
    /// 10 significant bits in a 16-bit little-endian container.
    Mono10,
    Mono12,
    Mono16,
    Rgb8,
    Bgr8,
    BayerRg8,
    BayerBg8,
    BayerGr8,
    BayerGb8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Mono10 | PixelFormat::Mono12 | PixelFormat::Mono16 => 2,
            PixelFormat::Rgb8 | PixelFormat::Bgr8 => 3,
            _ => 1,
        }
    }

    /// Significant bits per sample.
    pub fn bit_depth(self) -> u32 {
        match self {
            PixelFormat::Mono10 => 10,
            PixelFormat::Mono12 => 12,
            PixelFormat::Mono16 => 16,
            _ => 8,
        }
    }
}

impl FromStr for PixelFormat {
    type Err = String;

    /// Parses GenICam pixel format names, e.g. `BayerRG8` or `RGB8Packed`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Mono8" => Ok(PixelFormat::Mono8),
            "Mono10" => Ok(PixelFormat::Mono10),
            "Mono12" => Ok(PixelFormat::Mono12),
            "Mono16" => Ok(PixelFormat::Mono16),
            "RGB8" | "RGB8Packed" => Ok(PixelFormat::Rgb8),
            "BGR8" | "BGR8Packed" => Ok(PixelFormat::Bgr8),
            "BayerRG8" => Ok(PixelFormat::BayerRg8),
            "BayerBG8" => Ok(PixelFormat::BayerBg8),
            "BayerGR8" => Ok(PixelFormat::BayerGr8),
            "BayerGB8" => Ok(PixelFormat::BayerGb8),
            other => Err(format!("unsupported pixel format '{other}'")),
        }
    }
}

/// One sensor buffer exactly as the device delivered it.
#[derive(Clone, Debug, PartialEq)]
pub struct RawFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
}

#[derive(Debug)]
enum GrabOutcome {
    Succeeded(RawFrame),
    Failed { code: u32, description: String },
}

/// Result of one retrieve call.
///
/// Owns the device-side buffer lease: the release hook runs exactly once,
/// when the result is dropped, on every path out of the iteration.
pub struct GrabResult {
    outcome: GrabOutcome,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl GrabResult {
    pub fn succeeded(raw: RawFrame) -> Self {
        Self {
            outcome: GrabOutcome::Succeeded(raw),
            release: None,
        }
    }

    pub fn failed(code: u32, description: impl Into<String>) -> Self {
        Self {
            outcome: GrabOutcome::Failed {
                code,
                description: description.into(),
            },
            release: None,
        }
    }

    /// Attaches the hook that hands the buffer back to the device.
    pub fn with_release(mut self, release: impl FnOnce() + Send + 'static) -> Self {
        self.release = Some(Box::new(release));
        self
    }

    pub fn raw(&self) -> Option<&RawFrame> {
        match &self.outcome {
            GrabOutcome::Succeeded(raw) => Some(raw),
            GrabOutcome::Failed { .. } => None,
        }
    }

    /// Error code and description of a failed grab.
    pub fn failure(&self) -> Option<(u32, &str)> {
        match &self.outcome {
            GrabOutcome::Succeeded(_) => None,
            GrabOutcome::Failed { code, description } => Some((*code, description)),
        }
    }
}

impl fmt::Debug for GrabResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrabResult")
            .field("outcome", &self.outcome)
            .field("pending_release", &self.release.is_some())
            .finish()
    }
}

impl Drop for GrabResult {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Enumerated device, before it is opened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub serial_number: String,
    pub model_name: String,
}

/// An opened camera that delivers frames on request.
pub trait FrameSource {
    fn serial(&self) -> &str;

    /// Starts continuous acquisition.
    fn start_grabbing(&mut self) -> Result<(), AcquisitionError>;

    /// False once acquisition has stopped, whether requested or not.
    fn is_grabbing(&self) -> bool;

    /// Blocks up to `timeout` for the next frame.
    fn retrieve(&mut self, timeout: Duration) -> Result<GrabResult, AcquisitionError>;

    fn stop_grabbing(&mut self) -> Result<(), AcquisitionError>;

    /// Releases the device. Called once, after `stop_grabbing`.
    fn close(&mut self) -> Result<(), AcquisitionError>;
}

/// Lists the cameras attached to the host and opens them.
pub trait DeviceEnumerator {
    fn enumerate(&self) -> Result<Vec<DeviceInfo>, AcquisitionError>;

    fn open(&self, device: &DeviceInfo) -> Result<Box<dyn FrameSource + '_>, AcquisitionError>;
}
