use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::acquisition::domain::frame_source::{
    AcquisitionError, DeviceEnumerator, DeviceInfo, FrameSource, GrabResult, PixelFormat,
    RawFrame,
};
use crate::shared::constants::IMAGE_EXTENSIONS;

/// Grab failure code reported for images that fail to decode.
pub const DECODE_FAILURE_CODE: u32 = 1;

/// Presents image directories as cameras.
///
/// Each directory is one "device" whose serial number is the directory
/// name, so the usual serial-based selection applies to recorded footage.
pub struct ImageDirectoryEnumerator {
    dirs: Vec<PathBuf>,
}

impl ImageDirectoryEnumerator {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Serial number a directory is enumerated under: its final path component.
    pub fn serial_of(dir: &Path) -> String {
        dir.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string())
    }
}

impl DeviceEnumerator for ImageDirectoryEnumerator {
    fn enumerate(&self) -> Result<Vec<DeviceInfo>, AcquisitionError> {
        Ok(self
            .dirs
            .iter()
            .filter(|d| d.is_dir())
            .map(|d| DeviceInfo {
                serial_number: Self::serial_of(d),
                model_name: "image directory".into(),
            })
            .collect())
    }

    fn open(&self, device: &DeviceInfo) -> Result<Box<dyn FrameSource + '_>, AcquisitionError> {
        let dir = self
            .dirs
            .iter()
            .find(|d| Self::serial_of(d) == device.serial_number)
            .ok_or_else(|| AcquisitionError::DeviceNotFound {
                serial: device.serial_number.clone(),
                available: self.dirs.iter().map(|d| Self::serial_of(d)).collect(),
            })?;
        Ok(Box::new(ImageDirectorySource::open(
            dir,
            device.serial_number.clone(),
        )?))
    }
}

/// Replays the images of one directory, in file-name order, as a camera.
///
/// Acquisition stops on its own once the last image has been delivered.
pub struct ImageDirectorySource {
    serial: String,
    files: Vec<PathBuf>,
    next: usize,
    grabbing: bool,
}

impl ImageDirectorySource {
    pub fn open(dir: &Path, serial: String) -> Result<Self, AcquisitionError> {
        let entries = fs::read_dir(dir).map_err(|e| AcquisitionError::Device {
            serial: serial.clone(),
            message: format!("cannot read {}: {e}", dir.display()),
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| is_image(p))
            .collect();
        files.sort();

        log::info!(
            "Replay camera {serial}: {} image(s) in {}",
            files.len(),
            dir.display()
        );
        Ok(Self {
            serial,
            files,
            next: 0,
            grabbing: false,
        })
    }

    pub fn remaining(&self) -> usize {
        self.files.len().saturating_sub(self.next)
    }
}

impl FrameSource for ImageDirectorySource {
    fn serial(&self) -> &str {
        &self.serial
    }

    fn start_grabbing(&mut self) -> Result<(), AcquisitionError> {
        self.grabbing = self.remaining() > 0;
        Ok(())
    }

    fn is_grabbing(&self) -> bool {
        self.grabbing
    }

    fn retrieve(&mut self, _timeout: Duration) -> Result<GrabResult, AcquisitionError> {
        if !self.grabbing {
            return Err(AcquisitionError::Device {
                serial: self.serial.clone(),
                message: "retrieve called while not grabbing".into(),
            });
        }
        let path = self.files[self.next].clone();
        self.next += 1;
        if self.remaining() == 0 {
            self.grabbing = false;
        }

        match image::open(&path) {
            Ok(img) => {
                let rgb = img.to_rgb8();
                Ok(GrabResult::succeeded(RawFrame {
                    width: rgb.width(),
                    height: rgb.height(),
                    data: rgb.into_raw(),
                    pixel_format: PixelFormat::Rgb8,
                }))
            }
            Err(e) => Ok(GrabResult::failed(
                DECODE_FAILURE_CODE,
                format!("{}: {e}", path.display()),
            )),
        }
    }

    fn stop_grabbing(&mut self) -> Result<(), AcquisitionError> {
        self.grabbing = false;
        Ok(())
    }

    fn close(&mut self) -> Result<(), AcquisitionError> {
        self.files.clear();
        self.next = 0;
        Ok(())
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
