//! Basler cameras through the pylon SDK (`pylon-cxx`).
use std::time::Duration;

use pylon_cxx::{
    DeviceInfo as PylonDeviceInfo, GrabOptions, GrabResult as PylonGrabResult, HasProperties,
    InstantCamera, Pylon, TimeoutHandling, TlFactory,
};

use crate::acquisition::domain::frame_source::{
    AcquisitionError, DeviceEnumerator, DeviceInfo, FrameSource, GrabResult, PixelFormat,
    RawFrame,
};
use crate::acquisition::infrastructure::device_cache::DeviceCache;

/// Enumerates and opens cameras on all pylon transport layers.
///
/// Borrows the pylon runtime, which must outlive every opened camera.
/// Device handles found by `enumerate` are kept for `open`, so opening a
/// camera after selection does not walk the transport layers again.
pub struct PylonEnumerator<'a> {
    pylon: &'a Pylon,
    devices: DeviceCache<PylonDeviceInfo>,
}

impl<'a> PylonEnumerator<'a> {
    pub fn new(pylon: &'a Pylon) -> Self {
        Self {
            pylon,
            devices: DeviceCache::default(),
        }
    }

    fn enumerate_handles(&self) -> Result<Vec<(DeviceInfo, PylonDeviceInfo)>, AcquisitionError> {
        let devices = TlFactory::instance(self.pylon)
            .enumerate_devices()
            .map_err(|e| sdk_error("<enumerate>", e))?;

        let mut handles = Vec::with_capacity(devices.len());
        for device in devices {
            let serial_number = device
                .property_value("SerialNumber")
                .map_err(|e| sdk_error("<enumerate>", e))?;
            let model_name = device.property_value("ModelName").unwrap_or_default();
            let info = DeviceInfo {
                serial_number,
                model_name,
            };
            handles.push((info, device));
        }
        Ok(handles)
    }
}

fn keyed(handles: Vec<(DeviceInfo, PylonDeviceInfo)>) -> Vec<(String, PylonDeviceInfo)> {
    handles
        .into_iter()
        .map(|(info, device)| (info.serial_number, device))
        .collect()
}

impl DeviceEnumerator for PylonEnumerator<'_> {
    fn enumerate(&self) -> Result<Vec<DeviceInfo>, AcquisitionError> {
        let handles = self.enumerate_handles()?;
        let infos = handles.iter().map(|(info, _)| info.clone()).collect();
        self.devices.fill(keyed(handles));
        Ok(infos)
    }

    fn open(&self, device: &DeviceInfo) -> Result<Box<dyn FrameSource + '_>, AcquisitionError> {
        let serial = device.serial_number.clone();
        let pylon_device = self
            .devices
            .take_or_refresh(&serial, || self.enumerate_handles().map(keyed))?
            .ok_or_else(|| AcquisitionError::DeviceNotFound {
                serial: serial.clone(),
                available: Vec::new(),
            })?;

        let tl_factory = TlFactory::instance(self.pylon);
        let camera = tl_factory
            .create_device(&pylon_device)
            .map_err(|e| sdk_error(&serial, e))?;
        camera.open().map_err(|e| sdk_error(&serial, e))?;

        let format_name = read_pixel_format(&camera).map_err(|e| sdk_error(&serial, e))?;
        let pixel_format = format_name
            .parse::<PixelFormat>()
            .map_err(|message| AcquisitionError::Device {
                serial: serial.clone(),
                message,
            })?;
        log::info!("Camera {serial} opened, pixel format {format_name}");

        let grab_result = PylonGrabResult::new().map_err(|e| sdk_error(&serial, e))?;
        Ok(Box::new(PylonCamera {
            serial,
            camera,
            grab_result,
            pixel_format,
        }))
    }
}

/// One opened Basler camera.
///
/// Each retrieved buffer is copied out of the reusable pylon grab result,
/// so the SDK buffer goes back to the driver before `retrieve` returns.
pub struct PylonCamera<'a> {
    serial: String,
    camera: InstantCamera<'a>,
    grab_result: PylonGrabResult,
    pixel_format: PixelFormat,
}

impl PylonCamera<'_> {
    fn copy_out(&self) -> Result<GrabResult, pylon_cxx::PylonError> {
        if !self.grab_result.grab_succeeded()? {
            return Ok(GrabResult::failed(
                self.grab_result.error_code()?,
                self.grab_result.error_description()?,
            ));
        }
        Ok(GrabResult::succeeded(RawFrame {
            data: self.grab_result.buffer()?.to_vec(),
            width: self.grab_result.width()?,
            height: self.grab_result.height()?,
            pixel_format: self.pixel_format,
        }))
    }
}

impl FrameSource for PylonCamera<'_> {
    fn serial(&self) -> &str {
        &self.serial
    }

    fn start_grabbing(&mut self) -> Result<(), AcquisitionError> {
        self.camera
            .start_grabbing(&GrabOptions::default())
            .map_err(|e| sdk_error(&self.serial, e))
    }

    fn is_grabbing(&self) -> bool {
        self.camera.is_grabbing()
    }

    fn retrieve(&mut self, timeout: Duration) -> Result<GrabResult, AcquisitionError> {
        let timeout_ms = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        let delivered = self
            .camera
            .retrieve_result(timeout_ms, &mut self.grab_result, TimeoutHandling::Return)
            .map_err(|e| sdk_error(&self.serial, e))?;
        if !delivered {
            return Err(AcquisitionError::Timeout {
                serial: self.serial.clone(),
                timeout,
            });
        }
        self.copy_out().map_err(|e| sdk_error(&self.serial, e))
    }

    fn stop_grabbing(&mut self) -> Result<(), AcquisitionError> {
        self.camera
            .stop_grabbing()
            .map_err(|e| sdk_error(&self.serial, e))
    }

    fn close(&mut self) -> Result<(), AcquisitionError> {
        self.camera.close().map_err(|e| sdk_error(&self.serial, e))
    }
}

fn read_pixel_format(camera: &InstantCamera<'_>) -> Result<String, pylon_cxx::PylonError> {
    let node_map = camera.node_map()?;
    let node = node_map.enum_node("PixelFormat")?;
    node.value()
}

fn sdk_error(serial: &str, e: pylon_cxx::PylonError) -> AcquisitionError {
    AcquisitionError::Device {
        serial: serial.to_string(),
        message: e.to_string(),
    }
}
