use super::frame_source::{AcquisitionError, DeviceEnumerator, DeviceInfo, FrameSource};

/// The two opened cameras of the rig.
pub struct CameraPair<'a> {
    pub left: Box<dyn FrameSource + 'a>,
    pub right: Box<dyn FrameSource + 'a>,
}

/// Finds both serials among the enumerated devices and opens them.
///
/// Both serials are resolved before anything is opened, so a missing camera
/// fails without touching either device.
pub fn open_camera_pair<'a>(
    enumerator: &'a dyn DeviceEnumerator,
    left_serial: &str,
    right_serial: &str,
) -> Result<CameraPair<'a>, AcquisitionError> {
    let devices = enumerator.enumerate()?;
    log::info!("Enumerated {} camera(s)", devices.len());

    let left_info = find_device(&devices, left_serial)?;
    let right_info = find_device(&devices, right_serial)?;

    let left = enumerator.open(left_info)?;
    let right = match enumerator.open(right_info) {
        Ok(right) => right,
        Err(e) => {
            close_quietly(left);
            return Err(e);
        }
    };
    log::info!(
        "Opened left camera {} ({}) and right camera {} ({})",
        left_info.serial_number,
        left_info.model_name,
        right_info.serial_number,
        right_info.model_name
    );

    Ok(CameraPair { left, right })
}

fn find_device<'d>(devices: &'d [DeviceInfo], serial: &str) -> Result<&'d DeviceInfo, AcquisitionError> {
    devices
        .iter()
        .find(|d| d.serial_number == serial)
        .ok_or_else(|| AcquisitionError::DeviceNotFound {
            serial: serial.to_string(),
            available: devices.iter().map(|d| d.serial_number.clone()).collect(),
        })
}

fn close_quietly(mut source: Box<dyn FrameSource + '_>) {
    if let Err(e) = source.close() {
        log::warn!("Failed to close camera {}: {e}", source.serial());
    }
}
