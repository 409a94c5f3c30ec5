pub mod device_cache;
pub mod image_directory_source;
pub mod pixel_format_converter;
#[cfg(feature = "pylon")]
pub mod pylon_camera;
