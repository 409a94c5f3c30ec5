#[cfg(feature = "highgui")]
pub mod highgui_presenter;
pub mod log_presenter;
pub mod snapshot_presenter;
