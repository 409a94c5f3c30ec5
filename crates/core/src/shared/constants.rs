pub const LEFT_CAMERA_SERIAL: &str = "40312157";
pub const RIGHT_CAMERA_SERIAL: &str = "40312158";

pub const LEFT_WINDOW_NAME: &str = "Left";
pub const RIGHT_WINDOW_NAME: &str = "Right";

/// How long a single retrieve may block before reporting a timeout.
pub const RETRIEVE_TIMEOUT_MS: u32 = 5000;

/// Consecutive acquisition timeouts tolerated before the loop gives up.
pub const MAX_CONSECUTIVE_TIMEOUTS: u32 = 3;

pub const DISPLAY_WIDTH: u32 = 960;
pub const DISPLAY_HEIGHT: u32 = 600;

/// Key poll delay per iteration.
pub const KEY_POLL_DELAY_MS: i32 = 1;

pub const ESC_KEY: i32 = 27;

pub const YOLO_MODEL_NAME: &str = "yolo11n.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://huggingface.co/Ultralytics/YOLO11/resolve/main/yolo11n.onnx";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
