//! Dual-camera human presence detection.
//!
//! Each bounded context keeps its capabilities (traits and value types) in
//! `domain` and the library-backed implementations in `infrastructure`.

pub mod acquisition {
    pub mod domain {
        pub mod device_selector;
        pub mod frame_converter;
        pub mod frame_source;
    }
    pub mod infrastructure;
}

pub mod detection {
    pub mod domain {
        pub mod object_detector;
        pub mod presence_classifier;
    }
    pub mod infrastructure;
}

pub mod rendering {
    pub mod domain {
        pub mod overlay;
        pub mod presenter;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod pipeline_logger;
    pub mod presence_app;
}

pub mod shared {
    pub mod constants;
    pub mod detection_box;
    pub mod frame;
    pub mod settings;
}
