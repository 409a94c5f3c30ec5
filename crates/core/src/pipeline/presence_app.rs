use std::time::{Duration, Instant};

use thiserror::Error;

use crate::acquisition::domain::device_selector::CameraPair;
use crate::acquisition::domain::frame_converter::{ConvertError, FrameConverter};
use crate::acquisition::domain::frame_source::{AcquisitionError, FrameSource, GrabResult, RawFrame};
use crate::detection::domain::object_detector::ObjectDetector;
use crate::detection::domain::presence_classifier::PresenceStatus;
use crate::pipeline::pipeline_logger::{
    PipelineLogger, STAGE_CONVERT, STAGE_DETECT, STAGE_RENDER, STAGE_RETRIEVE,
};
use crate::rendering::domain::overlay::Overlay;
use crate::rendering::domain::presenter::Presenter;
use crate::shared::constants::{
    ESC_KEY, KEY_POLL_DELAY_MS, LEFT_WINDOW_NAME, MAX_CONSECUTIVE_TIMEOUTS, RETRIEVE_TIMEOUT_MS,
    RIGHT_WINDOW_NAME,
};
use crate::shared::detection_box::DetectionResult;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
    #[error("frame conversion failed: {0}")]
    Convert(#[from] ConvertError),
    #[error("detection failed on camera {camera}: {source}")]
    Detect {
        camera: String,
        #[source]
        source: Box<dyn std::error::Error>,
    },
    #[error("display failed: {source}")]
    Display {
        #[source]
        source: Box<dyn std::error::Error>,
    },
    #[error("camera {serial} timed out {count} times in a row (limit {limit})")]
    TimeoutLimit {
        serial: String,
        count: u32,
        limit: u32,
    },
}

impl PipelineError {
    fn display(source: Box<dyn std::error::Error>) -> Self {
        PipelineError::Display { source }
    }
}

/// Loop tuning knobs.
#[derive(Clone, Debug, PartialEq)]
pub struct LoopConfig {
    /// Per-camera wait for the next frame.
    pub timeout: Duration,
    /// Consecutive timeouts tolerated before the run fails. 0 makes the
    /// first timeout fatal.
    pub max_consecutive_timeouts: u32,
    pub key_delay_ms: i32,
    /// Stop after this many processed iterations.
    pub max_iterations: Option<usize>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(RETRIEVE_TIMEOUT_MS as u64),
            max_consecutive_timeouts: MAX_CONSECUTIVE_TIMEOUTS,
            key_delay_ms: KEY_POLL_DELAY_MS,
            max_iterations: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    ExitKey,
    CameraStopped,
    IterationLimit,
}

/// Outcome of a completed run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Loop iterations entered, processed or not.
    pub iterations: usize,
    /// Iterations where both frames were delivered and displayed.
    pub processed: usize,
    /// Iterations dropped because of a grab failure or a tolerated timeout.
    pub skipped: usize,
    pub stop_reason: StopReason,
}

/// Application context for the dual-camera presence loop.
///
/// Owns both cameras, the converter, the detector and the presenter for
/// the lifetime of the run. Cameras are stopped and closed and windows torn
/// down exactly once, whichever way the run ends, including on drop.
pub struct PresenceApp<'a> {
    left: Box<dyn FrameSource + 'a>,
    right: Box<dyn FrameSource + 'a>,
    converter: Box<dyn FrameConverter + 'a>,
    detector: Box<dyn ObjectDetector + 'a>,
    presenter: Box<dyn Presenter + 'a>,
    logger: Box<dyn PipelineLogger + 'a>,
    config: LoopConfig,
    shut_down: bool,
}

impl<'a> PresenceApp<'a> {
    pub fn new(
        cameras: CameraPair<'a>,
        converter: Box<dyn FrameConverter + 'a>,
        detector: Box<dyn ObjectDetector + 'a>,
        presenter: Box<dyn Presenter + 'a>,
        logger: Box<dyn PipelineLogger + 'a>,
        config: LoopConfig,
    ) -> Self {
        Self {
            left: cameras.left,
            right: cameras.right,
            converter,
            detector,
            presenter,
            logger,
            config,
            shut_down: false,
        }
    }

    /// Runs until ESC, a camera stops, the iteration cap, or a fatal error,
    /// then shuts down. A loop error takes precedence over a shutdown error.
    pub fn run(&mut self) -> Result<RunSummary, PipelineError> {
        let result = self.run_loop();
        let shutdown = self.shutdown();
        let summary = result?;
        shutdown?;
        log::info!(
            "Stopped ({:?}) after {} iterations: {} processed, {} skipped",
            summary.stop_reason,
            summary.iterations,
            summary.processed,
            summary.skipped
        );
        Ok(summary)
    }

    /// Stops acquisition, closes both cameras and destroys the windows.
    ///
    /// Idempotent: only the first call does anything. Every step is
    /// attempted even if an earlier one fails; the first error is returned.
    pub fn shutdown(&mut self) -> Result<(), PipelineError> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;

        let mut first_error: Option<PipelineError> = None;
        let mut keep = |result: Result<(), PipelineError>| {
            if let Err(e) = result {
                log::warn!("Shutdown step failed: {e}");
                first_error.get_or_insert(e);
            }
        };

        keep(self.left.stop_grabbing().map_err(PipelineError::from));
        keep(self.right.stop_grabbing().map_err(PipelineError::from));
        keep(self.left.close().map_err(PipelineError::from));
        keep(self.right.close().map_err(PipelineError::from));
        keep(self.presenter.destroy_all().map_err(PipelineError::display));
        self.logger.summary();

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn run_loop(&mut self) -> Result<RunSummary, PipelineError> {
        self.left.start_grabbing()?;
        self.right.start_grabbing()?;
        self.logger.info(&format!(
            "Grabbing from {} (left) and {} (right)",
            self.left.serial(),
            self.right.serial()
        ));

        let mut iterations = 0;
        let mut processed = 0;
        let mut skipped = 0;
        let mut consecutive_timeouts = 0;
        let mut stop_reason = StopReason::CameraStopped;

        while self.left.is_grabbing() && self.right.is_grabbing() {
            if self.config.max_iterations.is_some_and(|max| processed >= max) {
                stop_reason = StopReason::IterationLimit;
                break;
            }
            let index = iterations;
            iterations += 1;

            let started = Instant::now();
            let (left_grab, right_grab) = match self.retrieve_pair() {
                Ok(pair) => {
                    consecutive_timeouts = 0;
                    pair
                }
                Err(AcquisitionError::Timeout { serial, timeout }) => {
                    consecutive_timeouts += 1;
                    if consecutive_timeouts > self.config.max_consecutive_timeouts {
                        return Err(PipelineError::TimeoutLimit {
                            serial,
                            count: consecutive_timeouts,
                            limit: self.config.max_consecutive_timeouts,
                        });
                    }
                    log::warn!(
                        "Camera {serial}: no frame within {timeout:?} ({consecutive_timeouts}/{})",
                        self.config.max_consecutive_timeouts
                    );
                    skipped += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            self.logger.timing(STAGE_RETRIEVE, elapsed_ms(started));

            let (Some(left_raw), Some(right_raw)) = (left_grab.raw(), right_grab.raw()) else {
                warn_failed_grab(self.left.serial(), &left_grab);
                warn_failed_grab(self.right.serial(), &right_grab);
                skipped += 1;
                continue;
            };

            let status = self.process(index, left_raw, right_raw)?;
            drop(left_grab);
            drop(right_grab);
            processed += 1;
            self.logger.iteration(index);
            log::debug!("Iteration {index}: {status}");

            let key = self
                .presenter
                .poll_key(self.config.key_delay_ms)
                .map_err(PipelineError::display)?;
            if key == Some(ESC_KEY) {
                log::info!("Exit key pressed");
                stop_reason = StopReason::ExitKey;
                break;
            }
        }

        Ok(RunSummary {
            iterations,
            processed,
            skipped,
            stop_reason,
        })
    }

    /// Left first, then right. A right-side error drops (and so releases)
    /// the left result before returning.
    fn retrieve_pair(&mut self) -> Result<(GrabResult, GrabResult), AcquisitionError> {
        let left = self.left.retrieve(self.config.timeout)?;
        let right = self.right.retrieve(self.config.timeout)?;
        Ok((left, right))
    }

    fn process(
        &mut self,
        index: usize,
        left_raw: &RawFrame,
        right_raw: &RawFrame,
    ) -> Result<PresenceStatus, PipelineError> {
        let started = Instant::now();
        let left_frame = self.converter.convert(left_raw, index)?;
        let right_frame = self.converter.convert(right_raw, index)?;
        self.logger.timing(STAGE_CONVERT, elapsed_ms(started));

        let started = Instant::now();
        let left_result = detect_on(self.detector.as_mut(), self.left.as_ref(), &left_frame)?;
        let right_result = detect_on(self.detector.as_mut(), self.right.as_ref(), &right_frame)?;
        self.logger.timing(STAGE_DETECT, elapsed_ms(started));

        let left_people = left_result.person_boxes().count();
        let right_people = right_result.person_boxes().count();
        self.logger.metric("left_person_boxes", left_people as f64);
        self.logger.metric("right_person_boxes", right_people as f64);

        let status = PresenceStatus::from_results(&left_result, &right_result);

        let started = Instant::now();
        let left_overlay = Overlay::build(status, &left_result);
        let right_overlay = Overlay::build(status, &right_result);
        self.presenter
            .show(LEFT_WINDOW_NAME, &left_frame, &left_overlay)
            .map_err(PipelineError::display)?;
        self.presenter
            .show(RIGHT_WINDOW_NAME, &right_frame, &right_overlay)
            .map_err(PipelineError::display)?;
        self.logger.timing(STAGE_RENDER, elapsed_ms(started));

        Ok(status)
    }
}

impl Drop for PresenceApp<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!("Shutdown on drop failed: {e}");
        }
    }
}

fn detect_on(
    detector: &mut dyn ObjectDetector,
    camera: &dyn FrameSource,
    frame: &Frame,
) -> Result<DetectionResult, PipelineError> {
    detector.detect(frame).map_err(|source| PipelineError::Detect {
        camera: camera.serial().to_string(),
        source,
    })
}

fn warn_failed_grab(serial: &str, grab: &GrabResult) {
    if let Some((code, description)) = grab.failure() {
        log::warn!("Camera {serial}: grab failed with code {code:#x}: {description}");
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
