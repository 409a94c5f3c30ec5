use std::collections::HashMap;
use std::time::Instant;

/// Stage names recorded by the presence loop.
pub const STAGE_RETRIEVE: &str = "retrieve";
pub const STAGE_CONVERT: &str = "convert";
pub const STAGE_DETECT: &str = "detect";
pub const STAGE_RENDER: &str = "render";

/// Observer for per-iteration loop events.
///
/// Keeps the loop itself free of any particular output mechanism; the
/// binary logs through `log`, tests discard everything.
pub trait PipelineLogger {
    /// Called once per processed iteration (both frames delivered).
    fn iteration(&mut self, index: usize);

    /// Record how long a named stage took in one iteration.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. person boxes on one camera).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn iteration(&mut self, _index: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Accumulates stage timings and metrics and logs a throughput summary.
///
/// A heartbeat line is logged every `heartbeat` iterations so long
/// unattended runs show they are alive.
pub struct StdoutPipelineLogger {
    heartbeat: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    iterations: usize,
}

impl StdoutPipelineLogger {
    pub fn new(heartbeat: usize) -> Self {
        Self {
            heartbeat: heartbeat.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            iterations: 0,
        }
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let iterations = self.iterations;
        let mut lines = vec![format!(
            "Presence summary ({iterations} iterations, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.iter().collect();
        stages.sort_by(|a, b| a.0.cmp(b.0));
        for (stage, durations) in stages {
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = mean(durations);
            let max_ms = durations.iter().copied().fold(0.0, f64::max);
            lines.push(format!(
                "  {stage:10}: avg {avg_ms:6.1}ms  max {max_ms:6.1}ms  total {total_ms:7.0}ms"
            ));
        }

        let mut metrics: Vec<_> = self.metrics.iter().collect();
        metrics.sort_by(|a, b| a.0.cmp(b.0));
        for (name, values) in metrics {
            lines.push(format!("  {name}: avg {:.2}", mean(values)));
        }

        if iterations > 0 && elapsed_ms > 0.0 {
            let rate = iterations as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {rate:.1} iterations/s"));
        }

        Some(lines.join("\n"))
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn iteration(&mut self, index: usize) {
        self.iterations += 1;
        if self.iterations % self.heartbeat == 0 {
            log::info!("Processed {} iterations (last: {index})", self.iterations);
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_accepts_everything() {
        let mut logger = NullPipelineLogger;
        logger.iteration(1);
        logger.timing(STAGE_DETECT, 5.0);
        logger.metric("left_person_boxes", 1.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_records_per_stage() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing(STAGE_DETECT, 20.0);
        logger.timing(STAGE_DETECT, 30.0);
        logger.timing(STAGE_RENDER, 5.0);

        assert_eq!(logger.timings[STAGE_DETECT], vec![20.0, 30.0]);
        assert_eq!(logger.timings[STAGE_RENDER], vec![5.0]);
        assert!(!logger.timings.contains_key(STAGE_CONVERT));
    }

    #[test]
    fn test_metric_average_in_summary() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.metric("right_person_boxes", 1.0);
        logger.metric("right_person_boxes", 2.0);

        assert_relative_eq!(mean(&logger.metrics["right_person_boxes"]), 1.5);
        assert!(logger.summary_string().unwrap().contains("avg 1.50"));
    }

    #[test]
    fn test_summary_lists_stages_and_throughput() {
        let mut logger = StdoutPipelineLogger::new(10);
        for i in 0..4 {
            logger.iteration(i);
            logger.timing(STAGE_RETRIEVE, 2.0);
            logger.timing(STAGE_DETECT, 10.0);
        }
        std::thread::sleep(std::time::Duration::from_millis(2));

        let summary = logger.summary_string().unwrap();
        assert!(summary.starts_with("Presence summary (4 iterations"));
        assert!(summary.contains(STAGE_RETRIEVE));
        assert!(summary.contains(STAGE_DETECT));
        assert!(summary.contains("iterations/s"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(StdoutPipelineLogger::default().summary_string().is_none());
    }

    #[test]
    fn test_iterations_counted_and_heartbeat_clamped() {
        let mut logger = StdoutPipelineLogger::new(0);
        assert_eq!(logger.heartbeat, 1);
        for i in 0..25 {
            logger.iteration(i);
        }
        assert_eq!(logger.iterations, 25);
    }

    #[test]
    fn test_mean_of_empty_is_zero() {
        assert_relative_eq!(mean(&[]), 0.0);
    }
}
