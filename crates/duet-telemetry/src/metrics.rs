//! Pipeline metric names and recording helpers

use std::time::Instant;

use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};

pub const JOB_DURATION: &str = "dialogue.job.duration";
pub const LINE_COUNT: &str = "dialogue.line.count";
pub const JOB_FAILURES: &str = "dialogue.job.failures";

/// Instruments recorded by the dialogue pipeline
///
/// Built from the global meter provider, so recording is a no-op until
/// an exporter has been installed by [`crate::init`].
#[derive(Clone)]
pub struct PipelineMetrics {
    job_duration: Histogram<f64>,
    lines: Counter<u64>,
    failures: Counter<u64>,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        let meter = global::meter("duet");

        Self {
            job_duration: meter
                .f64_histogram(JOB_DURATION)
                .with_unit("s")
                .with_description("Wall time of a dialogue job")
                .build(),
            lines: meter
                .u64_counter(LINE_COUNT)
                .with_description("Dialogue lines synthesized and staged")
                .build(),
            failures: meter
                .u64_counter(JOB_FAILURES)
                .with_description("Jobs that ended in a failed stage")
                .build(),
        }
    }

    /// Record how long a job took and how it ended
    pub fn record_job(&self, kind: &'static str, outcome: &'static str, start: Instant) {
        self.job_duration.record(
            start.elapsed().as_secs_f64(),
            &[KeyValue::new("kind", kind), KeyValue::new("outcome", outcome)],
        );
    }

    /// Count one staged line
    pub fn record_line(&self) {
        self.lines.add(1, &[]);
    }

    /// Count a job failure in the given stage
    pub fn record_failure(&self, stage: &'static str) {
        self.failures.add(1, &[KeyValue::new("stage", stage)]);
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}
