use std::time::Instant;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusRecorder};

pub fn describe() {
    describe_counter!(
        "scorer_transactions_loaded_total",
        "Number of transactions read from the input file."
    );
    describe_gauge!("scorer_wallets_scored", "Wallets with a credit score this run.");
    describe_gauge!(
        "scorer_low_cohort_wallets",
        "Wallets below the low-score threshold."
    );
    describe_gauge!(
        "scorer_high_cohort_wallets",
        "Wallets at or above the high-score threshold."
    );
    describe_histogram!(
        "scorer_stage_duration_ms",
        "Wall time of each pipeline stage in milliseconds (label: stage)."
    );
}

/// Recorder for a single batch run. Installed with `metrics::with_local_recorder`
/// and rendered through its handle into the run's outputs; no listener is started.
pub fn build_recorder() -> PrometheusRecorder {
    PrometheusBuilder::new().build_recorder()
}

/// Run `f`, recording its wall time under `scorer_stage_duration_ms{stage}`.
pub fn timed<T>(stage: &'static str, f: impl FnOnce() -> T) -> T {
    let started = Instant::now();
    let out = f();
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    metrics::histogram!("scorer_stage_duration_ms", "stage" => stage).record(elapsed_ms);
    tracing::debug!(stage, elapsed_ms, "stage finished");
    out
}
