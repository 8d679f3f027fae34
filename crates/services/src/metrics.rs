use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

use courtside_models::{CourtsideError, Result};

fn metrics_error(e: prometheus::Error) -> CourtsideError {
    CourtsideError::Metrics(e.to_string())
}

/// Prometheus collectors shared by the prediction and retraining services.
pub struct ServiceMetrics {
    registry: Registry,
    pub predictions_total: IntCounter,
    pub prediction_failures: IntCounterVec,
    pub prediction_latency: Histogram,
    pub predictions_settled: IntCounter,
    pub retrain_cycles: IntCounterVec,
    pub model_loaded: IntGauge,
}

impl ServiceMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new_custom(Some("courtside".to_string()), None).map_err(metrics_error)?;

        let predictions_total = IntCounter::new("predictions_total", "Predictions served")
            .map_err(metrics_error)?;
        let prediction_failures = IntCounterVec::new(
            Opts::new("prediction_failures_total", "Failed prediction requests by reason"),
            &["reason"],
        )
        .map_err(metrics_error)?;
        let prediction_latency = Histogram::with_opts(
            HistogramOpts::new("prediction_latency_seconds", "End-to-end prediction latency")
                .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        )
        .map_err(metrics_error)?;
        let predictions_settled = IntCounter::new(
            "predictions_settled_total",
            "Pending predictions completed by game results",
        )
        .map_err(metrics_error)?;
        let retrain_cycles = IntCounterVec::new(
            Opts::new("retrain_cycles_total", "Retraining cycles by outcome"),
            &["outcome"],
        )
        .map_err(metrics_error)?;
        let model_loaded = IntGauge::new("model_loaded", "1 when a model artifact is active")
            .map_err(metrics_error)?;

        registry.register(Box::new(predictions_total.clone())).map_err(metrics_error)?;
        registry.register(Box::new(prediction_failures.clone())).map_err(metrics_error)?;
        registry.register(Box::new(prediction_latency.clone())).map_err(metrics_error)?;
        registry.register(Box::new(predictions_settled.clone())).map_err(metrics_error)?;
        registry.register(Box::new(retrain_cycles.clone())).map_err(metrics_error)?;
        registry.register(Box::new(model_loaded.clone())).map_err(metrics_error)?;

        Ok(Self {
            registry,
            predictions_total,
            prediction_failures,
            prediction_latency,
            predictions_settled,
            retrain_cycles,
            model_loaded,
        })
    }

    pub fn record_failure(&self, err: &CourtsideError) {
        self.prediction_failures.with_label_values(&[err.kind()]).inc();
    }

    pub fn record_cycle(&self, outcome: &str) {
        self.retrain_cycles.with_label_values(&[outcome]).inc();
    }

    pub fn set_model_loaded(&self, loaded: bool) {
        self.model_loaded.set(i64::from(loaded));
    }

    /// Text exposition format for `/metrics`.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        String::from_utf8(buffer).map_err(|e| CourtsideError::Metrics(e.to_string()))
    }
}
