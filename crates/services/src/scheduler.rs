use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::retraining::RetrainingPipeline;

/// Timer that drives scheduled retraining cycles until cancelled.
pub struct RetrainScheduler {
    pipeline: Arc<RetrainingPipeline>,
    period: Duration,
}

impl RetrainScheduler {
    pub fn new(pipeline: Arc<RetrainingPipeline>, period: Duration) -> Self {
        Self { pipeline, period }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        info!(period_secs = self.period.as_secs(), "⏱️  Retraining scheduler started");

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Retraining scheduler stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.pipeline.run().await;
                    info!(
                        outcome = report.outcome.label(),
                        samples_collected = report.samples_collected,
                        "Scheduled retraining cycle finished"
                    );
                }
            }
        }
    }
}
