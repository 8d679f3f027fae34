pub mod api_sports;
pub mod backfill;
pub mod drift;
pub mod metrics;
pub mod predictor;
pub mod retraining;
pub mod scheduler;
pub mod stats;

pub use backfill::*;
pub use drift::*;
pub use metrics::*;
pub use predictor::*;
pub use retraining::*;
pub use scheduler::*;
pub use stats::*;
