//! Retraining lifecycle.
//!
//! One cycle runs `Collecting → Training → Evaluating → Publishing | Discarding`
//! and then returns to `Idle`. A cycle never propagates an error: failures end
//! it as `Aborted`, are logged, and leave the active model untouched.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDateTime, SubsecRound, Utc};
use courtside_db::{GameRepository, ModelVersionRepository, TrainingDataRepository};
use courtside_ml::{ArtifactMetadata, FeatureBuilder, ModelRegistry, ModelTrainer, TrainedCandidate, TrainerConfig};
use courtside_models::{
    CourtsideError, DriftAssessment, FeatureSchema, GameRecord, ModelVersionRecord, Result, Side,
    TrainingSample, VERSION_ACTIVE,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::drift::{DriftConfig, DriftMonitor};
use crate::metrics::ServiceMetrics;
use crate::predictor::PredictionService;

const VERSION_FORMAT: &str = "v%Y%m%d_%H%M%S_%3f";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrainingConfig {
    pub collection_window_days: i64,
    pub calendar_floor_days: i64,
    pub min_roc_auc: f64,
    pub drift: DriftConfig,
    pub trainer: TrainerConfig,
}

impl Default for RetrainingConfig {
    fn default() -> Self {
        Self {
            collection_window_days: 7,
            calendar_floor_days: 30,
            min_roc_auc: 0.5,
            drift: DriftConfig::default(),
            trainer: TrainerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Idle,
    Collecting,
    Training,
    Evaluating,
    Publishing,
    Discarding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrainTrigger {
    Drift,
    CalendarFloor,
    Forced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum CycleOutcome {
    Published {
        version: String,
        trigger: RetrainTrigger,
        accuracy: f64,
        roc_auc: f64,
    },
    Discarded {
        reason: String,
    },
    Aborted {
        stage: PipelineStage,
        error: String,
    },
}

impl CycleOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::Published { .. } => "published",
            CycleOutcome::Discarded { .. } => "discarded",
            CycleOutcome::Aborted { .. } => "aborted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub samples_collected: u64,
    pub drift: Option<DriftAssessment>,
    pub outcome: CycleOutcome,
}

/// Mints monotonic version ids from training timestamps.
#[derive(Debug, Default)]
pub struct VersionMinter {
    last: Mutex<Option<NaiveDateTime>>,
}

fn parse_version(version: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(version, VERSION_FORMAT).ok()
}

impl VersionMinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strictly greater than every id minted so far and than `floor`, when
    /// `floor` uses the same format.
    pub fn mint(&self, at: DateTime<Utc>, floor: Option<&str>) -> String {
        let mut last = self.last.lock();
        let step = Duration::milliseconds(1);

        let mut next = at.naive_utc().trunc_subsecs(3);
        for bound in [*last, floor.and_then(parse_version)].into_iter().flatten() {
            next = next.max(bound + step);
        }

        *last = Some(next);
        next.format(VERSION_FORMAT).to_string()
    }
}

enum Evaluation {
    Publish(RetrainTrigger),
    Discard(String),
}

pub struct RetrainingPipeline {
    games: Arc<dyn GameRepository>,
    training_data: Arc<dyn TrainingDataRepository>,
    versions: Arc<dyn ModelVersionRepository>,
    predictor: Arc<PredictionService>,
    drift: DriftMonitor,
    registry: Arc<ModelRegistry>,
    trainer: Arc<dyn ModelTrainer>,
    metrics: Arc<ServiceMetrics>,
    builder: FeatureBuilder,
    schema: FeatureSchema,
    config: RetrainingConfig,
    minter: VersionMinter,
    stage: RwLock<PipelineStage>,
    run_guard: tokio::sync::Mutex<()>,
}

impl RetrainingPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        games: Arc<dyn GameRepository>,
        training_data: Arc<dyn TrainingDataRepository>,
        versions: Arc<dyn ModelVersionRepository>,
        predictor: Arc<PredictionService>,
        drift: DriftMonitor,
        trainer: Arc<dyn ModelTrainer>,
        metrics: Arc<ServiceMetrics>,
        schema: FeatureSchema,
        config: RetrainingConfig,
    ) -> Self {
        let registry = Arc::clone(predictor.registry());
        Self {
            games,
            training_data,
            versions,
            predictor,
            drift,
            registry,
            trainer,
            metrics,
            builder: FeatureBuilder::new(),
            schema,
            config,
            minter: VersionMinter::new(),
            stage: RwLock::new(PipelineStage::Idle),
            run_guard: tokio::sync::Mutex::new(()),
        }
    }

    pub fn stage(&self) -> PipelineStage {
        *self.stage.read()
    }

    fn enter(&self, stage: PipelineStage) {
        *self.stage.write() = stage;
    }

    /// Scheduled cycle: publishes only on drift or the calendar floor.
    pub async fn run(&self) -> CycleReport {
        self.run_at(Utc::now(), false).await
    }

    /// Publishes an acceptable candidate regardless of drift.
    pub async fn run_forced(&self) -> CycleReport {
        self.run_at(Utc::now(), true).await
    }

    pub async fn run_at(&self, now: DateTime<Utc>, force: bool) -> CycleReport {
        let _running = self.run_guard.lock().await;
        let started_at = Utc::now();
        let mut samples_collected = 0;
        let mut drift = None;

        let outcome = match self
            .cycle(now, force, &mut samples_collected, &mut drift)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                let stage = self.stage();
                error!(stage = ?stage, error = %e, "Retraining cycle aborted");
                CycleOutcome::Aborted {
                    stage,
                    error: e.to_string(),
                }
            }
        };
        self.enter(PipelineStage::Idle);
        self.metrics.record_cycle(outcome.label());

        CycleReport {
            started_at,
            finished_at: Utc::now(),
            samples_collected,
            drift,
            outcome,
        }
    }

    async fn cycle(
        &self,
        now: DateTime<Utc>,
        force: bool,
        samples_collected: &mut u64,
        drift: &mut Option<DriftAssessment>,
    ) -> Result<CycleOutcome> {
        self.enter(PipelineStage::Collecting);
        *samples_collected = self.collect(now).await?;

        self.enter(PipelineStage::Training);
        let candidate = self.train().await?;

        self.enter(PipelineStage::Evaluating);
        let evaluation = self.evaluate(now, force, &candidate, drift).await?;

        match evaluation {
            Evaluation::Publish(trigger) => {
                self.enter(PipelineStage::Publishing);
                let version = self.publish(now, &candidate).await?;
                info!(
                    version = %version,
                    trigger = ?trigger,
                    accuracy = candidate.report.accuracy,
                    roc_auc = candidate.report.roc_auc,
                    "Published retrained model"
                );
                Ok(CycleOutcome::Published {
                    version,
                    trigger,
                    accuracy: candidate.report.accuracy,
                    roc_auc: candidate.report.roc_auc,
                })
            }
            Evaluation::Discard(reason) => {
                self.enter(PipelineStage::Discarding);
                info!(reason = %reason, "Discarded retraining candidate");
                Ok(CycleOutcome::Discarded { reason })
            }
        }
    }

    /// Labels newly completed games and appends them to the training set.
    async fn collect(&self, now: DateTime<Utc>) -> Result<u64> {
        let to = now.date_naive();
        let from = to - Duration::days(self.config.collection_window_days);
        let games = self.games.completed_games_between(from, to).await?;

        let mut samples = Vec::with_capacity(games.len());
        for game in &games {
            match self.label(game, now).await {
                Ok(Some(sample)) => samples.push(sample),
                Ok(None) => {}
                Err(e) => warn!(game_id = %game.id, error = %e, "Skipping game during collection"),
            }
        }

        let appended = self.training_data.append_samples(&samples).await?;
        info!(
            games = games.len(),
            labeled = samples.len(),
            appended,
            "Collected training samples"
        );
        Ok(appended)
    }

    async fn label(&self, game: &GameRecord, now: DateTime<Utc>) -> Result<Option<TrainingSample>> {
        let Some(winner) = game.winner() else {
            return Ok(None);
        };
        let (home, away, h2h) = self
            .predictor
            .fetch_matchup(game.home_team_id, game.away_team_id, game.game_date)
            .await?;
        let features = self.builder.build(&home, &away, &h2h, &self.schema)?;

        Ok(Some(TrainingSample {
            game_id: game.id,
            game_date: game.game_date,
            schema_version: self.schema.version.clone(),
            features: features.values,
            home_won: winner == Side::Home,
            collected_at: now,
        }))
    }

    async fn train(&self) -> Result<TrainedCandidate> {
        let samples = self.training_data.load_samples(&self.schema.version).await?;
        let trainer = Arc::clone(&self.trainer);
        let schema = self.schema.clone();

        tokio::task::spawn_blocking(move || trainer.train(&samples, &schema))
            .await
            .map_err(|e| CourtsideError::TrainingFailed {
                reason: format!("training task panicked: {e}"),
            })?
    }

    async fn evaluate(
        &self,
        now: DateTime<Utc>,
        force: bool,
        candidate: &TrainedCandidate,
        drift: &mut Option<DriftAssessment>,
    ) -> Result<Evaluation> {
        let trigger = if force {
            Some(RetrainTrigger::Forced)
        } else {
            match self.registry.current() {
                Ok(active) => {
                    let assessment = self
                        .drift
                        .assess_drift_at(
                            now,
                            self.config.drift.window_days,
                            self.config.drift.min_sample_size,
                            active.baseline_accuracy(),
                            self.config.drift.threshold,
                        )
                        .await?;
                    let drifted = assessment.should_retrain;
                    *drift = Some(assessment);

                    let age = now - active.trained_at();
                    if drifted {
                        Some(RetrainTrigger::Drift)
                    } else if age >= Duration::days(self.config.calendar_floor_days) {
                        Some(RetrainTrigger::CalendarFloor)
                    } else {
                        None
                    }
                }
                Err(CourtsideError::NotLoaded) => Some(RetrainTrigger::CalendarFloor),
                Err(e) => return Err(e),
            }
        };

        let Some(trigger) = trigger else {
            return Ok(Evaluation::Discard(
                "no drift detected and calendar floor not reached".to_string(),
            ));
        };

        if candidate.report.roc_auc < self.config.min_roc_auc {
            return Ok(Evaluation::Discard(format!(
                "candidate ROC-AUC {:.3} is below the minimum {:.3}",
                candidate.report.roc_auc, self.config.min_roc_auc
            )));
        }

        Ok(Evaluation::Publish(trigger))
    }

    async fn publish(&self, trained_at: DateTime<Utc>, candidate: &TrainedCandidate) -> Result<String> {
        let active = self.registry.current_version();
        let version = self.minter.mint(trained_at, active.as_deref());

        let metadata = ArtifactMetadata {
            version: version.clone(),
            schema_version: self.schema.version.clone(),
            trained_at,
            accuracy: candidate.report.accuracy,
            roc_auc: candidate.report.roc_auc,
            best_params: serde_json::to_value(candidate.best_params)?,
            training_samples: candidate.training_samples,
            test_samples: candidate.test_samples,
        };
        let store = self.registry.store();
        store.save(&metadata, &self.schema, &candidate.pipeline).await?;
        // Read back before the ledger points at it, so a restart never finds
        // an active row without a loadable artifact.
        let artifact = store.load(&version).await?;

        // The swap below cannot fail: the ledger and the serving model agree
        // once this write succeeds, and nothing changes if it does not.
        self.versions
            .record_version(&ModelVersionRecord {
                version: version.clone(),
                schema_version: self.schema.version.clone(),
                accuracy: candidate.report.accuracy,
                roc_auc: candidate.report.roc_auc,
                trained_at,
                training_samples: candidate.training_samples,
                test_samples: candidate.test_samples,
                status: VERSION_ACTIVE.to_string(),
                deployed_at: Utc::now(),
            })
            .await?;

        self.registry.install(artifact).await;
        self.metrics.set_model_loaded(true);
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::PredictionConfig;
    use crate::stats::tests::MockStats;
    use chrono::{NaiveDate, TimeZone};
    use courtside_db::{InMemoryRepository, PredictionRepository};
    use courtside_ml::{
        default_game_schema, EvaluationReport, HyperParams, InMemoryArtifactStore, LogisticPipeline,
        LogisticWeights, ModelArtifact, StandardScaler,
    };
    use courtside_models::{ModelPrediction, PredictionRecord, PredictionRequest};
    use serde_json::json;

    /// Trainer that hands back a fixed candidate, or fails.
    struct StubTrainer {
        roc_auc: Option<f64>,
    }

    impl ModelTrainer for StubTrainer {
        fn train(&self, samples: &[TrainingSample], schema: &FeatureSchema) -> Result<TrainedCandidate> {
            let Some(roc_auc) = self.roc_auc else {
                return Err(CourtsideError::TrainingFailed {
                    reason: "solver diverged".into(),
                });
            };
            let n = schema.len();
            Ok(TrainedCandidate {
                pipeline: LogisticPipeline::new(
                    StandardScaler {
                        means: vec![0.0; n],
                        stds: vec![1.0; n],
                    },
                    LogisticWeights {
                        coefficients: vec![0.1; n],
                        intercept: 0.0,
                    },
                ),
                report: EvaluationReport {
                    accuracy: 0.66,
                    roc_auc,
                    samples: samples.len(),
                },
                best_params: HyperParams {
                    alpha: 0.01,
                    max_iterations: 100,
                },
                validation_auc: roc_auc,
                training_samples: samples.len(),
                test_samples: 0,
            })
        }
    }

    struct Harness {
        pipeline: RetrainingPipeline,
        registry: Arc<ModelRegistry>,
        repo: Arc<InMemoryRepository>,
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap()
    }

    fn stats() -> MockStats {
        let mut stats = MockStats::new();
        stats.expect_team_stats().returning(|id, _| {
            Ok(json!({
                "team_id": id, "win_pct": 0.55, "avg_points": 112.0, "avg_points_allowed": 109.0
            }))
        });
        stats.expect_team_games().returning(|id, _| {
            Ok(json!([
                {"date": "2025-01-02", "home_team_id": id, "away_team_id": 9,
                 "home_score": 104, "away_score": 99, "finished": true},
                {"date": "2025-01-04", "home_team_id": 9, "away_team_id": id,
                 "home_score": 101, "away_score": 96, "finished": true}
            ]))
        });
        stats.expect_head_to_head().returning(|a, b| {
            Ok(json!([
                {"date": "2024-12-20", "home_team_id": a, "away_team_id": b,
                 "home_score": 110, "away_score": 108, "finished": true}
            ]))
        });
        stats
    }

    /// Ledger that refuses every write.
    struct BrokenLedger;

    #[async_trait::async_trait]
    impl ModelVersionRepository for BrokenLedger {
        async fn record_version(&self, _version: &ModelVersionRecord) -> Result<()> {
            Err(CourtsideError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "ledger offline",
            )))
        }

        async fn list_versions(&self) -> Result<Vec<ModelVersionRecord>> {
            Ok(Vec::new())
        }

        async fn active_version(&self) -> Result<Option<ModelVersionRecord>> {
            Ok(None)
        }
    }

    async fn harness(trainer: StubTrainer, active_trained_at: Option<DateTime<Utc>>) -> Harness {
        harness_with_ledger(trainer, active_trained_at, None).await
    }

    async fn harness_with_ledger(
        trainer: StubTrainer,
        active_trained_at: Option<DateTime<Utc>>,
        ledger: Option<Arc<dyn ModelVersionRepository>>,
    ) -> Harness {
        let repo = Arc::new(InMemoryRepository::new());
        let store = Arc::new(InMemoryArtifactStore::new());
        let registry = Arc::new(ModelRegistry::new(store.clone()));
        let metrics = Arc::new(ServiceMetrics::new().unwrap());

        if let Some(trained_at) = active_trained_at {
            let n = default_game_schema().len();
            let active = ModelArtifact::new(
                "v20241201_000000_000",
                Arc::new(LogisticPipeline::new(
                    StandardScaler {
                        means: vec![0.0; n],
                        stds: vec![1.0; n],
                    },
                    LogisticWeights {
                        coefficients: vec![0.0; n],
                        intercept: 0.0,
                    },
                )),
                default_game_schema(),
                trained_at,
                0.70,
            )
            .unwrap();
            store.insert(active);
            registry.load("v20241201_000000_000").await.unwrap();
        }

        for day in 0..4 {
            let date = NaiveDate::from_ymd_opt(2025, 1, 6 + day).unwrap();
            repo.upsert_game(&GameRecord::completed(1, 2, date, 110, 100 + day as i32 * 7).unwrap())
                .await
                .unwrap();
        }

        let predictor = Arc::new(PredictionService::new(
            Arc::new(stats()),
            registry.clone(),
            repo.clone(),
            repo.clone(),
            metrics.clone(),
            PredictionConfig::default(),
        ));
        let ledger: Arc<dyn ModelVersionRepository> = match ledger {
            Some(ledger) => ledger,
            None => repo.clone(),
        };
        let pipeline = RetrainingPipeline::new(
            repo.clone(),
            repo.clone(),
            ledger,
            predictor,
            DriftMonitor::new(repo.clone()),
            Arc::new(trainer),
            metrics,
            default_game_schema(),
            RetrainingConfig::default(),
        );
        Harness {
            pipeline,
            registry,
            repo,
        }
    }

    async fn settle_window(repo: &InMemoryRepository, correct: usize, total: usize) {
        let request = PredictionRequest {
            home_team_id: 1,
            away_team_id: 2,
            game_date: NaiveDate::from_ymd_opt(2025, 1, 8).unwrap(),
            user_id: "u1".into(),
        };
        for i in 0..total {
            let mut record = PredictionRecord::pending(
                &request,
                ModelPrediction::from_home_probability(0.7, "v20241201_000000_000").unwrap(),
            );
            record.created_at = now() - Duration::days(1);
            record
                .settle(if i < correct { Side::Home } else { Side::Away })
                .unwrap();
            repo.insert_prediction(&record).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_drift_publishes_new_version() {
        let h = harness(StubTrainer { roc_auc: Some(0.71) }, Some(now() - Duration::days(5))).await;
        settle_window(&h.repo, 36, 60).await;

        let report = h.pipeline.run_at(now(), false).await;

        assert!(matches!(
            report.outcome,
            CycleOutcome::Published {
                trigger: RetrainTrigger::Drift,
                ..
            }
        ));
        assert_eq!(report.samples_collected, 4);
        assert!(report.drift.as_ref().unwrap().should_retrain);
        assert_eq!(h.registry.current_version().as_deref(), Some("v20250110_120000_000"));
        assert_eq!(h.repo.list_versions().await.unwrap().len(), 1);
        assert_eq!(h.pipeline.stage(), PipelineStage::Idle);
    }

    #[tokio::test]
    async fn test_no_trigger_discards_candidate() {
        let h = harness(StubTrainer { roc_auc: Some(0.71) }, Some(now() - Duration::days(5))).await;
        settle_window(&h.repo, 40, 60).await;

        let report = h.pipeline.run_at(now(), false).await;

        assert!(matches!(report.outcome, CycleOutcome::Discarded { .. }));
        assert_eq!(h.registry.current_version().as_deref(), Some("v20241201_000000_000"));
        assert!(h.repo.list_versions().await.unwrap().is_empty());
        // Collection still appends, even when nothing is published.
        assert_eq!(h.repo.sample_count(), 4);
    }

    #[tokio::test]
    async fn test_thin_evidence_with_fresh_model_discards() {
        let h = harness(StubTrainer { roc_auc: Some(0.71) }, Some(now() - Duration::days(5))).await;
        settle_window(&h.repo, 0, 10).await;

        let report = h.pipeline.run_at(now(), false).await;
        assert!(matches!(report.outcome, CycleOutcome::Discarded { .. }));
    }

    #[tokio::test]
    async fn test_calendar_floor_forces_publish() {
        let h = harness(StubTrainer { roc_auc: Some(0.71) }, Some(now() - Duration::days(31))).await;

        let report = h.pipeline.run_at(now(), false).await;
        assert!(matches!(
            report.outcome,
            CycleOutcome::Published {
                trigger: RetrainTrigger::CalendarFloor,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_weak_candidate_is_discarded() {
        let h = harness(StubTrainer { roc_auc: Some(0.42) }, None).await;

        let report = h.pipeline.run_at(now(), true).await;
        assert!(matches!(report.outcome, CycleOutcome::Discarded { .. }));
        assert!(!h.registry.is_loaded());
    }

    #[tokio::test]
    async fn test_training_failure_keeps_active_model() {
        let h = harness(StubTrainer { roc_auc: None }, Some(now() - Duration::days(31))).await;

        let report = h.pipeline.run_at(now(), false).await;

        match report.outcome {
            CycleOutcome::Aborted { stage, error } => {
                assert_eq!(stage, PipelineStage::Training);
                assert!(error.contains("solver diverged"));
            }
            other => panic!("expected abort, got {other:?}"),
        }
        assert_eq!(h.registry.current_version().as_deref(), Some("v20241201_000000_000"));
        assert_eq!(h.pipeline.stage(), PipelineStage::Idle);
    }

    #[tokio::test]
    async fn test_ledger_failure_keeps_previous_model_serving() {
        let h = harness_with_ledger(
            StubTrainer { roc_auc: Some(0.71) },
            Some(now() - Duration::days(31)),
            Some(Arc::new(BrokenLedger)),
        )
        .await;

        let report = h.pipeline.run_at(now(), false).await;

        match report.outcome {
            CycleOutcome::Aborted { stage, .. } => assert_eq!(stage, PipelineStage::Publishing),
            other => panic!("expected abort, got {other:?}"),
        }
        assert_eq!(h.registry.current_version().as_deref(), Some("v20241201_000000_000"));
        // The artifact is on disk but nothing points at it.
        assert!(h.registry.store().exists("v20250110_120000_000").await.unwrap());
    }

    #[tokio::test]
    async fn test_publish_retires_previous_ledger_row() {
        let h = harness(StubTrainer { roc_auc: Some(0.71) }, None).await;

        let first = h.pipeline.run_at(now(), true).await;
        let second = h.pipeline.run_at(now() + Duration::days(1), true).await;
        assert!(matches!(first.outcome, CycleOutcome::Published { .. }));
        assert!(matches!(second.outcome, CycleOutcome::Published { .. }));

        let versions = h.repo.list_versions().await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version, "v20250111_120000_000");
        assert_eq!(versions[0].status, "active");
        assert_eq!(versions[1].status, "retired");
        assert_eq!(
            h.repo.active_version().await.unwrap().unwrap().version,
            h.registry.current_version().unwrap()
        );
    }

    #[test]
    fn test_version_format() {
        let minter = VersionMinter::new();
        let at = Utc.with_ymd_and_hms(2025, 1, 7, 3, 4, 5).unwrap();
        assert_eq!(minter.mint(at, None), "v20250107_030405_000");
    }

    #[test]
    fn test_versions_are_strictly_increasing() {
        let minter = VersionMinter::new();
        let at = Utc.with_ymd_and_hms(2025, 1, 7, 3, 4, 5).unwrap();

        let first = minter.mint(at, None);
        let second = minter.mint(at, None);
        let earlier = minter.mint(at - Duration::hours(1), None);

        assert!(second > first);
        assert!(earlier > second);
    }

    #[test]
    fn test_version_beats_active_floor() {
        let minter = VersionMinter::new();
        let at = Utc.with_ymd_and_hms(2025, 1, 7, 3, 4, 5).unwrap();
        let version = minter.mint(at, Some("v20250107_030405_500"));
        assert_eq!(version, "v20250107_030405_501");

        // Hand-named versions do not constrain minting.
        assert_eq!(
            VersionMinter::new().mint(at, Some("bootstrap")),
            "v20250107_030405_000"
        );
    }

    #[test]
    fn test_version_jumps_past_distant_floor() {
        let minter = VersionMinter::new();
        let at = Utc.with_ymd_and_hms(2025, 1, 7, 3, 4, 5).unwrap();

        let version = minter.mint(at, Some("v20260301_101010_999"));
        assert_eq!(version, "v20260301_101011_000");
        assert_eq!(minter.mint(at, None), "v20260301_101011_001");
    }
}
