mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crate::config::AppConfig;
use courtside_api::{create_app, AppState};
use courtside_cache::{InMemoryCache, RedisCache, StatsCache};
use courtside_db::{DatabaseConnection, ModelVersionRepository, PgRepository};
use courtside_ml::{default_game_schema, FsArtifactStore, LogisticTrainer, ModelRegistry};
use courtside_services::{
    parse_results_csv, CachedStatsProvider, CycleOutcome, DriftMonitor, HistoryBackfill,
    HttpStatsProvider, PredictionService, RetrainScheduler, RetrainingPipeline, ServiceMetrics,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "courtside-rs", version, about = "Basketball game outcome prediction service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API and run scheduled retraining
    Serve,
    /// Run one retraining cycle and exit
    Retrain {
        /// Publish only if drift or the calendar floor calls for it
        #[arg(long)]
        scheduled: bool,
    },
    /// Seed the training set from a CSV of historical results
    Import {
        /// Columns: game_date,home_team_id,away_team_id,home_score,away_score
        path: PathBuf,
        /// Run a forced retraining cycle once the import is done
        #[arg(long)]
        retrain: bool,
    },
}

struct Components {
    service: Arc<PredictionService>,
    pipeline: Arc<RetrainingPipeline>,
    repository: Arc<PgRepository>,
    registry: Arc<ModelRegistry>,
    metrics: Arc<ServiceMetrics>,
}

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "courtside_rs=info,courtside_services=info,courtside_ml=info,tower_http=info".into()
            }),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

async fn build(config: &AppConfig) -> Result<Components> {
    let db = DatabaseConnection::new(config.database_url(), config.database.max_connections)
        .await
        .context("connecting to Postgres")?;
    db.run_migrations().await.context("running migrations")?;
    let repository = Arc::new(PgRepository::new(db.pool().clone()));

    let cache: Arc<dyn StatsCache> = match RedisCache::new(config.redis_url()).await {
        Ok(redis) => Arc::new(redis),
        Err(e) => {
            warn!(error = %e, "⚠️  Redis unavailable, using in-process stats cache");
            Arc::new(InMemoryCache::new())
        }
    };
    let upstream = Arc::new(HttpStatsProvider::new(config.stats_api_config())?);
    let stats = Arc::new(CachedStatsProvider::new(upstream, cache, config.cache_ttls()));

    let metrics = Arc::new(ServiceMetrics::new()?);
    let store = Arc::new(FsArtifactStore::new(&config.ml.model_dir));
    let registry = Arc::new(ModelRegistry::new(store));

    let service = Arc::new(PredictionService::new(
        stats,
        registry.clone(),
        repository.clone(),
        repository.clone(),
        metrics.clone(),
        config.prediction_config(),
    ));

    let retraining = config.retraining_config();
    let trainer = Arc::new(LogisticTrainer::new(retraining.trainer.clone()));
    let pipeline = Arc::new(RetrainingPipeline::new(
        repository.clone(),
        repository.clone(),
        repository.clone(),
        service.clone(),
        DriftMonitor::new(repository.clone()),
        trainer,
        metrics.clone(),
        default_game_schema(),
        retraining,
    ));

    Ok(Components {
        service,
        pipeline,
        repository,
        registry,
        metrics,
    })
}

/// Configured version, else the active one in the ledger.
async fn startup_version(config: &AppConfig, components: &Components) -> Result<Option<String>> {
    if let Some(version) = &config.ml.active_version {
        return Ok(Some(version.clone()));
    }
    Ok(components
        .repository
        .active_version()
        .await?
        .map(|record| record.version))
}

async fn serve(config: AppConfig) -> Result<()> {
    let components = build(&config).await?;

    let Some(version) = startup_version(&config, &components).await? else {
        bail!(
            "no model version configured or recorded; run `courtside-rs import <results.csv> --retrain` first"
        );
    };
    components
        .registry
        .load(&version)
        .await
        .with_context(|| format!("loading model {version}"))?;
    components.metrics.set_model_loaded(true);
    info!("🧠 Model {} loaded", version);

    let shutdown = CancellationToken::new();
    let scheduler_handle = if config.retraining.enabled {
        let scheduler = RetrainScheduler::new(
            components.pipeline.clone(),
            config.retrain_interval(),
        );
        Some(tokio::spawn(scheduler.run(shutdown.clone())))
    } else {
        info!("Scheduled retraining disabled");
        None
    };

    let state = AppState::new(
        components.service.clone(),
        components.repository.clone(),
        components.metrics.clone(),
    );
    let app = create_app(state, &config.server.cors_origins);

    let listener = tokio::net::TcpListener::bind(config.server_addr())
        .await
        .with_context(|| format!("binding {}", config.server_addr()))?;
    info!("🌐 Listening on {}", config.server_addr());
    info!("⌨️  Press Ctrl+C to stop");

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("❌ Failed to listen for shutdown signal: {}", e);
            }
            signal.cancel();
        })
        .await?;

    info!("👋 Shutting down gracefully");
    shutdown.cancel();
    if let Some(handle) = scheduler_handle {
        let _ = handle.await;
    }
    Ok(())
}

async fn retrain(config: AppConfig, scheduled: bool) -> Result<()> {
    let components = build(&config).await?;
    run_cycle(&config, &components, scheduled).await
}

async fn import(config: AppConfig, path: PathBuf, then_retrain: bool) -> Result<()> {
    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let results = parse_results_csv(&raw).with_context(|| format!("parsing {}", path.display()))?;

    let components = build(&config).await?;
    let backfill = HistoryBackfill::new(
        components.repository.clone(),
        components.repository.clone(),
        default_game_schema(),
    );
    let report = backfill.import(&results).await?;
    info!(
        "📥 Imported {} results: {} samples appended, {} without history",
        report.results, report.appended, report.skipped
    );

    if then_retrain {
        run_cycle(&config, &components, false).await?;
    }
    Ok(())
}

async fn run_cycle(config: &AppConfig, components: &Components, scheduled: bool) -> Result<()> {
    if let Some(version) = startup_version(config, components).await? {
        if let Err(e) = components.registry.load(&version).await {
            warn!(version = %version, error = %e, "Active model could not be loaded");
        }
    }

    let report = if scheduled {
        components.pipeline.run().await
    } else {
        components.pipeline.run_forced().await
    };

    match &report.outcome {
        CycleOutcome::Published { version, accuracy, roc_auc, .. } => {
            info!("✅ Published {} (accuracy {:.3}, ROC-AUC {:.3})", version, accuracy, roc_auc);
            Ok(())
        }
        CycleOutcome::Discarded { reason } => {
            info!("Candidate discarded: {}", reason);
            Ok(())
        }
        CycleOutcome::Aborted { stage, error } => {
            bail!("retraining aborted during {stage:?}: {error}")
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();
    let cli = Cli::parse();

    info!("🚀 Starting Courtside prediction service");

    let config = AppConfig::new()?;
    info!("✅ Configuration loaded successfully");
    info!("📊 Model directory: {}", config.ml.model_dir);
    info!("🔄 Redis: {}", config.redis_url());

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Retrain { scheduled } => retrain(config, scheduled).await,
        Command::Import { path, retrain } => import(config, path, retrain).await,
    }
}
